//! Subdocument path grammar.
//!
//! A path is a dot-separated list of field names. Any component may be
//! followed by one or more `[N]` array indexes, where `[-1]` addresses the
//! last element. Field names containing `.`, `[` or `]` are wrapped in
//! backticks, with a doubled backtick standing for a literal one. The empty
//! path addresses the whole document.

use crate::{error::Result, Error};
use std::fmt;

/// One component of a parsed path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    Field(String),
    /// Array position. `-1` is the last element.
    Index(i64),
}

impl Segment {
    pub fn is_index(&self) -> bool {
        matches!(self, Segment::Index(_))
    }
}

/// A parsed subdocument path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Path {
    raw: String,
    segments: Vec<Segment>,
}

impl Path {
    /// The document root.
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse a path, rejecting malformed syntax with [`Error::BadInput`].
    pub fn parse(input: &str) -> Result<Self> {
        let segments = parse_segments(input)?;
        Ok(Self {
            raw: input.to_string(),
            segments,
        })
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Final component, or `None` for the root.
    pub fn last(&self) -> Option<&Segment> {
        self.segments.last()
    }

    /// Every component but the last.
    pub fn parent(&self) -> &[Segment] {
        match self.segments.split_last() {
            Some((_, parent)) => parent,
            None => &[],
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl std::str::FromStr for Path {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Path::parse(s)
    }
}

fn malformed(input: &str, reason: &str) -> Error {
    Error::BadInput(format!("invalid path '{input}': {reason}"))
}

fn parse_segments(input: &str) -> Result<Vec<Segment>> {
    let mut segments = Vec::new();
    let mut chars = input.chars().peekable();
    // True right after a '.', when a field name must follow.
    let mut after_dot = false;

    while let Some(&c) = chars.peek() {
        match c {
            '.' => {
                if segments.is_empty() || after_dot {
                    return Err(malformed(input, "empty field name"));
                }
                chars.next();
                after_dot = true;
                continue;
            }
            '[' => {
                if after_dot {
                    return Err(malformed(input, "index must follow a field"));
                }
                chars.next();
                let mut digits = String::new();
                loop {
                    match chars.next() {
                        Some(']') => break,
                        Some(d) => digits.push(d),
                        None => return Err(malformed(input, "unterminated index")),
                    }
                }
                segments.push(Segment::Index(parse_index(input, &digits)?));
            }
            ']' => return Err(malformed(input, "unbalanced ']'")),
            '`' => {
                if !(segments.is_empty() || after_dot) {
                    return Err(malformed(input, "expected '.' before field"));
                }
                chars.next();
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some('`') if chars.peek() == Some(&'`') => {
                            chars.next();
                            name.push('`');
                        }
                        Some('`') => break,
                        Some(ch) => name.push(ch),
                        None => return Err(malformed(input, "unterminated backtick")),
                    }
                }
                if name.is_empty() {
                    return Err(malformed(input, "empty field name"));
                }
                segments.push(Segment::Field(name));
            }
            _ => {
                if !(segments.is_empty() || after_dot) {
                    return Err(malformed(input, "expected '.' before field"));
                }
                let mut name = String::new();
                while let Some(&ch) = chars.peek() {
                    if matches!(ch, '.' | '[' | ']' | '`') {
                        break;
                    }
                    name.push(ch);
                    chars.next();
                }
                segments.push(Segment::Field(name));
            }
        }
        after_dot = false;
    }

    if after_dot {
        return Err(malformed(input, "trailing '.'"));
    }
    Ok(segments)
}

fn parse_index(input: &str, digits: &str) -> Result<i64> {
    if digits == "-1" {
        return Ok(-1);
    }
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed(input, "array index must be a number or -1"));
    }
    digits
        .parse::<u32>()
        .map(i64::from)
        .map_err(|_| malformed(input, "array index out of range"))
}
