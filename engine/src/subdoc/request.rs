//! Validation and wire encoding of spec lists.

use super::path::Path;
use super::spec::{LookupInSpec, LookupKind, MutateInSpec, MutateKind};
use crate::options::StoreSemantics;
use crate::protocol::{doc_flags, path_flags, SubdocOpcode, WireSpec};
use crate::{error::Result, Error};

/// Most specs one request may carry.
pub const MAX_SPECS: usize = 16;

/// Specs in wire order, with the caller position of each.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedSpecs {
    pub specs: Vec<WireSpec>,
    /// `order[wire_index]` is the index in the caller's list.
    pub order: Vec<usize>,
}

impl EncodedSpecs {
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Xattr specs must precede body specs on the wire.
    fn from_caller_order(specs: Vec<WireSpec>) -> Self {
        let mut order: Vec<usize> = (0..specs.len()).collect();
        order.sort_by_key(|&i| !specs[i].is_xattr());
        let mut slots: Vec<Option<WireSpec>> = specs.into_iter().map(Some).collect();
        let specs = order
            .iter()
            .filter_map(|&i| slots.get_mut(i).and_then(Option::take))
            .collect();
        Self { specs, order }
    }
}

fn check_count(len: usize) -> Result<()> {
    if len == 0 {
        return Err(Error::BadInput("at least one command required".into()));
    }
    if len > MAX_SPECS {
        return Err(Error::InvalidArgument(format!(
            "at most {MAX_SPECS} specs per request, got {len}"
        )));
    }
    Ok(())
}

fn empty_path(index: usize) -> Error {
    Error::BadInput(format!("empty path in spec {index}"))
}

/// Validate and encode a lookupIn.
pub fn encode_lookup(specs: &[LookupInSpec]) -> Result<EncodedSpecs> {
    check_count(specs.len())?;

    let mut wire = Vec::with_capacity(specs.len());
    for (index, spec) in specs.iter().enumerate() {
        let path = Path::parse(&spec.path)?;
        let opcode = match (spec.kind, path.is_root()) {
            (LookupKind::Get, true) if !spec.xattr => SubdocOpcode::GetDoc,
            (_, true) => return Err(empty_path(index)),
            (LookupKind::Get, false) => SubdocOpcode::Get,
            (LookupKind::Exists, false) => SubdocOpcode::Exists,
            (LookupKind::Count, false) => SubdocOpcode::GetCount,
        };
        wire.push(WireSpec {
            opcode,
            flags: if spec.xattr { path_flags::XATTR } else { 0 },
            path: spec.path.clone(),
            value: Vec::new(),
        });
    }

    Ok(EncodedSpecs::from_caller_order(wire))
}

/// Validate and encode a mutateIn.
pub fn encode_mutation(specs: &[MutateInSpec]) -> Result<EncodedSpecs> {
    check_count(specs.len())?;

    let mut wire = Vec::with_capacity(specs.len());
    for (index, spec) in specs.iter().enumerate() {
        let path = Path::parse(&spec.path)?;
        if path.is_root() && (spec.xattr || !spec.kind.accepts_root()) {
            return Err(empty_path(index));
        }
        if spec.expand_macros && !spec.xattr {
            return Err(Error::InvalidArgument(format!(
                "macro expansion requires an xattr path (spec {index})"
            )));
        }

        let opcode = match spec.kind {
            MutateKind::Insert | MutateKind::Upsert | MutateKind::Replace if path.is_root() => {
                SubdocOpcode::SetDoc
            }
            MutateKind::ReplaceFullDocument => SubdocOpcode::SetDoc,
            MutateKind::Insert => SubdocOpcode::DictAdd,
            MutateKind::Upsert => SubdocOpcode::DictUpsert,
            MutateKind::Replace => SubdocOpcode::Replace,
            MutateKind::Remove => SubdocOpcode::Delete,
            MutateKind::ArrayAppend => SubdocOpcode::ArrayPushLast,
            MutateKind::ArrayPrepend => SubdocOpcode::ArrayPushFirst,
            MutateKind::ArrayInsert => SubdocOpcode::ArrayInsert,
            MutateKind::ArrayAddUnique => SubdocOpcode::ArrayAddUnique,
            MutateKind::Counter => SubdocOpcode::Counter,
        };

        let mut flags = 0u8;
        if spec.create_path && spec.kind.accepts_create_path() {
            flags |= path_flags::CREATE_PATH;
        }
        if spec.xattr {
            flags |= path_flags::XATTR;
        }
        if spec.expand_macros {
            flags |= path_flags::EXPAND_MACROS;
        }

        wire.push(WireSpec {
            opcode,
            flags,
            path: spec.path.clone(),
            value: encode_value(index, spec)?,
        });
    }

    Ok(EncodedSpecs::from_caller_order(wire))
}

fn encode_value(index: usize, spec: &MutateInSpec) -> Result<Vec<u8>> {
    match spec.kind {
        MutateKind::Remove => Ok(Vec::new()),
        MutateKind::Counter => Ok(spec.delta.to_string().into_bytes()),
        MutateKind::ArrayAppend | MutateKind::ArrayPrepend | MutateKind::ArrayInsert => {
            if spec.values.is_empty() {
                return Err(Error::InvalidArgument(format!(
                    "array operation without values (spec {index})"
                )));
            }
            // Several values travel as one comma-separated JSON fragment.
            let mut out = Vec::new();
            for (i, value) in spec.values.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                out.extend(serde_json::to_vec(value)?);
            }
            Ok(out)
        }
        _ => match spec.values.as_slice() {
            [value] => Ok(serde_json::to_vec(value)?),
            _ => Err(Error::InvalidArgument(format!(
                "exactly one value expected (spec {index})"
            ))),
        },
    }
}

/// Document flags for a mutateIn under the given semantics.
pub fn doc_flags_for(semantics: StoreSemantics) -> u8 {
    match semantics {
        StoreSemantics::Replace => 0,
        StoreSemantics::Upsert => doc_flags::MKDOC,
        StoreSemantics::Insert => doc_flags::ADD,
    }
}
