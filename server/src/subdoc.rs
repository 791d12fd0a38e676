//! Subdocument execution against stored documents.
//!
//! Paths are parsed with the engine's grammar and evaluated on
//! `serde_json::Value`. A mutateIn works on a copy of the document: specs
//! that succeed are kept, failed specs are reported by index, and the copy
//! is written back only if at least one spec applied.

use crate::store::{BucketStore, DocKey, Document, Outcome};
use dashmap::mapref::entry::Entry;
use kvdoc_engine::protocol::{
    doc_flags, macros, SubdocCommand, SubdocOpcode, SubdocRequest, SubdocResponse, WireEntry,
    WireSpec,
};
use kvdoc_engine::subdoc::{Path, Segment};
use kvdoc_engine::{Format, Status};
use serde_json::{Map, Value};

/// Values substituted for `${Mutation.*}` macros.
#[derive(Debug, Clone, Copy)]
struct MacroValues {
    cas: u64,
    seqno: u64,
}

/// Execute a lookupIn or mutateIn.
pub fn execute(store: &BucketStore, request: &SubdocRequest) -> SubdocResponse {
    if store.partition(request.target.partition).is_none() {
        return failed(Status::NotMyPartition);
    }
    let key = DocKey::of(&request.target);
    store.purge_expired(&key);
    match request.command {
        SubdocCommand::MultiLookup => lookup(store, &key, request),
        SubdocCommand::MultiMutation => mutate(store, &key, request),
    }
}

fn failed(status: Status) -> SubdocResponse {
    SubdocResponse {
        status,
        ..SubdocResponse::default()
    }
}

fn aggregate(entries: &[WireEntry]) -> Status {
    if entries.iter().all(|e| e.status.is_success()) {
        Status::Success
    } else {
        Status::MultiPathFailure
    }
}

fn parse_path(spec: &WireSpec) -> Outcome<Path> {
    Path::parse(&spec.path).map_err(|_| Status::PathInvalid)
}

// ---- lookup ----

fn lookup(store: &BucketStore, key: &DocKey, request: &SubdocRequest) -> SubdocResponse {
    let Some(doc) = store.docs.get(key) else {
        return failed(Status::KeyNotFound);
    };
    let body: Option<Value> = serde_json::from_slice(&doc.value).ok();
    let xattrs = Value::Object(doc.xattrs.clone());

    let entries: Vec<WireEntry> = request
        .specs
        .iter()
        .enumerate()
        .map(|(index, spec)| {
            let (status, value) = match lookup_one(spec, body.as_ref(), &xattrs, &doc.value) {
                Ok(value) => (Status::Success, value),
                Err(status) => (status, Vec::new()),
            };
            WireEntry {
                index: index as u8,
                status,
                value,
            }
        })
        .collect();

    SubdocResponse {
        status: aggregate(&entries),
        cas: doc.cas,
        token: None,
        entries,
    }
}

fn lookup_one(spec: &WireSpec, body: Option<&Value>, xattrs: &Value, raw: &[u8]) -> Outcome<Vec<u8>> {
    if spec.opcode == SubdocOpcode::GetDoc {
        return Ok(raw.to_vec());
    }
    let path = parse_path(spec)?;
    let root = if spec.is_xattr() {
        xattrs
    } else {
        body.ok_or(Status::DocNotJson)?
    };
    let found = resolve(root, path.segments());
    match spec.opcode {
        SubdocOpcode::Get => encode(found?),
        SubdocOpcode::Exists => found.map(|_| Vec::new()),
        SubdocOpcode::GetCount => match found? {
            Value::Array(items) => Ok(items.len().to_string().into_bytes()),
            Value::Object(fields) => Ok(fields.len().to_string().into_bytes()),
            _ => Err(Status::PathMismatch),
        },
        _ => Err(Status::Invalid),
    }
}

fn encode(value: &Value) -> Outcome<Vec<u8>> {
    serde_json::to_vec(value).map_err(|_| Status::Invalid)
}

// ---- path resolution ----

/// Position addressed by `index` in an array of `len` (`-1` is the last).
fn index_of(len: usize, index: i64) -> Option<usize> {
    match index {
        -1 => len.checked_sub(1),
        i if i >= 0 && (i as usize) < len => Some(i as usize),
        _ => None,
    }
}

fn resolve<'a>(root: &'a Value, segments: &[Segment]) -> Outcome<&'a Value> {
    let mut current = root;
    for segment in segments {
        current = match (segment, current) {
            (Segment::Field(name), Value::Object(fields)) => {
                fields.get(name).ok_or(Status::PathNotFound)?
            }
            (Segment::Index(i), Value::Array(items)) => {
                let position = index_of(items.len(), *i).ok_or(Status::PathNotFound)?;
                &items[position]
            }
            _ => return Err(Status::PathMismatch),
        };
    }
    Ok(current)
}

/// Mutable lookup. With `create`, missing fields become empty objects.
fn resolve_mut<'a>(root: &'a mut Value, segments: &[Segment], create: bool) -> Outcome<&'a mut Value> {
    let mut current = root;
    for segment in segments {
        current = match (segment, current) {
            (Segment::Field(name), Value::Object(fields)) => {
                if create {
                    fields
                        .entry(name.clone())
                        .or_insert_with(|| Value::Object(Map::new()))
                } else {
                    fields.get_mut(name).ok_or(Status::PathNotFound)?
                }
            }
            (Segment::Index(i), Value::Array(items)) => {
                let position = index_of(items.len(), *i).ok_or(Status::PathNotFound)?;
                &mut items[position]
            }
            _ => return Err(Status::PathMismatch),
        };
    }
    Ok(current)
}

fn parent_object<'a>(root: &'a mut Value, path: &Path, create: bool) -> Outcome<&'a mut Map<String, Value>> {
    match resolve_mut(root, path.parent(), create)? {
        Value::Object(fields) => Ok(fields),
        _ => Err(Status::PathMismatch),
    }
}

fn last_field(path: &Path) -> Outcome<&str> {
    match path.last() {
        Some(Segment::Field(name)) => Ok(name),
        _ => Err(Status::PathInvalid),
    }
}

fn array_at<'a>(root: &'a mut Value, path: &Path, create: bool) -> Outcome<&'a mut Vec<Value>> {
    let target = match path.last() {
        Some(Segment::Field(name)) if create => parent_object(root, path, true)?
            .entry(name.clone())
            .or_insert_with(|| Value::Array(Vec::new())),
        _ => resolve_mut(root, path.segments(), false)?,
    };
    match target {
        Value::Array(items) => Ok(items),
        _ => Err(Status::PathMismatch),
    }
}

// ---- values ----

fn expand(spec: &WireSpec, macro_values: MacroValues) -> Outcome<Vec<u8>> {
    if !spec.expand_macros() {
        return Ok(spec.value.clone());
    }
    let raw = spec.value.as_slice();
    if raw == macros::CAS.as_bytes() {
        return Ok(format!("\"0x{:016x}\"", macro_values.cas).into_bytes());
    }
    if raw == macros::SEQNO.as_bytes() {
        return Ok(format!("\"0x{:016x}\"", macro_values.seqno).into_bytes());
    }
    if raw.starts_with(b"\"${") {
        return Err(Status::XattrUnknownMacro);
    }
    Ok(spec.value.clone())
}

fn single_value(spec: &WireSpec, macro_values: MacroValues) -> Outcome<Value> {
    let raw = expand(spec, macro_values)?;
    serde_json::from_slice(&raw).map_err(|_| Status::ValueCannotInsert)
}

/// Comma-separated values of an array operation.
fn multi_value(spec: &WireSpec) -> Outcome<Vec<Value>> {
    let mut raw = Vec::with_capacity(spec.value.len() + 2);
    raw.push(b'[');
    raw.extend_from_slice(&spec.value);
    raw.push(b']');
    match serde_json::from_slice::<Value>(&raw) {
        Ok(Value::Array(values)) if !values.is_empty() => Ok(values),
        _ => Err(Status::ValueCannotInsert),
    }
}

fn is_primitive(value: &Value) -> bool {
    !matches!(value, Value::Array(_) | Value::Object(_))
}

// ---- mutation ----

/// Apply one spec. Returns the value to report, if the spec produces one.
fn apply(spec: &WireSpec, root: &mut Value, macro_values: MacroValues) -> Outcome<Option<Vec<u8>>> {
    let path = parse_path(spec)?;
    let create = spec.create_path();

    match spec.opcode {
        SubdocOpcode::SetDoc => {
            *root = single_value(spec, macro_values)?;
        }
        SubdocOpcode::Replace if path.is_root() => {
            *root = single_value(spec, macro_values)?;
        }
        SubdocOpcode::DictAdd | SubdocOpcode::DictUpsert => {
            let name = last_field(&path)?;
            let value = single_value(spec, macro_values)?;
            let parent = parent_object(root, &path, create)?;
            if spec.opcode == SubdocOpcode::DictAdd && parent.contains_key(name) {
                return Err(Status::PathExists);
            }
            parent.insert(name.to_string(), value);
        }
        SubdocOpcode::Replace => {
            let value = single_value(spec, macro_values)?;
            *resolve_mut(root, path.segments(), false)? = value;
        }
        SubdocOpcode::Delete => match path.last() {
            None => return Err(Status::PathInvalid),
            Some(Segment::Field(name)) => {
                parent_object(root, &path, false)?
                    .remove(name)
                    .ok_or(Status::PathNotFound)?;
            }
            Some(Segment::Index(i)) => {
                let Value::Array(items) = resolve_mut(root, path.parent(), false)? else {
                    return Err(Status::PathMismatch);
                };
                let position = index_of(items.len(), *i).ok_or(Status::PathNotFound)?;
                items.remove(position);
            }
        },
        SubdocOpcode::ArrayPushLast => {
            let values = multi_value(spec)?;
            array_at(root, &path, create)?.extend(values);
        }
        SubdocOpcode::ArrayPushFirst => {
            let values = multi_value(spec)?;
            array_at(root, &path, create)?.splice(0..0, values);
        }
        SubdocOpcode::ArrayInsert => {
            let Some(Segment::Index(i)) = path.last() else {
                return Err(Status::PathInvalid);
            };
            let position = usize::try_from(*i).map_err(|_| Status::PathInvalid)?;
            let values = multi_value(spec)?;
            let Value::Array(items) = resolve_mut(root, path.parent(), false)? else {
                return Err(Status::PathMismatch);
            };
            if position > items.len() {
                return Err(Status::PathNotFound);
            }
            items.splice(position..position, values);
        }
        SubdocOpcode::ArrayAddUnique => {
            let value = single_value(spec, macro_values)?;
            if !is_primitive(&value) {
                return Err(Status::ValueCannotInsert);
            }
            let items = array_at(root, &path, create)?;
            if !items.iter().all(is_primitive) {
                return Err(Status::PathMismatch);
            }
            if items.contains(&value) {
                return Err(Status::PathExists);
            }
            items.push(value);
        }
        SubdocOpcode::Counter => return counter(spec, root, &path, create).map(Some),
        SubdocOpcode::Get | SubdocOpcode::Exists | SubdocOpcode::GetCount | SubdocOpcode::GetDoc => {
            return Err(Status::Invalid);
        }
    }
    Ok(None)
}

fn counter(spec: &WireSpec, root: &mut Value, path: &Path, create: bool) -> Outcome<Vec<u8>> {
    let delta = std::str::from_utf8(&spec.value)
        .ok()
        .and_then(|text| text.trim().parse::<i64>().ok())
        .ok_or(Status::DeltaInvalid)?;
    if delta == 0 {
        return Err(Status::DeltaInvalid);
    }

    let slot = match path.last() {
        None => return Err(Status::PathInvalid),
        Some(Segment::Field(name)) => parent_object(root, path, create)?
            .entry(name.clone())
            .or_insert_with(|| Value::from(0)),
        Some(Segment::Index(_)) => resolve_mut(root, path.segments(), false)?,
    };
    let current = match slot {
        Value::Number(n) if n.is_f64() => return Err(Status::PathMismatch),
        Value::Number(n) => n.as_i64().ok_or(Status::NumRange)?,
        _ => return Err(Status::PathMismatch),
    };
    let next = current.checked_add(delta).ok_or(Status::NumRange)?;
    *slot = Value::from(next);
    Ok(next.to_string().into_bytes())
}

/// Body of a document created by mkdoc/add: an array when the first body
/// spec pushes onto the root, an object otherwise.
fn empty_body(specs: &[WireSpec]) -> Value {
    let root_array = specs.iter().find(|s| !s.is_xattr()).is_some_and(|s| {
        s.path.is_empty()
            && matches!(
                s.opcode,
                SubdocOpcode::ArrayPushLast
                    | SubdocOpcode::ArrayPushFirst
                    | SubdocOpcode::ArrayAddUnique
            )
    });
    if root_array {
        Value::Array(Vec::new())
    } else {
        Value::Object(Map::new())
    }
}

fn mutate(store: &BucketStore, key: &DocKey, request: &SubdocRequest) -> SubdocResponse {
    let now = store.clock.now_secs();
    let add = request.doc_flags & doc_flags::ADD != 0;
    let mkdoc = request.doc_flags & doc_flags::MKDOC != 0;
    let partition_id = request.target.partition;

    let entry = store.docs.entry(key.clone());
    let existing = match &entry {
        Entry::Occupied(occupied) => Some(occupied.get().clone()),
        Entry::Vacant(_) => None,
    };
    let (mut doc, mut body) = match existing {
        Some(_) if add => return failed(Status::KeyExists),
        Some(doc) => {
            if let Err(status) = doc.check_cas(request.cas, now) {
                return failed(status);
            }
            let body = serde_json::from_slice::<Value>(&doc.value).ok();
            (doc, body)
        }
        None if (add || mkdoc) && request.cas == 0 => {
            let doc = Document::new(Vec::new(), Format::Json.flags(), 0, 0);
            (doc, Some(empty_body(&request.specs)))
        }
        None => return failed(Status::KeyNotFound),
    };
    let mut xattrs = Value::Object(std::mem::take(&mut doc.xattrs));

    let new_cas = store.clock.next_cas();
    let reserved_seqno = request
        .specs
        .iter()
        .any(WireSpec::expand_macros)
        .then(|| store.partition(partition_id).map(|p| p.next_seqno()))
        .flatten();
    let macro_values = MacroValues {
        cas: new_cas,
        seqno: reserved_seqno.unwrap_or(0),
    };

    let mut entries = Vec::new();
    let mut applied = 0usize;
    for (index, spec) in request.specs.iter().enumerate() {
        let outcome = if spec.is_xattr() {
            apply(spec, &mut xattrs, macro_values)
        } else if spec.opcode == SubdocOpcode::SetDoc {
            single_value(spec, macro_values).map(|value| {
                body = Some(value);
                None
            })
        } else {
            match body.as_mut() {
                Some(root) => apply(spec, root, macro_values),
                None => Err(Status::DocNotJson),
            }
        };
        match outcome {
            Ok(value) => {
                applied += 1;
                if let Some(value) = value {
                    entries.push(WireEntry {
                        index: index as u8,
                        status: Status::Success,
                        value,
                    });
                }
            }
            Err(status) => entries.push(WireEntry {
                index: index as u8,
                status,
                value: Vec::new(),
            }),
        }
    }
    let status = aggregate(&entries);

    if applied == 0 {
        return SubdocResponse {
            status,
            cas: doc.cas,
            token: None,
            entries,
        };
    }

    if let Some(body) = &body {
        match serde_json::to_vec(body) {
            Ok(bytes) => doc.value = bytes,
            Err(_) => return failed(Status::Invalid),
        }
    }
    if let Value::Object(fields) = xattrs {
        doc.xattrs = fields;
    }
    doc.cas = new_cas;
    doc.lock = None;
    if request.expiry != 0 {
        doc.expiry = store.clock.absolute_expiry(request.expiry);
    }

    match entry {
        Entry::Occupied(mut occupied) => {
            occupied.insert(doc);
        }
        Entry::Vacant(vacant) => {
            vacant.insert(doc);
        }
    }

    let seqno = match reserved_seqno {
        Some(seqno) => Some(seqno),
        None => store.partition(partition_id).map(|p| p.next_seqno()),
    };
    SubdocResponse {
        status,
        cas: new_cas,
        token: seqno.and_then(|seqno| store.token(partition_id, seqno)),
        entries,
    }
}
