//! Typed results and the projection of wire statuses onto [`Error`].

use crate::content::{self, Format};
use crate::error::{Result, SpecFailure};
use crate::protocol::{KeyedResponse, Opcode};
use crate::status::Status;
use crate::token::TokenSource;
use crate::{Cas, Error, MutationToken};
use serde::de::DeserializeOwned;

/// A fetched document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetResult {
    pub cas: Cas,
    pub flags: u32,
    /// Epoch seconds, when requested and the document has one.
    pub expiry: Option<u32>,
    value: Vec<u8>,
}

impl GetResult {
    pub(crate) fn from_response(response: KeyedResponse) -> Self {
        Self {
            cas: response.cas,
            flags: response.flags,
            expiry: response.expiry,
            value: response.value,
        }
    }

    /// Decode the body as JSON.
    pub fn content_as<T: DeserializeOwned>(&self) -> Result<T> {
        content::decode_json(&self.value, self.flags)
    }

    pub fn content_bytes(&self) -> &[u8] {
        &self.value
    }

    pub fn format(&self) -> Format {
        Format::from_flags(self.flags)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExistsResult {
    pub cas: Cas,
    pub exists: bool,
}

/// Outcome of a successful mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationResult {
    pub cas: Cas,
    /// Absent when the session did not negotiate tokens.
    pub token: Option<MutationToken>,
}

impl TokenSource for MutationResult {
    fn mutation_token(&self) -> Option<&MutationToken> {
        self.token.as_ref()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterResult {
    pub cas: Cas,
    pub token: Option<MutationToken>,
    /// Counter value after the operation.
    pub content: u64,
}

impl TokenSource for CounterResult {
    fn mutation_token(&self) -> Option<&MutationToken> {
        self.token.as_ref()
    }
}

/// Outcome of one spec of a lookupIn or mutateIn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecResult {
    pub path: String,
    pub status: Status,
    value: Vec<u8>,
}

impl SpecResult {
    pub(crate) fn new(path: String, status: Status, value: Vec<u8>) -> Self {
        Self {
            path,
            status,
            value,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// The error this spec reported, if any.
    pub fn error(&self) -> Option<Error> {
        (!self.is_success()).then(|| spec_error(self.status, &self.path))
    }

    /// Raw JSON fragment returned for this spec.
    pub fn value_raw(&self) -> &[u8] {
        &self.value
    }

    /// Decode the returned value.
    pub fn content_as<T: DeserializeOwned>(&self) -> Result<T> {
        if let Some(err) = self.error() {
            return Err(err);
        }
        serde_json::from_slice(&self.value).map_err(|e| {
            tracing::warn!(path = %self.path, error = %e, "Failed to decode subdoc response as JSON");
            Error::Encoding(format!("spec '{}': {e}", self.path))
        })
    }
}

fn failures_of(entries: &[SpecResult]) -> Vec<SpecFailure> {
    entries
        .iter()
        .enumerate()
        .filter(|(_, e)| !e.is_success())
        .map(|(index, e)| SpecFailure {
            index,
            path: e.path.clone(),
            status: e.status,
        })
        .collect()
}

fn multi_failure(status: Status, entries: &[SpecResult]) -> Option<Error> {
    let failed = failures_of(entries);
    if failed.is_empty() && status != Status::MultiPathFailure {
        return None;
    }
    Some(Error::MultiFailure {
        failed,
        total: entries.len(),
    })
}

fn entry_at(entries: &[SpecResult], index: usize) -> Result<&SpecResult> {
    entries.get(index).ok_or_else(|| {
        Error::InvalidArgument(format!(
            "spec index {index} out of range for {} results",
            entries.len()
        ))
    })
}

/// Result of a lookupIn, one entry per spec in caller order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupInResult {
    pub cas: Cas,
    /// Aggregate status; `MultiPathFailure` when any spec failed.
    pub status: Status,
    entries: Vec<SpecResult>,
}

impl LookupInResult {
    pub(crate) fn new(cas: Cas, status: Status, entries: Vec<SpecResult>) -> Self {
        Self {
            cas,
            status,
            entries,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[SpecResult] {
        &self.entries
    }

    pub fn entry(&self, index: usize) -> Result<&SpecResult> {
        entry_at(&self.entries, index)
    }

    pub fn status_at(&self, index: usize) -> Result<Status> {
        Ok(self.entry(index)?.status)
    }

    pub fn content_as<T: DeserializeOwned>(&self, index: usize) -> Result<T> {
        self.entry(index)?.content_as()
    }

    /// Whether the path of an `exists` (or any) spec was found.
    pub fn exists(&self, index: usize) -> Result<bool> {
        let entry = self.entry(index)?;
        match entry.status {
            s if s.is_success() => Ok(true),
            Status::PathNotFound => Ok(false),
            s => Err(spec_error(s, &entry.path)),
        }
    }

    /// `MultiFailure` listing every failed spec, or `None` when all
    /// succeeded.
    pub fn error(&self) -> Option<Error> {
        multi_failure(self.status, &self.entries)
    }
}

/// Result of a mutateIn, one entry per spec in caller order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutateInResult {
    pub cas: Cas,
    pub token: Option<MutationToken>,
    pub status: Status,
    entries: Vec<SpecResult>,
}

impl MutateInResult {
    pub(crate) fn new(
        cas: Cas,
        token: Option<MutationToken>,
        status: Status,
        entries: Vec<SpecResult>,
    ) -> Self {
        Self {
            cas,
            token,
            status,
            entries,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[SpecResult] {
        &self.entries
    }

    pub fn entry(&self, index: usize) -> Result<&SpecResult> {
        entry_at(&self.entries, index)
    }

    pub fn status_at(&self, index: usize) -> Result<Status> {
        Ok(self.entry(index)?.status)
    }

    /// Value produced by a spec, e.g. the new value of a counter.
    pub fn content_as<T: DeserializeOwned>(&self, index: usize) -> Result<T> {
        self.entry(index)?.content_as()
    }

    pub fn error(&self) -> Option<Error> {
        multi_failure(self.status, &self.entries)
    }

    /// Specs that failed, in caller order.
    pub fn failures(&self) -> Vec<SpecFailure> {
        failures_of(&self.entries)
    }

    /// The plain mutation outcome.
    pub fn mutation(&self) -> MutationResult {
        MutationResult {
            cas: self.cas,
            token: self.token.clone(),
        }
    }
}

impl TokenSource for MutateInResult {
    fn mutation_token(&self) -> Option<&MutationToken> {
        self.token.as_ref()
    }
}

/// What the caller asked for, needed to tell conflict kinds apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConflictContext {
    /// The request carried a CAS precondition.
    pub cas_supplied: bool,
    /// The request must not find an existing document.
    pub add_semantics: bool,
}

impl ConflictContext {
    pub fn for_keyed(opcode: Opcode, cas: Cas) -> Self {
        Self {
            cas_supplied: cas != 0,
            add_semantics: opcode == Opcode::Insert,
        }
    }
}

/// Map a document-level status to an error.
///
/// `key-exists` covers both "insert found a document" and "stale CAS" on the
/// wire; the context decides which one the caller sees.
pub(crate) fn document_error(
    status: Status,
    key: &str,
    ctx: ConflictContext,
    applied: Option<MutationResult>,
) -> Error {
    match status {
        Status::KeyNotFound | Status::NotStored => Error::KeyNotFound(key.to_string()),
        Status::KeyExists if ctx.add_semantics => Error::KeyExists(key.to_string()),
        Status::KeyExists if ctx.cas_supplied => Error::CasMismatch(key.to_string()),
        Status::KeyExists => Error::KeyExists(key.to_string()),
        Status::ValueTooBig => Error::ValueTooBig(key.to_string()),
        Status::Invalid => Error::InvalidArgument(format!("server rejected request for {key}")),
        Status::DeltaBadValue => Error::BadDelta(format!("document {key} is not a number")),
        Status::Locked | Status::TempFail | Status::NotLocked => Error::TempFail(key.to_string()),
        Status::AuthError => Error::AuthenticationFailure(format!("not authorized for {key}")),
        Status::DurabilityInvalidLevel => {
            Error::InvalidArgument("durability level not supported by the server".into())
        }
        Status::DurabilityImpossible => Error::DurabilityFailure {
            reason: "durability impossible with the current topology".into(),
            applied: None,
            failed_specs: Vec::new(),
        },
        Status::SyncWriteInProgress | Status::SyncWriteAmbiguous => Error::DurabilityFailure {
            reason: format!("sync write ambiguous for {key}"),
            applied: applied.map(Box::new),
            failed_specs: Vec::new(),
        },
        Status::DocNotJson => Error::SubdocumentDocumentNotJson(key.to_string()),
        s if s.is_path_level() => spec_error(s, ""),
        other => Error::Transport(format!("unexpected status {other} for {key}")),
    }
}

/// Map a per-spec status to an error.
pub fn spec_error(status: Status, path: &str) -> Error {
    let path = path.to_string();
    match status {
        Status::PathNotFound => Error::PathNotFound(path),
        Status::PathExists => Error::PathExists(path),
        Status::PathMismatch => Error::PathMismatch(path),
        Status::PathInvalid | Status::PathTooBig => Error::PathInvalid(path),
        Status::DocNotJson => Error::SubdocumentDocumentNotJson(path),
        Status::DeltaInvalid => Error::BadDelta(path),
        Status::NumRange => Error::BadDelta(format!("number out of range at {path}")),
        Status::ValueCannotInsert => {
            Error::InvalidArgument(format!("value cannot be inserted at {path}"))
        }
        Status::DocTooDeep | Status::ValueTooDeep => {
            Error::InvalidArgument(format!("document too deep at {path}"))
        }
        Status::XattrUnknownMacro => Error::InvalidArgument(format!("unknown macro at {path}")),
        other => Error::Transport(format!("unexpected spec status {other} at {path}")),
    }
}

/// Project a keyed response, applying the same rules as [`document_error`].
pub(crate) fn check_keyed(
    response: &KeyedResponse,
    opcode: Opcode,
    key: &str,
    cas: Cas,
) -> Result<()> {
    if response.status.is_success() {
        return Ok(());
    }
    let applied = (response.cas != 0).then(|| MutationResult {
        cas: response.cas,
        token: response.token.clone(),
    });
    Err(document_error(
        response.status,
        key,
        ConflictContext::for_keyed(opcode, cas),
        applied,
    ))
}
