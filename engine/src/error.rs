//! Error types for the kvdoc engine.

use crate::result::MutationResult;
use crate::status::Status;
use crate::DocumentKey;
use thiserror::Error;

/// One failed spec inside a subdocument multi-failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecFailure {
    /// Position of the spec in the caller's list
    pub index: usize,
    /// Path the spec addressed
    pub path: String,
    /// Status the server reported for it
    pub status: Status,
}

/// All possible errors from the kvdoc engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // Validation errors, raised before anything is sent
    #[error("bad input: {0}")]
    BadInput(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    // Document errors
    #[error("document not found: {0}")]
    KeyNotFound(DocumentKey),

    #[error("document already exists: {0}")]
    KeyExists(DocumentKey),

    #[error("cas mismatch: {0}")]
    CasMismatch(DocumentKey),

    #[error("temporarily unavailable, locked: {0}")]
    TempFail(DocumentKey),

    #[error("value too big: {0}")]
    ValueTooBig(DocumentKey),

    #[error("bad delta: {0}")]
    BadDelta(String),

    // Subdocument errors
    #[error("path not found: {0}")]
    PathNotFound(String),

    #[error("path already exists: {0}")]
    PathExists(String),

    #[error("path mismatch: {0}")]
    PathMismatch(String),

    #[error("path invalid: {0}")]
    PathInvalid(String),

    #[error("document is not json: {0}")]
    SubdocumentDocumentNotJson(DocumentKey),

    #[error("subdocument multi-failure: {} of {total} specs failed", .failed.len())]
    MultiFailure {
        failed: Vec<SpecFailure>,
        total: usize,
    },

    // Outcome-unknown and reporting errors
    #[error("operation timed out: {0}")]
    Timeout(String),

    /// The mutation may already be applied. `applied` carries its result
    /// whenever the server reported one; `failed_specs` lists the specs of a
    /// partially applied mutateIn that did not take effect.
    #[error("durability requirement not met: {reason}")]
    DurabilityFailure {
        reason: String,
        applied: Option<Box<MutationResult>>,
        failed_specs: Vec<SpecFailure>,
    },

    // Session errors
    #[error("authentication failure: {0}")]
    AuthenticationFailure(String),

    #[error("bucket not found: {0}")]
    BucketNotFound(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("encoding error: {0}")]
    Encoding(String),
}

impl Error {
    /// Returns true when the server may have applied the operation.
    pub fn is_ambiguous(&self) -> bool {
        matches!(self, Error::Timeout(_) | Error::DurabilityFailure { .. })
    }

    /// The mutation result carried by a durability failure, if any.
    pub fn applied_mutation(&self) -> Option<&MutationResult> {
        match self {
            Error::DurabilityFailure {
                applied: Some(result),
                ..
            } => Some(result),
            _ => None,
        }
    }

    /// Specs reported as not applied, by a multi-failure or by a durability
    /// failure after a partially applied mutateIn.
    pub fn failed_specs(&self) -> &[SpecFailure] {
        match self {
            Error::DurabilityFailure { failed_specs, .. } => failed_specs.as_slice(),
            Error::MultiFailure { failed, .. } => failed.as_slice(),
            _ => &[],
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Encoding(err.to_string())
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
