//! Subdocument (path-addressed) operations.
//!
//! A lookupIn or mutateIn sends a list of specs that the server executes
//! atomically against one document. Document-level failures (missing
//! document, stale CAS) fail the whole batch. Path-level failures are
//! reported per spec: the aggregate status becomes `MultiPathFailure` while
//! other specs may still have succeeded, so results are always addressed
//! positionally.

pub mod path;
pub mod request;
pub mod response;
pub mod spec;

pub use path::{Path, Segment};
pub use request::{encode_lookup, encode_mutation, EncodedSpecs, MAX_SPECS};
pub use response::{decode_lookup, decode_mutation};
pub use spec::{LookupInSpec, LookupKind, MutateInSpec, MutateKind};
