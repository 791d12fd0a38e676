//! # kvdoc Engine
//!
//! Client-side core of a document-store session: CAS-guarded document
//! operations, path-addressed subdocument reads and writes, and mutation
//! tokens for read-your-own-writes consistency.
//!
//! ## Design Principles
//!
//! - **No IO**: the network sits behind the [`Transport`] trait
//! - **Validate locally**: malformed input never reaches the transport
//! - **Positional results**: subdocument batches report every spec
//!
//! ## Core Concepts
//!
//! ### CAS
//!
//! Every document carries a 64-bit CAS that changes on each mutation.
//! Passing it back as a precondition turns a write into an optimistic
//! compare-and-swap; a stale value fails with [`Error::CasMismatch`].
//!
//! ### Subdocument operations
//!
//! [`Collection::lookup_in`] and [`Collection::mutate_in`] run a list of
//! [`LookupInSpec`] / [`MutateInSpec`] atomically against one document.
//! Path-level failures come back per spec alongside the successes.
//!
//! ### Mutation tokens
//!
//! Each mutation reports a [`MutationToken`] naming the partition and
//! sequence number it landed at. A [`MutationState`] folds tokens into the
//! newest per partition and exports scan vectors for query and search.
//!
//! ## Quick Start
//!
//! ```rust
//! use kvdoc_engine::{MutationState, MutationToken};
//!
//! let first = MutationToken::new("default", 12, 0xfeed, 40);
//! let later = MutationToken::new("default", 12, 0xfeed, 41);
//! let other = MutationToken::new("default", 7, 0xbeef, 3);
//!
//! let mut state = MutationState::new();
//! state.add([&first, &other]).unwrap();
//! state.add([&later]).unwrap();
//!
//! assert_eq!(state.len(), 2);
//! let vectors = state.export_for_query();
//! assert_eq!(vectors["default"]["12"].0, 41);
//! ```

pub mod cluster;
pub mod collection;
pub mod config;
pub mod content;
pub mod datastructures;
pub mod durability;
pub mod error;
pub mod expiry;
pub mod mutation_state;
pub mod options;
pub mod protocol;
pub mod registry;
pub mod result;
pub mod status;
pub mod subdoc;
pub mod token;
pub mod transport;

// Re-export main types at crate root
pub use cluster::{Bucket, Cluster, PasswordAuthenticator, Scope};
pub use collection::Collection;
pub use config::ConnectionOptions;
pub use content::{Content, Format};
pub use durability::{Durability, DurabilityLevel, ObserveRequirement};
pub use error::{Error, Result, SpecFailure};
pub use expiry::Expiry;
pub use mutation_state::{MutationState, QueryScanVectors, SearchConsistencyVectors};
pub use options::{
    AppendOptions, CounterOptions, ExistsOptions, GetOptions, InsertOptions, LookupInOptions,
    MutateInOptions, RemoveOptions, ReplaceOptions, StoreSemantics, TouchOptions, UpsertOptions,
};
pub use registry::MutationTokenRegistry;
pub use result::{
    CounterResult, ExistsResult, GetResult, LookupInResult, MutateInResult, MutationResult,
    SpecResult,
};
pub use status::Status;
pub use subdoc::{LookupInSpec, MutateInSpec, Path};
pub use token::{MutationToken, TokenSource};
pub use transport::{partition_for_key, SharedTransport, Transport};

/// Type aliases for clarity
pub type Cas = u64;
pub type PartitionId = u16;
pub type PartitionUuid = u64;
pub type SequenceNumber = u64;
pub type BucketName = String;
pub type DocumentKey = String;
