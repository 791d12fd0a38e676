//! The boundary to the network.
//!
//! Routing, pooling and wire framing live behind this trait. The engine only
//! builds requests and interprets responses; everything it needs from a
//! cluster goes through these four calls.

use crate::protocol::{
    BucketInfo, KeyedRequest, KeyedResponse, ObserveRequest, ObserveResponse, OpenBucketRequest,
    SubdocRequest, SubdocResponse,
};
use crate::error::Result;
use std::sync::Arc;

/// A connection to a cluster.
///
/// Implementations report protocol-level outcomes through the `status`
/// field of responses and reserve `Err` for failures to get a response at
/// all (`Timeout`, `Transport`) or to open a bucket.
pub trait Transport: Send + Sync {
    /// Validate credentials and describe the bucket.
    fn open_bucket(&self, request: &OpenBucketRequest) -> Result<BucketInfo>;

    /// Execute a single-document command.
    fn send_keyed(&self, request: KeyedRequest) -> Result<KeyedResponse>;

    /// Execute a lookupIn or mutateIn.
    fn send_subdoc(&self, request: SubdocRequest) -> Result<SubdocResponse>;

    /// Report sequence numbers of every copy of a partition.
    fn observe_seqno(&self, request: &ObserveRequest) -> Result<ObserveResponse>;
}

/// Shared handle to a transport.
pub type SharedTransport = Arc<dyn Transport>;

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn open_bucket(&self, request: &OpenBucketRequest) -> Result<BucketInfo> {
        (**self).open_bucket(request)
    }

    fn send_keyed(&self, request: KeyedRequest) -> Result<KeyedResponse> {
        (**self).send_keyed(request)
    }

    fn send_subdoc(&self, request: SubdocRequest) -> Result<SubdocResponse> {
        (**self).send_subdoc(request)
    }

    fn observe_seqno(&self, request: &ObserveRequest) -> Result<ObserveResponse> {
        (**self).observe_seqno(request)
    }
}

/// Partition owning `key`: `((crc32(key) >> 16) & 0x7fff) % partitions`.
pub fn partition_for_key(key: &str, partitions: u16) -> u16 {
    if partitions == 0 {
        return 0;
    }
    let hash = crc32fast::hash(key.as_bytes());
    (((hash >> 16) & 0x7fff) % u32::from(partitions)) as u16
}
