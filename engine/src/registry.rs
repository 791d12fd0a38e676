//! Mutation token registry.
//!
//! Keeps at most one token per (bucket, partition) shard, always the one with
//! the highest sequence number. The registry is not synchronized; it belongs
//! to a single session or request scope.

use crate::{BucketName, MutationToken, PartitionId, PartitionUuid, SequenceNumber};
use std::collections::BTreeMap;

/// Newest token seen for each shard.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MutationTokenRegistry {
    tokens: BTreeMap<(BucketName, PartitionId), MutationToken>,
}

impl MutationTokenRegistry {
    pub fn new() -> Self {
        Self {
            tokens: BTreeMap::new(),
        }
    }

    /// Insert or replace the token for its shard.
    ///
    /// Returns true when the registry changed. A token that is not newer
    /// than the stored one is ignored.
    pub fn record(&mut self, token: &MutationToken) -> bool {
        let shard = (token.bucket_name().to_string(), token.partition_id());
        match self.tokens.get(&shard) {
            Some(existing) if existing.sequence_number() >= token.sequence_number() => false,
            _ => {
                self.tokens.insert(shard, token.clone());
                true
            }
        }
    }

    /// Partition to (sequence number, partition uuid) for one bucket, in
    /// partition order.
    pub fn tokens_for(
        &self,
        bucket_name: &str,
    ) -> Vec<(PartitionId, (SequenceNumber, PartitionUuid))> {
        self.tokens
            .values()
            .filter(|t| t.bucket_name() == bucket_name)
            .map(|t| {
                (
                    t.partition_id(),
                    (t.sequence_number(), t.partition_uuid()),
                )
            })
            .collect()
    }

    /// Token stored for a shard.
    pub fn get(&self, bucket_name: &str, partition_id: PartitionId) -> Option<&MutationToken> {
        self.tokens.get(&(bucket_name.to_string(), partition_id))
    }

    /// All tokens ordered by bucket, then partition.
    pub fn iter(&self) -> impl Iterator<Item = &MutationToken> {
        self.tokens.values()
    }

    /// Distinct bucket names, sorted.
    pub fn buckets(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tokens.keys().map(|(b, _)| b.as_str()).collect();
        names.dedup();
        names
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Fold every token of another registry into this one.
    pub fn merge(&mut self, other: &MutationTokenRegistry) {
        for token in other.iter() {
            self.record(token);
        }
    }
}
