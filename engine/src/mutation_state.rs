//! MutationState - a consistency requirement built from prior mutations.
//!
//! A query run "at plus" a MutationState sees at least every mutation whose
//! token was added to it.

use crate::registry::MutationTokenRegistry;
use crate::token::TokenSource;
use crate::{error::Result, Error, MutationToken, SequenceNumber};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Scan vectors for N1QL `at_plus` consistency:
/// bucket -> partition id (as text) -> `[seqno, "uuid"]`.
pub type QueryScanVectors = BTreeMap<String, BTreeMap<String, (SequenceNumber, String)>>;

/// Consistency vectors for full-text search: `"<partition>/<uuid>"` -> seqno.
pub type SearchConsistencyVectors = BTreeMap<String, SequenceNumber>;

/// Aggregated mutation tokens, newest per shard.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MutationState {
    registry: MutationTokenRegistry,
}

impl MutationState {
    /// An empty state. Valid, but it adds no constraint to a query.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a state from one or more token sources.
    ///
    /// Sources without a token (for example results of a session without
    /// token support) are skipped. An empty collection is rejected.
    pub fn from<I>(sources: I) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: TokenSource,
    {
        let mut state = Self::new();
        state.add(sources)?;
        Ok(state)
    }

    /// Fold more token sources into the state.
    ///
    /// An empty collection is only an error while the state itself is still
    /// empty.
    pub fn add<I>(&mut self, sources: I) -> Result<&mut Self>
    where
        I: IntoIterator,
        I::Item: TokenSource,
    {
        let mut seen = 0usize;
        for source in sources {
            seen += 1;
            if let Some(token) = source.mutation_token() {
                self.registry.record(token);
            }
        }
        if seen == 0 && self.registry.is_empty() {
            return Err(Error::InvalidArgument(
                "at least one document or fragment must be provided".into(),
            ));
        }
        Ok(self)
    }

    /// Fold a single token.
    pub fn add_token(&mut self, token: &MutationToken) -> &mut Self {
        self.registry.record(token);
        self
    }

    /// Combine with another state, keeping the newest token per shard.
    pub fn merge(&mut self, other: &MutationState) -> &mut Self {
        self.registry.merge(&other.registry);
        self
    }

    pub fn tokens(&self) -> impl Iterator<Item = &MutationToken> {
        self.registry.iter()
    }

    pub fn registry(&self) -> &MutationTokenRegistry {
        &self.registry
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    /// Scan vectors for N1QL `at_plus` consistency.
    pub fn export_for_query(&self) -> QueryScanVectors {
        let mut vectors = QueryScanVectors::new();
        for bucket in self.registry.buckets() {
            let entries = self
                .registry
                .tokens_for(bucket)
                .into_iter()
                .map(|(partition, (seqno, uuid))| (partition.to_string(), (seqno, uuid.to_string())))
                .collect();
            vectors.insert(bucket.to_string(), entries);
        }
        vectors
    }

    /// Consistency vectors for full-text search.
    ///
    /// Keys carry no bucket, so shards of different buckets that share a
    /// partition and uuid fold into one entry holding the highest seqno.
    pub fn export_for_search(&self) -> SearchConsistencyVectors {
        let mut vectors = SearchConsistencyVectors::new();
        for token in self.registry.iter() {
            let seqno = token.sequence_number();
            vectors
                .entry(format!("{}/{}", token.partition_id(), token.partition_uuid()))
                .and_modify(|current| *current = (*current).max(seqno))
                .or_insert(seqno);
        }
        vectors
    }
}

impl Extend<MutationToken> for MutationState {
    fn extend<T: IntoIterator<Item = MutationToken>>(&mut self, iter: T) {
        for token in iter {
            self.registry.record(&token);
        }
    }
}

/// Wire form used when a state travels between processes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StateDocument {
    tokens: Vec<MutationToken>,
}

impl Serialize for MutationState {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        StateDocument {
            tokens: self.registry.iter().cloned().collect(),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for MutationState {
    fn deserialize<D: serde::Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Self, D::Error> {
        let doc = StateDocument::deserialize(deserializer)?;
        let mut state = MutationState::new();
        state.extend(doc.tokens);
        Ok(state)
    }
}
