//! Mutation tokens.
//!
//! Every successful mutation can carry a token identifying the partition it
//! landed on and the sequence number it was assigned there. Tokens are the
//! unit of read-your-writes consistency for queries.

use crate::{error::Result, BucketName, Error, PartitionId, PartitionUuid, SequenceNumber};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Position of a mutation within a partition's history.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationToken {
    bucket_name: BucketName,
    partition_id: PartitionId,
    partition_uuid: PartitionUuid,
    sequence_number: SequenceNumber,
}

impl MutationToken {
    /// Create a token from its numeric parts.
    pub fn new(
        bucket_name: impl Into<BucketName>,
        partition_id: PartitionId,
        partition_uuid: PartitionUuid,
        sequence_number: SequenceNumber,
    ) -> Self {
        Self {
            bucket_name: bucket_name.into(),
            partition_id,
            partition_uuid,
            sequence_number,
        }
    }

    /// Create a token from the base36 text form of its uuid and sequence number.
    pub fn from_base36(
        bucket_name: impl Into<BucketName>,
        partition_id: PartitionId,
        partition_uuid: &str,
        sequence_number: &str,
    ) -> Result<Self> {
        Ok(Self::new(
            bucket_name,
            partition_id,
            base36::decode(partition_uuid)?,
            base36::decode(sequence_number)?,
        ))
    }

    pub fn bucket_name(&self) -> &str {
        &self.bucket_name
    }

    pub fn partition_id(&self) -> PartitionId {
        self.partition_id
    }

    pub fn partition_uuid(&self) -> PartitionUuid {
        self.partition_uuid
    }

    pub fn sequence_number(&self) -> SequenceNumber {
        self.sequence_number
    }

    /// Partition uuid in base36.
    pub fn partition_uuid_base36(&self) -> String {
        base36::encode(self.partition_uuid)
    }

    /// Sequence number in base36.
    pub fn sequence_number_base36(&self) -> String {
        base36::encode(self.sequence_number)
    }

    /// Two tokens share a shard when bucket and partition match.
    pub fn same_shard(&self, other: &MutationToken) -> bool {
        self.partition_id == other.partition_id && self.bucket_name == other.bucket_name
    }
}

impl fmt::Display for MutationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}",
            self.bucket_name,
            self.partition_id,
            self.partition_uuid_base36(),
            self.sequence_number_base36()
        )
    }
}

impl FromStr for MutationToken {
    type Err = Error;

    /// Parses `bucket:partition:uuid36:seqno36`. Bucket names may contain
    /// colons, so the numeric parts are taken from the right.
    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.rsplitn(4, ':');
        let (Some(seqno), Some(uuid), Some(partition), Some(bucket)) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(Error::InvalidArgument(format!(
                "malformed mutation token: {s}"
            )));
        };
        if bucket.is_empty() {
            return Err(Error::InvalidArgument(format!(
                "mutation token without bucket: {s}"
            )));
        }
        let partition = partition.parse::<PartitionId>().map_err(|_| {
            Error::InvalidArgument(format!("invalid partition id in token: {partition}"))
        })?;
        Self::from_base36(bucket, partition, uuid, seqno)
    }
}

/// Anything that may carry a mutation token.
///
/// Results of mutations implement this so they can be folded directly into a
/// [`crate::MutationState`].
pub trait TokenSource {
    fn mutation_token(&self) -> Option<&MutationToken>;
}

impl TokenSource for MutationToken {
    fn mutation_token(&self) -> Option<&MutationToken> {
        Some(self)
    }
}

impl<T: TokenSource + ?Sized> TokenSource for &T {
    fn mutation_token(&self) -> Option<&MutationToken> {
        (**self).mutation_token()
    }
}

impl<T: TokenSource> TokenSource for Option<T> {
    fn mutation_token(&self) -> Option<&MutationToken> {
        self.as_ref().and_then(TokenSource::mutation_token)
    }
}

/// Base36 text encoding for 64-bit identifiers (lowercase digits).
pub mod base36 {
    use crate::{error::Result, Error};

    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

    pub fn encode(mut value: u64) -> String {
        if value == 0 {
            return "0".to_string();
        }
        let mut buf = Vec::with_capacity(13);
        while value > 0 {
            buf.push(DIGITS[(value % 36) as usize]);
            value /= 36;
        }
        buf.reverse();
        String::from_utf8_lossy(&buf).into_owned()
    }

    /// Decodes case-insensitively. Rejects empty input, foreign characters
    /// and values that do not fit in 64 bits.
    pub fn decode(text: &str) -> Result<u64> {
        if text.is_empty() {
            return Err(Error::InvalidArgument("empty base36 value".into()));
        }
        text.chars().try_fold(0u64, |acc, c| {
            let digit = c
                .to_digit(36)
                .ok_or_else(|| Error::InvalidArgument(format!("invalid base36 digit: {c}")))?;
            acc.checked_mul(36)
                .and_then(|v| v.checked_add(u64::from(digit)))
                .ok_or_else(|| Error::InvalidArgument(format!("base36 overflow: {text}")))
        })
    }
}
