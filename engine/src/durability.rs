//! Durability requirements.
//!
//! Two flavours exist. Synchronous levels travel with the mutation and the
//! server holds the response until they are met. The legacy
//! `persist_to`/`replicate_to` form is enforced here, by polling partition
//! sequence numbers after the mutation succeeded.

use crate::protocol::{BucketInfo, ObserveRequest};
use crate::transport::Transport;
use crate::{error::Result, Error, MutationToken};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Synchronous durability level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DurabilityLevel {
    #[default]
    None,
    Majority,
    MajorityAndPersistToActive,
    PersistToMajority,
}

impl DurabilityLevel {
    pub const fn code(self) -> u8 {
        match self {
            DurabilityLevel::None => 0x00,
            DurabilityLevel::Majority => 0x01,
            DurabilityLevel::MajorityAndPersistToActive => 0x02,
            DurabilityLevel::PersistToMajority => 0x03,
        }
    }

    /// Copies (active included) that must acknowledge for a bucket with
    /// `replicas` replicas.
    pub fn majority(replicas: u8) -> u8 {
        (replicas + 1) / 2 + 1
    }
}

/// Legacy fan-out requirement checked by observing sequence numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ObserveRequirement {
    /// Copies, active included, that must have persisted the mutation.
    pub persist_to: u8,
    /// Replicas that must hold the mutation in memory.
    pub replicate_to: u8,
}

impl ObserveRequirement {
    pub fn is_empty(&self) -> bool {
        self.persist_to == 0 && self.replicate_to == 0
    }
}

/// A resolved durability requirement for one mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Durability {
    #[default]
    None,
    Synchronous(DurabilityLevel),
    Observe(ObserveRequirement),
}

impl Durability {
    /// Combine option fields into one requirement. Both flavours at once
    /// is an invalid argument.
    pub fn from_parts(level: DurabilityLevel, persist_to: u8, replicate_to: u8) -> Result<Self> {
        let observe = ObserveRequirement {
            persist_to,
            replicate_to,
        };
        match (level, observe.is_empty()) {
            (DurabilityLevel::None, true) => Ok(Durability::None),
            (DurabilityLevel::None, false) => Ok(Durability::Observe(observe)),
            (level, true) => Ok(Durability::Synchronous(level)),
            (_, false) => Err(Error::InvalidArgument(
                "durability level cannot be combined with persist_to/replicate_to".into(),
            )),
        }
    }

    /// Level to put on the wire.
    pub fn wire_level(&self) -> DurabilityLevel {
        match self {
            Durability::Synchronous(level) => *level,
            _ => DurabilityLevel::None,
        }
    }

    /// Reject requirements the bucket topology can never satisfy. Runs
    /// before the mutation is sent.
    pub fn check_possible(&self, bucket: &BucketInfo) -> Result<()> {
        if let Durability::Observe(req) = self {
            if req.persist_to > bucket.replicas + 1 || req.replicate_to > bucket.replicas {
                return Err(Error::DurabilityFailure {
                    reason: format!(
                        "durability impossible: persist_to={} replicate_to={} with {} replicas",
                        req.persist_to, req.replicate_to, bucket.replicas
                    ),
                    applied: None,
                    failed_specs: Vec::new(),
                });
            }
        }
        Ok(())
    }
}

/// Poll until `token` satisfies `requirement` or `timeout` elapses.
///
/// The returned failure never carries the applied mutation; the caller
/// attaches it.
pub fn wait_for(
    transport: &dyn Transport,
    token: &MutationToken,
    requirement: ObserveRequirement,
    interval: Duration,
    timeout: Duration,
) -> Result<()> {
    let deadline = Instant::now() + timeout;
    let request = ObserveRequest {
        bucket: token.bucket_name().to_string(),
        partition: token.partition_id(),
        partition_uuid: token.partition_uuid(),
    };

    loop {
        let response = transport.observe_seqno(&request)?;
        let mut persisted = 0u8;
        let mut replicated = 0u8;
        for node in &response.nodes {
            if node.partition_uuid != token.partition_uuid() {
                continue;
            }
            if node.persisted_seqno >= token.sequence_number() {
                persisted = persisted.saturating_add(1);
            }
            if !node.active && node.current_seqno >= token.sequence_number() {
                replicated = replicated.saturating_add(1);
            }
        }

        if persisted >= requirement.persist_to && replicated >= requirement.replicate_to {
            tracing::debug!(
                partition = token.partition_id(),
                seqno = token.sequence_number(),
                persisted,
                replicated,
                "durability requirement met"
            );
            return Ok(());
        }

        if Instant::now() + interval > deadline {
            tracing::warn!(
                partition = token.partition_id(),
                seqno = token.sequence_number(),
                persisted,
                replicated,
                "durability requirement not met before timeout"
            );
            return Err(Error::DurabilityFailure {
                reason: format!(
                    "timed out after {timeout:?}: persisted on {persisted}/{}, replicated to {replicated}/{}",
                    requirement.persist_to, requirement.replicate_to
                ),
                applied: None,
                failed_specs: Vec::new(),
            });
        }
        std::thread::sleep(interval);
    }
}
