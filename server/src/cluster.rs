//! The mock cluster: buckets, credentials and replication behaviour.
//!
//! `MockCluster` implements the engine's [`Transport`] in-process, so a
//! `Cluster` can run against it directly; the HTTP routes expose the same
//! four calls.

use crate::clock::MockClock;
use crate::config::Config;
use crate::store::BucketStore;
use crate::subdoc;
use dashmap::DashMap;
use kvdoc_engine::protocol::{
    BucketInfo, KeyedRequest, KeyedResponse, NodeSeqnos, ObserveRequest, ObserveResponse,
    OpenBucketRequest, SubdocRequest, SubdocResponse,
};
use kvdoc_engine::{DurabilityLevel, Error, Result, Status, Transport};
use parking_lot::{Mutex, RwLock};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

/// Knobs tests turn to simulate replication trouble.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topology {
    /// Configured replicas per partition.
    pub replicas: u8,
    /// Replicas currently reachable; sync writes needing more are impossible.
    pub available_replicas: u8,
    /// Whether replicas keep up with the active copy.
    pub replicating: bool,
    /// Whether copies report mutations as persisted.
    pub persisting: bool,
    /// Answer sync writes as ambiguous after applying them.
    pub ambiguous_sync_writes: bool,
}

#[derive(Debug)]
pub struct MockCluster {
    config: Config,
    clock: Arc<MockClock>,
    buckets: DashMap<String, Arc<BucketStore>>,
    topology: RwLock<Topology>,
    injected: Mutex<VecDeque<Error>>,
}

impl MockCluster {
    pub fn new(config: Config) -> Self {
        let clock = Arc::new(MockClock::new());
        let buckets = DashMap::new();
        for name in &config.buckets {
            buckets.insert(
                name.clone(),
                Arc::new(BucketStore::new(
                    name.clone(),
                    config.partitions,
                    clock.clone(),
                    config.mutation_tokens,
                )),
            );
        }
        let topology = Topology {
            replicas: config.replicas,
            available_replicas: config.replicas,
            replicating: true,
            persisting: config.persist,
            ambiguous_sync_writes: false,
        };
        tracing::info!(
            buckets = ?config.buckets,
            partitions = config.partitions,
            replicas = config.replicas,
            "mock cluster ready"
        );
        Self {
            config,
            clock,
            buckets,
            topology: RwLock::new(topology),
            injected: Mutex::new(VecDeque::new()),
        }
    }

    pub fn new_shared(config: Config) -> Arc<Self> {
        Arc::new(Self::new(config))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn bucket(&self, name: &str) -> Option<Arc<BucketStore>> {
        self.buckets.get(name).map(|b| b.clone())
    }

    /// Move the node's clock forward, lapsing locks and expiries.
    pub fn advance_clock(&self, by: Duration) {
        self.clock.advance(by);
    }

    pub fn topology(&self) -> Topology {
        self.topology.read().clone()
    }

    pub fn set_topology(&self, update: impl FnOnce(&mut Topology)) {
        update(&mut self.topology.write());
    }

    /// Fail the next data request with `error` instead of executing it.
    pub fn fail_next(&self, error: Error) {
        self.injected.lock().push_back(error);
    }

    fn take_injected(&self) -> Result<()> {
        match self.injected.lock().pop_front() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn store_for(&self, bucket: &str) -> Result<Arc<BucketStore>> {
        self.bucket(bucket)
            .ok_or_else(|| Error::BucketNotFound(bucket.to_string()))
    }

    /// Status a sync write must be refused with, if any.
    fn sync_write_refusal(&self, level: DurabilityLevel) -> Option<Status> {
        if level == DurabilityLevel::None {
            return None;
        }
        let topology = self.topology.read();
        let needed = DurabilityLevel::majority(topology.replicas);
        (topology.available_replicas + 1 < needed).then_some(Status::DurabilityImpossible)
    }

    fn ambiguous(&self, level: DurabilityLevel) -> bool {
        level != DurabilityLevel::None && self.topology.read().ambiguous_sync_writes
    }
}

impl Transport for MockCluster {
    fn open_bucket(&self, request: &OpenBucketRequest) -> Result<BucketInfo> {
        let store = self.store_for(&request.bucket)?;
        if let Some(password) = &self.config.password {
            if &request.password != password {
                tracing::warn!(bucket = %request.bucket, username = %request.username, "authentication failed");
                return Err(Error::AuthenticationFailure(format!(
                    "invalid credentials for {}",
                    request.username
                )));
            }
        }
        Ok(BucketInfo {
            name: store.name.clone(),
            partitions: store.partition_count(),
            replicas: self.topology.read().replicas,
            mutation_tokens: self.config.mutation_tokens,
        })
    }

    fn send_keyed(&self, request: KeyedRequest) -> Result<KeyedResponse> {
        self.take_injected()?;
        let store = self.store_for(&request.target.bucket)?;
        if let Some(status) = self.sync_write_refusal(request.durability) {
            return Ok(KeyedResponse::with_status(status));
        }
        let mut response = store.execute(&request);
        if response.status.is_success()
            && request.opcode.is_mutation()
            && self.ambiguous(request.durability)
        {
            response.status = Status::SyncWriteAmbiguous;
        }
        Ok(response)
    }

    fn send_subdoc(&self, request: SubdocRequest) -> Result<SubdocResponse> {
        self.take_injected()?;
        let store = self.store_for(&request.target.bucket)?;
        if let Some(status) = self.sync_write_refusal(request.durability) {
            return Ok(SubdocResponse {
                status,
                ..SubdocResponse::default()
            });
        }
        let mut response = subdoc::execute(&store, &request);
        if response.status.is_success() && self.ambiguous(request.durability) {
            response.status = Status::SyncWriteAmbiguous;
            response.entries.clear();
        }
        Ok(response)
    }

    fn observe_seqno(&self, request: &ObserveRequest) -> Result<ObserveResponse> {
        let store = self.store_for(&request.bucket)?;
        let partition = store.partition(request.partition).ok_or_else(|| {
            Error::InvalidArgument(format!("no partition {}", request.partition))
        })?;
        let topology = self.topology.read();
        let seqno = partition.seqno();
        let persisted = if topology.persisting { seqno } else { 0 };
        let replica_seqno = if topology.replicating { seqno } else { 0 };

        let mut nodes = vec![NodeSeqnos {
            active: true,
            partition_uuid: partition.uuid,
            current_seqno: seqno,
            persisted_seqno: persisted,
        }];
        nodes.extend((0..topology.available_replicas).map(|_| NodeSeqnos {
            active: false,
            partition_uuid: partition.uuid,
            current_seqno: replica_seqno,
            persisted_seqno: persisted.min(replica_seqno),
        }));
        Ok(ObserveResponse { nodes })
    }
}
