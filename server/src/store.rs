//! In-memory document store for one bucket.
//!
//! Documents live in a `DashMap`; the per-key shard lock held by an entry
//! guard makes every single-document command atomic. Each partition keeps
//! its own uuid and sequence counter so mutations report real tokens.

use crate::clock::MockClock;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use kvdoc_engine::protocol::{DocumentTarget, KeyedRequest, KeyedResponse, Opcode};
use kvdoc_engine::{Format, MutationToken, PartitionId, Status};
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Largest value the node accepts.
pub const MAX_VALUE_SIZE: usize = 20 * 1024 * 1024;

/// CAS reported by a plain read of a locked document.
pub const LOCKED_CAS: u64 = u64::MAX;

/// Lock time used when the request asks for none or too much.
pub const DEFAULT_LOCK_SECS: u32 = 15;
pub const MAX_LOCK_SECS: u32 = 30;

/// Outcome of a command before it is shaped into a response.
pub(crate) type Outcome<T> = std::result::Result<T, Status>;

/// Identity of a document within a bucket.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocKey {
    pub scope: String,
    pub collection: String,
    pub key: String,
}

impl DocKey {
    pub fn of(target: &DocumentTarget) -> Self {
        Self {
            scope: target.scope.clone(),
            collection: target.collection.clone(),
            key: target.key.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lock {
    /// The only CAS that may mutate or unlock the document.
    pub cas: u64,
    /// Unix second the lock lapses at.
    pub until: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub value: Vec<u8>,
    pub flags: u32,
    pub cas: u64,
    /// Absolute unix seconds, 0 for none.
    pub expiry: u64,
    pub xattrs: Map<String, Value>,
    pub lock: Option<Lock>,
}

impl Document {
    pub fn new(value: Vec<u8>, flags: u32, cas: u64, expiry: u64) -> Self {
        Self {
            value,
            flags,
            cas,
            expiry,
            xattrs: Map::new(),
            lock: None,
        }
    }

    pub fn is_expired(&self, now: u64) -> bool {
        self.expiry != 0 && self.expiry <= now
    }

    pub fn is_locked(&self, now: u64) -> bool {
        self.lock.as_ref().is_some_and(|lock| lock.until > now)
    }

    /// Check a mutation precondition against this document.
    ///
    /// A locked document only yields to its lock CAS; otherwise a non-zero
    /// CAS must match the current one.
    pub fn check_cas(&self, cas: u64, now: u64) -> Outcome<()> {
        if let Some(lock) = self.lock.as_ref().filter(|l| l.until > now) {
            return if cas == lock.cas {
                Ok(())
            } else {
                Err(Status::Locked)
            };
        }
        if cas != 0 && cas != self.cas {
            return Err(Status::KeyExists);
        }
        Ok(())
    }
}

/// One partition's identity and sequence counter.
#[derive(Debug)]
pub struct Partition {
    pub uuid: u64,
    seqno: AtomicU64,
}

impl Partition {
    fn new() -> Self {
        Self {
            uuid: uuid::Uuid::new_v4().as_u64_pair().0,
            seqno: AtomicU64::new(0),
        }
    }

    pub fn seqno(&self) -> u64 {
        self.seqno.load(Ordering::Acquire)
    }

    pub(crate) fn next_seqno(&self) -> u64 {
        self.seqno.fetch_add(1, Ordering::AcqRel) + 1
    }
}

/// Documents and partitions of one bucket.
#[derive(Debug)]
pub struct BucketStore {
    pub name: String,
    pub(crate) docs: DashMap<DocKey, Document>,
    pub(crate) partitions: Vec<Partition>,
    pub(crate) clock: Arc<MockClock>,
    pub(crate) mutation_tokens: bool,
}

impl BucketStore {
    pub fn new(
        name: impl Into<String>,
        partitions: u16,
        clock: Arc<MockClock>,
        mutation_tokens: bool,
    ) -> Self {
        Self {
            name: name.into(),
            docs: DashMap::new(),
            partitions: (0..partitions.max(1)).map(|_| Partition::new()).collect(),
            clock,
            mutation_tokens,
        }
    }

    pub fn partition(&self, id: PartitionId) -> Option<&Partition> {
        self.partitions.get(usize::from(id))
    }

    pub fn partition_count(&self) -> u16 {
        self.partitions.len() as u16
    }

    /// Snapshot of a live document.
    pub fn document(&self, target: &DocumentTarget) -> Option<Document> {
        let key = DocKey::of(target);
        self.purge_expired(&key);
        self.docs.get(&key).map(|doc| doc.clone())
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// Drop `key` if its expiry has passed.
    pub(crate) fn purge_expired(&self, key: &DocKey) {
        let now = self.clock.now_secs();
        if self.docs.remove_if(key, |_, doc| doc.is_expired(now)).is_some() {
            tracing::debug!(bucket = %self.name, key = %key.key, "document expired");
        }
    }

    /// Record a mutation on `partition` and produce its token.
    pub(crate) fn commit(&self, partition_id: PartitionId) -> Option<MutationToken> {
        let partition = self.partition(partition_id)?;
        let seqno = partition.next_seqno();
        self.token(partition_id, seqno)
    }

    pub(crate) fn token(&self, partition_id: PartitionId, seqno: u64) -> Option<MutationToken> {
        let partition = self.partition(partition_id)?;
        self.mutation_tokens
            .then(|| MutationToken::new(self.name.clone(), partition_id, partition.uuid, seqno))
    }

    /// Execute one keyed command.
    pub fn execute(&self, request: &KeyedRequest) -> KeyedResponse {
        if self.partition(request.target.partition).is_none() {
            return KeyedResponse::with_status(Status::NotMyPartition);
        }
        if request.value.len() > MAX_VALUE_SIZE {
            return KeyedResponse::with_status(Status::ValueTooBig);
        }

        let key = DocKey::of(&request.target);
        self.purge_expired(&key);
        let now = self.clock.now_secs();

        let outcome = match request.opcode {
            Opcode::Get => self.get(&key, now),
            Opcode::Exists => self.exists(&key),
            Opcode::GetAndLock => self.get_and_lock(&key, request.lock_time, now),
            Opcode::GetAndTouch => self.touch(&key, request.expiry, now, true),
            Opcode::Touch => self.touch(&key, request.expiry, now, false),
            Opcode::Unlock => self.unlock(&key, request.cas, now),
            Opcode::Insert | Opcode::Upsert | Opcode::Replace => self.store(&key, request, now),
            Opcode::Remove => self.remove(&key, request, now),
            Opcode::Append | Opcode::Prepend => self.adjoin(&key, request, now),
            Opcode::Increment | Opcode::Decrement => self.counter(&key, request, now),
        };
        outcome.unwrap_or_else(KeyedResponse::with_status)
    }

    fn read_response(doc: &Document, cas: u64) -> KeyedResponse {
        KeyedResponse {
            status: Status::Success,
            cas,
            value: doc.value.clone(),
            flags: doc.flags,
            expiry: (doc.expiry != 0).then(|| u32::try_from(doc.expiry).unwrap_or(u32::MAX)),
            token: None,
        }
    }

    fn mutated(cas: u64, token: Option<MutationToken>) -> KeyedResponse {
        KeyedResponse {
            status: Status::Success,
            cas,
            token,
            ..KeyedResponse::default()
        }
    }

    fn get(&self, key: &DocKey, now: u64) -> Outcome<KeyedResponse> {
        let doc = self.docs.get(key).ok_or(Status::KeyNotFound)?;
        let cas = if doc.is_locked(now) { LOCKED_CAS } else { doc.cas };
        Ok(Self::read_response(&doc, cas))
    }

    fn exists(&self, key: &DocKey) -> Outcome<KeyedResponse> {
        let doc = self.docs.get(key).ok_or(Status::KeyNotFound)?;
        Ok(Self::mutated(doc.cas, None))
    }

    fn get_and_lock(&self, key: &DocKey, lock_time: u32, now: u64) -> Outcome<KeyedResponse> {
        let mut doc = self.docs.get_mut(key).ok_or(Status::KeyNotFound)?;
        if doc.is_locked(now) {
            return Err(Status::TempFail);
        }
        let secs = match lock_time {
            0 => DEFAULT_LOCK_SECS,
            t if t > MAX_LOCK_SECS => DEFAULT_LOCK_SECS,
            t => t,
        };
        let cas = self.clock.next_cas();
        doc.cas = cas;
        doc.lock = Some(Lock {
            cas,
            until: now + u64::from(secs),
        });
        tracing::debug!(bucket = %self.name, key = %key.key, secs, "document locked");
        Ok(Self::read_response(&doc, cas))
    }

    fn touch(&self, key: &DocKey, expiry: u32, now: u64, with_value: bool) -> Outcome<KeyedResponse> {
        let mut doc = self.docs.get_mut(key).ok_or(Status::KeyNotFound)?;
        if doc.is_locked(now) {
            return Err(Status::Locked);
        }
        doc.expiry = self.clock.absolute_expiry(expiry);
        doc.cas = self.clock.next_cas();
        if with_value {
            Ok(Self::read_response(&doc, doc.cas))
        } else {
            Ok(Self::mutated(doc.cas, None))
        }
    }

    fn unlock(&self, key: &DocKey, cas: u64, now: u64) -> Outcome<KeyedResponse> {
        let mut doc = self.docs.get_mut(key).ok_or(Status::KeyNotFound)?;
        let Some(lock) = doc.lock.clone().filter(|l| l.until > now) else {
            return Err(Status::NotLocked);
        };
        if lock.cas != cas {
            return Err(Status::Locked);
        }
        doc.lock = None;
        tracing::debug!(bucket = %self.name, key = %key.key, "document unlocked");
        Ok(Self::mutated(doc.cas, None))
    }

    fn store(&self, key: &DocKey, request: &KeyedRequest, now: u64) -> Outcome<KeyedResponse> {
        let expiry = self.clock.absolute_expiry(request.expiry);
        match self.docs.entry(key.clone()) {
            Entry::Occupied(_) if request.opcode == Opcode::Insert => Err(Status::KeyExists),
            Entry::Occupied(mut entry) => {
                entry.get().check_cas(request.cas, now)?;
                let cas = self.clock.next_cas();
                entry.insert(Document::new(request.value.clone(), request.flags, cas, expiry));
                Ok(Self::mutated(cas, self.commit(request.target.partition)))
            }
            Entry::Vacant(_) if request.opcode == Opcode::Replace => Err(Status::KeyNotFound),
            Entry::Vacant(entry) => {
                let cas = self.clock.next_cas();
                entry.insert(Document::new(request.value.clone(), request.flags, cas, expiry));
                Ok(Self::mutated(cas, self.commit(request.target.partition)))
            }
        }
    }

    fn remove(&self, key: &DocKey, request: &KeyedRequest, now: u64) -> Outcome<KeyedResponse> {
        match self.docs.entry(key.clone()) {
            Entry::Vacant(_) => Err(Status::KeyNotFound),
            Entry::Occupied(entry) => {
                entry.get().check_cas(request.cas, now)?;
                entry.remove();
                let cas = self.clock.next_cas();
                Ok(Self::mutated(cas, self.commit(request.target.partition)))
            }
        }
    }

    fn adjoin(&self, key: &DocKey, request: &KeyedRequest, now: u64) -> Outcome<KeyedResponse> {
        let mut doc = self.docs.get_mut(key).ok_or(Status::NotStored)?;
        doc.check_cas(request.cas, now)?;
        if doc.value.len() + request.value.len() > MAX_VALUE_SIZE {
            return Err(Status::ValueTooBig);
        }
        if request.opcode == Opcode::Append {
            doc.value.extend_from_slice(&request.value);
        } else {
            let mut value = request.value.clone();
            value.extend_from_slice(&doc.value);
            doc.value = value;
        }
        doc.cas = self.clock.next_cas();
        doc.lock = None;
        Ok(Self::mutated(doc.cas, self.commit(request.target.partition)))
    }

    fn counter(&self, key: &DocKey, request: &KeyedRequest, now: u64) -> Outcome<KeyedResponse> {
        let expiry = self.clock.absolute_expiry(request.expiry);
        let (cas, value) = match self.docs.entry(key.clone()) {
            Entry::Vacant(entry) => {
                let initial = request.initial.ok_or(Status::KeyNotFound)?;
                let cas = self.clock.next_cas();
                entry.insert(Document::new(
                    initial.to_string().into_bytes(),
                    Format::Json.flags(),
                    cas,
                    expiry,
                ));
                (cas, initial)
            }
            Entry::Occupied(mut entry) => {
                let doc = entry.get_mut();
                doc.check_cas(0, now)?;
                let current = std::str::from_utf8(&doc.value)
                    .ok()
                    .and_then(|text| text.trim().parse::<u64>().ok())
                    .ok_or(Status::DeltaBadValue)?;
                let value = if request.opcode == Opcode::Increment {
                    current.wrapping_add(request.delta)
                } else {
                    current.saturating_sub(request.delta)
                };
                doc.value = value.to_string().into_bytes();
                doc.cas = self.clock.next_cas();
                (doc.cas, value)
            }
        };
        Ok(KeyedResponse {
            value: value.to_string().into_bytes(),
            ..Self::mutated(cas, self.commit(request.target.partition))
        })
    }
}
