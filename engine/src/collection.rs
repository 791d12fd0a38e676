//! Collection - the handle documents are read and written through.
//!
//! Every operation validates its input locally, builds one request, hands it
//! to the [`Transport`] and projects the response. Local validation failures
//! never reach the transport.

use crate::config::ConnectionOptions;
use crate::content::Content;
use crate::durability::{self, Durability};
use crate::expiry::Expiry;
use crate::options::{
    AppendOptions, CounterOptions, ExistsOptions, GetOptions, InsertOptions, LookupInOptions,
    MutateInOptions, RemoveOptions, ReplaceOptions, StoreSemantics, TouchOptions, UpsertOptions,
};
use crate::protocol::{
    BucketInfo, DocumentTarget, KeyedRequest, KeyedResponse, Opcode, SubdocCommand, SubdocRequest,
};
use crate::result::{
    check_keyed, ConflictContext, CounterResult, ExistsResult, GetResult, LookupInResult,
    MutateInResult, MutationResult,
};
use crate::status::Status;
use crate::subdoc::{self, LookupInSpec, MutateInSpec};
use crate::transport::{partition_for_key, SharedTransport};
use crate::{error::Result, Cas, Error, MutationToken};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// A named collection inside a bucket scope.
#[derive(Clone)]
pub struct Collection {
    transport: SharedTransport,
    bucket: Arc<BucketInfo>,
    scope: String,
    name: String,
    options: Arc<ConnectionOptions>,
}

impl std::fmt::Debug for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collection")
            .field("bucket", &self.bucket.name)
            .field("scope", &self.scope)
            .field("name", &self.name)
            .finish()
    }
}

/// Fields shared by insert, upsert and replace.
struct StoreParams {
    cas: Cas,
    expiry: Expiry,
    durability: Durability,
    timeout: Option<Duration>,
}

impl Collection {
    pub(crate) fn new(
        transport: SharedTransport,
        bucket: Arc<BucketInfo>,
        scope: impl Into<String>,
        name: impl Into<String>,
        options: Arc<ConnectionOptions>,
    ) -> Self {
        Self {
            transport,
            bucket,
            scope: scope.into(),
            name: name.into(),
            options,
        }
    }

    pub fn bucket_name(&self) -> &str {
        &self.bucket.name
    }

    pub fn scope_name(&self) -> &str {
        &self.scope
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn options(&self) -> &ConnectionOptions {
        &self.options
    }

    // ---- request plumbing ----

    fn target(&self, key: &str) -> Result<DocumentTarget> {
        if key.is_empty() {
            return Err(Error::BadInput("empty key".into()));
        }
        Ok(DocumentTarget {
            bucket: self.bucket.name.clone(),
            scope: self.scope.clone(),
            collection: self.name.clone(),
            key: key.to_string(),
            partition: partition_for_key(key, self.bucket.partitions),
        })
    }

    fn timeout_ms(&self, timeout: Option<Duration>) -> u64 {
        timeout.unwrap_or(self.options.operation_timeout).as_millis() as u64
    }

    fn request(&self, opcode: Opcode, key: &str, timeout: Option<Duration>) -> Result<KeyedRequest> {
        let mut request = KeyedRequest::new(opcode, self.target(key)?);
        request.timeout_ms = self.timeout_ms(timeout);
        Ok(request)
    }

    fn send(&self, request: KeyedRequest) -> Result<KeyedResponse> {
        let (opcode, cas) = (request.opcode, request.cas);
        let key = request.target.key.clone();
        tracing::debug!(
            key = %key,
            opcode = ?opcode,
            partition = request.target.partition,
            "dispatching keyed operation"
        );
        let response = self.transport.send_keyed(request)?;
        check_keyed(&response, opcode, &key, cas)?;
        Ok(response)
    }

    fn token(&self, token: Option<MutationToken>) -> Option<MutationToken> {
        token.filter(|_| self.options.mutation_tokens)
    }

    fn durability_for(&self, durability: Result<Durability>) -> Result<Durability> {
        let durability = durability?;
        durability.check_possible(&self.bucket)?;
        Ok(durability)
    }

    /// Enforce observe-based durability on an applied mutation. Any failure
    /// from here on still reports the mutation as applied.
    fn finish_mutation(&self, result: MutationResult, durability: Durability) -> Result<MutationResult> {
        let Durability::Observe(requirement) = durability else {
            return Ok(result);
        };
        let Some(token) = result.token.as_ref() else {
            return Err(Error::DurabilityFailure {
                reason: "cannot observe durability without a mutation token".into(),
                applied: Some(Box::new(result)),
                failed_specs: Vec::new(),
            });
        };
        match durability::wait_for(
            self.transport.as_ref(),
            token,
            requirement,
            self.options.durability_interval,
            self.options.durability_timeout,
        ) {
            Ok(()) => Ok(result),
            Err(Error::DurabilityFailure { reason, .. }) => Err(Error::DurabilityFailure {
                reason,
                applied: Some(Box::new(result)),
                failed_specs: Vec::new(),
            }),
            Err(other) => Err(Error::DurabilityFailure {
                reason: format!("observe failed: {other}"),
                applied: Some(Box::new(result)),
                failed_specs: Vec::new(),
            }),
        }
    }

    fn store(&self, opcode: Opcode, key: &str, content: Content, params: StoreParams) -> Result<MutationResult> {
        let mut request = self.request(opcode, key, params.timeout)?;
        request.flags = content.flags();
        request.value = content.into_bytes();
        request.cas = params.cas;
        request.expiry = params.expiry.to_wire()?;
        request.durability = params.durability.wire_level();

        let response = self.send(request)?;
        let result = MutationResult {
            cas: response.cas,
            token: self.token(response.token),
        };
        self.finish_mutation(result, params.durability)
    }

    // ---- reads ----

    /// Fetch a document.
    pub fn get(&self, key: &str, options: GetOptions) -> Result<GetResult> {
        let request = self.request(Opcode::Get, key, options.timeout)?;
        let mut result = GetResult::from_response(self.send(request)?);
        if !options.with_expiry {
            result.expiry = None;
        }
        Ok(result)
    }

    /// Whether a document exists. A missing document is not an error here.
    pub fn exists(&self, key: &str, options: ExistsOptions) -> Result<ExistsResult> {
        let request = self.request(Opcode::Exists, key, options.timeout)?;
        let cas = request.cas;
        let response = self.transport.send_keyed(request)?;
        if response.status == Status::KeyNotFound {
            return Ok(ExistsResult {
                cas: 0,
                exists: false,
            });
        }
        check_keyed(&response, Opcode::Exists, key, cas)?;
        Ok(ExistsResult {
            cas: response.cas,
            exists: true,
        })
    }

    /// Fetch and lock a document for `lock_time`. The returned CAS is the
    /// only one that can mutate or unlock it until the lock expires.
    pub fn get_and_lock(&self, key: &str, lock_time: Duration, options: TouchOptions) -> Result<GetResult> {
        let mut request = self.request(Opcode::GetAndLock, key, options.timeout)?;
        // The wire carries whole seconds and reads zero as the node default.
        if lock_time.as_secs() == 0 {
            return Err(Error::InvalidArgument(
                "lock time must be at least one second".into(),
            ));
        }
        request.lock_time = u32::try_from(lock_time.as_secs())
            .map_err(|_| Error::InvalidArgument("lock time out of range".into()))?;
        Ok(GetResult::from_response(self.send(request)?))
    }

    /// Fetch a document and update its expiry.
    pub fn get_and_touch(
        &self,
        key: &str,
        expiry: impl Into<Expiry>,
        options: TouchOptions,
    ) -> Result<GetResult> {
        let mut request = self.request(Opcode::GetAndTouch, key, options.timeout)?;
        request.expiry = expiry.into().to_wire()?;
        Ok(GetResult::from_response(self.send(request)?))
    }

    // ---- whole-document writes ----

    /// Create a document; fails with `KeyExists` if it is already there.
    pub fn insert<T: Serialize + ?Sized>(&self, key: &str, value: &T, options: InsertOptions) -> Result<MutationResult> {
        self.insert_raw(key, Content::json(value)?, options)
    }

    pub fn insert_raw(&self, key: &str, content: Content, options: InsertOptions) -> Result<MutationResult> {
        let durability = self.durability_for(options.durability())?;
        self.store(
            Opcode::Insert,
            key,
            content,
            StoreParams {
                cas: 0,
                expiry: options.expiry,
                durability,
                timeout: options.timeout,
            },
        )
    }

    /// Create or overwrite a document.
    pub fn upsert<T: Serialize + ?Sized>(&self, key: &str, value: &T, options: UpsertOptions) -> Result<MutationResult> {
        self.upsert_raw(key, Content::json(value)?, options)
    }

    pub fn upsert_raw(&self, key: &str, content: Content, options: UpsertOptions) -> Result<MutationResult> {
        let durability = self.durability_for(options.durability())?;
        self.store(
            Opcode::Upsert,
            key,
            content,
            StoreParams {
                cas: 0,
                expiry: options.expiry,
                durability,
                timeout: options.timeout,
            },
        )
    }

    /// Overwrite an existing document, optionally guarded by CAS.
    pub fn replace<T: Serialize + ?Sized>(&self, key: &str, value: &T, options: ReplaceOptions) -> Result<MutationResult> {
        self.replace_raw(key, Content::json(value)?, options)
    }

    pub fn replace_raw(&self, key: &str, content: Content, options: ReplaceOptions) -> Result<MutationResult> {
        let durability = self.durability_for(options.durability())?;
        self.store(
            Opcode::Replace,
            key,
            content,
            StoreParams {
                cas: options.cas,
                expiry: options.expiry,
                durability,
                timeout: options.timeout,
            },
        )
    }

    /// Append raw bytes to an existing document.
    pub fn append(&self, key: &str, bytes: impl Into<Vec<u8>>, options: AppendOptions) -> Result<MutationResult> {
        self.adjoin(Opcode::Append, key, bytes.into(), options)
    }

    /// Prepend raw bytes to an existing document.
    pub fn prepend(&self, key: &str, bytes: impl Into<Vec<u8>>, options: AppendOptions) -> Result<MutationResult> {
        self.adjoin(Opcode::Prepend, key, bytes.into(), options)
    }

    fn adjoin(&self, opcode: Opcode, key: &str, bytes: Vec<u8>, options: AppendOptions) -> Result<MutationResult> {
        let durability = self.durability_for(options.durability())?;
        let mut request = self.request(opcode, key, options.timeout)?;
        request.value = bytes;
        request.cas = options.cas;
        request.durability = durability.wire_level();
        let response = self.send(request)?;
        let result = MutationResult {
            cas: response.cas,
            token: self.token(response.token),
        };
        self.finish_mutation(result, durability)
    }

    /// Delete a document, optionally guarded by CAS.
    pub fn remove(&self, key: &str, options: RemoveOptions) -> Result<MutationResult> {
        let durability = self.durability_for(options.durability())?;
        let mut request = self.request(Opcode::Remove, key, options.timeout)?;
        request.cas = options.cas;
        request.durability = durability.wire_level();
        let response = self.send(request)?;
        let result = MutationResult {
            cas: response.cas,
            token: self.token(response.token),
        };
        self.finish_mutation(result, durability)
    }

    /// Update the expiry without touching the value.
    pub fn touch(&self, key: &str, expiry: impl Into<Expiry>, options: TouchOptions) -> Result<MutationResult> {
        let mut request = self.request(Opcode::Touch, key, options.timeout)?;
        request.expiry = expiry.into().to_wire()?;
        let response = self.send(request)?;
        Ok(MutationResult {
            cas: response.cas,
            token: None,
        })
    }

    /// Release a lock taken by [`Collection::get_and_lock`].
    pub fn unlock(&self, key: &str, cas: Cas, options: TouchOptions) -> Result<()> {
        if cas == 0 {
            return Err(Error::InvalidArgument("unlock requires the CAS returned by the lock".into()));
        }
        let mut request = self.request(Opcode::Unlock, key, options.timeout)?;
        request.cas = cas;
        self.send(request)?;
        Ok(())
    }

    // ---- counters ----

    pub fn increment(&self, key: &str, options: CounterOptions) -> Result<CounterResult> {
        self.adjust(Opcode::Increment, key, options)
    }

    pub fn decrement(&self, key: &str, options: CounterOptions) -> Result<CounterResult> {
        self.adjust(Opcode::Decrement, key, options)
    }

    /// Signed convenience over increment/decrement. `options.delta` is
    /// ignored in favour of `delta`.
    pub fn counter(&self, key: &str, delta: i64, options: CounterOptions) -> Result<CounterResult> {
        let opcode = if delta < 0 {
            Opcode::Decrement
        } else {
            Opcode::Increment
        };
        self.adjust(opcode, key, options.delta(delta.unsigned_abs()))
    }

    fn adjust(&self, opcode: Opcode, key: &str, options: CounterOptions) -> Result<CounterResult> {
        if options.delta == 0 {
            return Err(Error::BadDelta("counter delta must not be zero".into()));
        }
        let durability = self.durability_for(options.durability())?;
        let mut request = self.request(opcode, key, options.timeout)?;
        request.delta = options.delta;
        request.initial = options.initial;
        request.expiry = options.expiry.to_wire()?;
        request.durability = durability.wire_level();

        let response = self.send(request)?;
        let content = std::str::from_utf8(&response.value)
            .ok()
            .and_then(|text| text.trim().parse::<u64>().ok())
            .ok_or_else(|| Error::Transport(format!("malformed counter value for {key}")))?;
        let result = MutationResult {
            cas: response.cas,
            token: self.token(response.token),
        };
        let result = self.finish_mutation(result, durability)?;
        Ok(CounterResult {
            cas: result.cas,
            token: result.token,
            content,
        })
    }

    // ---- subdocument ----

    /// Run path-addressed reads against one document.
    ///
    /// Succeeds whenever the document exists, even if individual specs
    /// failed; check [`LookupInResult::error`] or each entry.
    pub fn lookup_in(&self, key: &str, specs: &[LookupInSpec], options: LookupInOptions) -> Result<LookupInResult> {
        let target = self.target(key)?;
        let encoded = subdoc::encode_lookup(specs)?;
        let request = SubdocRequest {
            command: SubdocCommand::MultiLookup,
            target,
            specs: encoded.specs.clone(),
            doc_flags: 0,
            cas: 0,
            expiry: 0,
            durability: Default::default(),
            timeout_ms: self.timeout_ms(options.timeout),
        };
        tracing::debug!(key, specs = specs.len(), "dispatching lookupIn");
        let response = self.transport.send_subdoc(request)?;
        subdoc::decode_lookup(key, &encoded, response)
    }

    /// Fetch several paths with `get` specs.
    pub fn retrieve_in(&self, key: &str, paths: &[&str]) -> Result<LookupInResult> {
        let specs: Vec<LookupInSpec> = paths.iter().map(|p| LookupInSpec::get(*p)).collect();
        self.lookup_in(key, &specs, LookupInOptions::default())
    }

    /// Run path-addressed writes against one document.
    ///
    /// The server applies the batch atomically with respect to the document:
    /// a missing document or stale CAS rejects everything. Path-level
    /// failures are reported per spec and do not fail the call.
    pub fn mutate_in(&self, key: &str, specs: &[MutateInSpec], options: MutateInOptions) -> Result<MutateInResult> {
        let target = self.target(key)?;
        if options.store_semantics == StoreSemantics::Insert && options.cas != 0 {
            return Err(Error::InvalidArgument("insert semantics cannot be combined with a CAS".into()));
        }
        let encoded = subdoc::encode_mutation(specs)?;
        let durability = self.durability_for(options.durability())?;
        let request = SubdocRequest {
            command: SubdocCommand::MultiMutation,
            target,
            specs: encoded.specs.clone(),
            doc_flags: subdoc::request::doc_flags_for(options.store_semantics),
            cas: options.cas,
            expiry: options.expiry.to_wire()?,
            durability: durability.wire_level(),
            timeout_ms: self.timeout_ms(options.timeout),
        };
        tracing::debug!(key, specs = specs.len(), "dispatching mutateIn");
        let response = self.transport.send_subdoc(request)?;
        let ctx = ConflictContext {
            cas_supplied: options.cas != 0,
            add_semantics: options.store_semantics == StoreSemantics::Insert,
        };
        let mut result = subdoc::decode_mutation(key, &encoded, response, ctx)?;
        result.token = self.token(result.token.take());

        // A batch where every spec failed changed nothing, so there is
        // nothing to observe.
        let applied_any = result.entries().iter().any(|entry| entry.is_success());
        if applied_any && matches!(durability, Durability::Observe(_)) {
            if let Err(err) = self.finish_mutation(result.mutation(), durability) {
                return Err(match err {
                    Error::DurabilityFailure { reason, applied, .. } => Error::DurabilityFailure {
                        reason,
                        applied,
                        failed_specs: result.failures(),
                    },
                    other => other,
                });
            }
        }
        Ok(result)
    }

    // ---- multi-key ----

    /// Fetch several documents; each key succeeds or fails on its own.
    pub fn get_multi(&self, keys: &[&str], options: GetOptions) -> Vec<(String, Result<GetResult>)> {
        keys.iter()
            .map(|key| (key.to_string(), self.get(key, options.clone())))
            .collect()
    }

    /// Upsert several documents; each key succeeds or fails on its own.
    pub fn upsert_multi<T: Serialize>(
        &self,
        documents: &[(&str, T)],
        options: UpsertOptions,
    ) -> Vec<(String, Result<MutationResult>)> {
        documents
            .iter()
            .map(|(key, value)| (key.to_string(), self.upsert(key, value, options.clone())))
            .collect()
    }

    /// Remove several documents; each key succeeds or fails on its own.
    pub fn remove_multi(&self, keys: &[&str], options: RemoveOptions) -> Vec<(String, Result<MutationResult>)> {
        keys.iter()
            .map(|key| (key.to_string(), self.remove(key, options.clone())))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{
        ObserveRequest, ObserveResponse, OpenBucketRequest, SubdocResponse, WireEntry,
    };
    use crate::transport::Transport;
    use crate::DurabilityLevel;
    use scripted::Scripted;
    use serde_json::json;

    /// Minimal scripted transport: records requests, replays responses.
    mod scripted {
        use super::*;
        use std::collections::VecDeque;
        use std::sync::Mutex;

        #[derive(Default)]
        pub struct Scripted {
            pub keyed: Mutex<Vec<KeyedRequest>>,
            pub subdoc: Mutex<Vec<SubdocRequest>>,
            pub keyed_replies: Mutex<VecDeque<Result<KeyedResponse>>>,
            pub subdoc_replies: Mutex<VecDeque<Result<SubdocResponse>>>,
        }

        impl Scripted {
            pub fn reply(&self, response: KeyedResponse) {
                self.keyed_replies.lock().unwrap().push_back(Ok(response));
            }

            pub fn reply_err(&self, err: Error) {
                self.keyed_replies.lock().unwrap().push_back(Err(err));
            }

            pub fn reply_subdoc(&self, response: SubdocResponse) {
                self.subdoc_replies.lock().unwrap().push_back(Ok(response));
            }

            pub fn last_keyed(&self) -> KeyedRequest {
                self.keyed.lock().unwrap().last().cloned().unwrap()
            }

            pub fn last_subdoc(&self) -> SubdocRequest {
                self.subdoc.lock().unwrap().last().cloned().unwrap()
            }

            pub fn sent(&self) -> usize {
                self.keyed.lock().unwrap().len() + self.subdoc.lock().unwrap().len()
            }
        }

        impl Transport for Scripted {
            fn open_bucket(&self, request: &OpenBucketRequest) -> Result<BucketInfo> {
                Ok(BucketInfo {
                    name: request.bucket.clone(),
                    partitions: 64,
                    replicas: 1,
                    mutation_tokens: true,
                })
            }

            fn send_keyed(&self, request: KeyedRequest) -> Result<KeyedResponse> {
                self.keyed.lock().unwrap().push(request);
                self.keyed_replies
                    .lock()
                    .unwrap()
                    .pop_front()
                    .unwrap_or_else(|| Ok(KeyedResponse::default()))
            }

            fn send_subdoc(&self, request: SubdocRequest) -> Result<SubdocResponse> {
                self.subdoc.lock().unwrap().push(request);
                self.subdoc_replies
                    .lock()
                    .unwrap()
                    .pop_front()
                    .unwrap_or_else(|| Ok(SubdocResponse::default()))
            }

            fn observe_seqno(&self, _request: &ObserveRequest) -> Result<ObserveResponse> {
                Ok(ObserveResponse::default())
            }
        }
    }

    fn collection() -> (Arc<Scripted>, Collection) {
        let transport = Arc::new(Scripted::default());
        let bucket = Arc::new(BucketInfo {
            name: "default".into(),
            partitions: 64,
            replicas: 1,
            mutation_tokens: true,
        });
        let collection = Collection::new(
            transport.clone(),
            bucket,
            "_default",
            "_default",
            Arc::new(
                ConnectionOptions::default()
                    .durability_interval(Duration::from_millis(1))
                    .durability_timeout(Duration::from_millis(10)),
            ),
        );
        (transport, collection)
    }

    #[test]
    fn empty_key_never_reaches_transport() {
        let (transport, collection) = collection();
        assert!(matches!(
            collection.get("", GetOptions::default()),
            Err(Error::BadInput(_))
        ));
        assert!(matches!(
            collection.upsert("", &json!(1), UpsertOptions::default()),
            Err(Error::BadInput(_))
        ));
        assert_eq!(transport.sent(), 0);
    }

    #[test]
    fn upsert_encodes_request() {
        let (transport, collection) = collection();
        transport.reply(KeyedResponse {
            cas: 11,
            token: Some(MutationToken::new("default", 3, 5, 8)),
            ..KeyedResponse::default()
        });

        let result = collection
            .upsert(
                "doc",
                &json!({"a": 1}),
                UpsertOptions::new().expiry(Duration::from_secs(60)),
            )
            .unwrap();
        assert_eq!(result.cas, 11);
        assert_eq!(result.token.unwrap().sequence_number(), 8);

        let sent = transport.last_keyed();
        assert_eq!(sent.opcode, Opcode::Upsert);
        assert_eq!(sent.value, br#"{"a":1}"#);
        assert_eq!(sent.flags, crate::Format::Json.flags());
        assert_eq!(sent.expiry, 60);
        assert_eq!(sent.target.partition, partition_for_key("doc", 64));
        assert_eq!(sent.timeout_ms, 2500);
    }

    #[test]
    fn stale_cas_is_cas_mismatch_and_insert_conflict_is_key_exists() {
        let (transport, collection) = collection();
        transport.reply(KeyedResponse::with_status(Status::KeyExists));
        assert_eq!(
            collection.replace("doc", &json!(1), ReplaceOptions::new().cas(5)),
            Err(Error::CasMismatch("doc".into()))
        );

        transport.reply(KeyedResponse::with_status(Status::KeyExists));
        assert_eq!(
            collection.insert("doc", &json!(1), InsertOptions::default()),
            Err(Error::KeyExists("doc".into()))
        );
    }

    #[test]
    fn exists_tolerates_missing_document() {
        let (transport, collection) = collection();
        transport.reply(KeyedResponse::with_status(Status::KeyNotFound));
        let result = collection.exists("nope", ExistsOptions::default()).unwrap();
        assert!(!result.exists);
    }

    #[test]
    fn zero_delta_is_rejected_locally() {
        let (transport, collection) = collection();
        assert!(matches!(
            collection.counter("n", 0, CounterOptions::default()),
            Err(Error::BadDelta(_))
        ));
        assert_eq!(transport.sent(), 0);
    }

    #[test]
    fn counter_direction_and_value() {
        let (transport, collection) = collection();
        transport.reply(KeyedResponse {
            cas: 2,
            value: b"41".to_vec(),
            ..KeyedResponse::default()
        });
        let result = collection
            .counter("n", -3, CounterOptions::new().initial(44))
            .unwrap();
        assert_eq!(result.content, 41);
        let sent = transport.last_keyed();
        assert_eq!(sent.opcode, Opcode::Decrement);
        assert_eq!(sent.delta, 3);
        assert_eq!(sent.initial, Some(44));
    }

    #[test]
    fn timeout_passes_through() {
        let (transport, collection) = collection();
        transport.reply_err(Error::Timeout("get doc".into()));
        let err = collection.get("doc", GetOptions::default()).unwrap_err();
        assert!(err.is_ambiguous());
    }

    #[test]
    fn unlock_requires_cas() {
        let (_, collection) = collection();
        assert!(matches!(
            collection.unlock("doc", 0, TouchOptions::default()),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn sub_second_lock_time_is_rejected() {
        let (transport, collection) = collection();
        assert!(matches!(
            collection.get_and_lock("doc", Duration::from_millis(500), TouchOptions::default()),
            Err(Error::InvalidArgument(_))
        ));
        assert_eq!(transport.sent(), 0);

        collection
            .get_and_lock("doc", Duration::from_millis(1500), TouchOptions::default())
            .unwrap();
        assert_eq!(transport.last_keyed().lock_time, 1);
    }

    #[test]
    fn mutate_in_without_applied_specs_skips_observe() {
        let (transport, collection) = collection();
        transport.reply_subdoc(SubdocResponse {
            status: Status::MultiPathFailure,
            cas: 12,
            token: None,
            entries: vec![WireEntry {
                index: 0,
                status: Status::PathNotFound,
                value: Vec::new(),
            }],
        });
        let result = collection
            .mutate_in(
                "doc",
                &[MutateInSpec::replace("missing", json!(2))],
                MutateInOptions::new().replicate_to(1),
            )
            .unwrap();
        assert_eq!(result.cas, 12);
        assert_eq!(result.status_at(0).unwrap(), Status::PathNotFound);
    }

    #[test]
    fn observe_durability_timeout_reports_applied_mutation() {
        let (transport, collection) = collection();
        transport.reply(KeyedResponse {
            cas: 9,
            token: Some(MutationToken::new("default", 1, 1, 1)),
            ..KeyedResponse::default()
        });
        let err = collection
            .upsert("doc", &json!(1), UpsertOptions::new().replicate_to(1))
            .unwrap_err();
        assert_eq!(err.applied_mutation().map(|m| m.cas), Some(9));
    }

    #[test]
    fn impossible_durability_is_rejected_before_sending() {
        let (transport, collection) = collection();
        let err = collection
            .upsert("doc", &json!(1), UpsertOptions::new().persist_to(3))
            .unwrap_err();
        assert!(matches!(err, Error::DurabilityFailure { applied: None, .. }));
        assert_eq!(transport.sent(), 0);
    }

    #[test]
    fn sync_durability_level_travels_with_request() {
        let (transport, collection) = collection();
        transport.reply(KeyedResponse {
            cas: 1,
            ..KeyedResponse::default()
        });
        collection
            .upsert(
                "doc",
                &json!(1),
                UpsertOptions::new().durability_level(DurabilityLevel::Majority),
            )
            .unwrap();
        assert_eq!(transport.last_keyed().durability, DurabilityLevel::Majority);
    }

    #[test]
    fn mutate_in_positional_results() {
        let (transport, collection) = collection();
        transport.reply_subdoc(SubdocResponse {
            status: Status::MultiPathFailure,
            cas: 31,
            token: None,
            entries: vec![WireEntry {
                index: 2,
                status: Status::PathNotFound,
                value: Vec::new(),
            }],
        });
        let result = collection
            .mutate_in(
                "doc",
                &[
                    MutateInSpec::replace("field1", json!({"foo": "bar"})),
                    MutateInSpec::remove("array"),
                    MutateInSpec::replace("missing", json!("hello world")),
                ],
                MutateInOptions::default(),
            )
            .unwrap();
        assert_eq!(result.len(), 3);
        assert!(result.entry(0).unwrap().is_success());
        assert!(result.entry(1).unwrap().is_success());
        assert_eq!(result.status_at(2).unwrap(), Status::PathNotFound);
        assert!(matches!(result.error(), Some(Error::MultiFailure { .. })));
    }

    #[test]
    fn mutate_in_store_semantics() {
        let (transport, collection) = collection();
        collection
            .mutate_in(
                "doc",
                &[MutateInSpec::upsert("a", json!(1))],
                MutateInOptions::new().store_semantics(StoreSemantics::Upsert),
            )
            .unwrap();
        assert_eq!(
            transport.last_subdoc().doc_flags,
            crate::protocol::doc_flags::MKDOC
        );

        assert!(matches!(
            collection.mutate_in(
                "doc",
                &[MutateInSpec::upsert("a", json!(1))],
                MutateInOptions::new()
                    .store_semantics(StoreSemantics::Insert)
                    .cas(3),
            ),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn tokens_dropped_when_disabled() {
        let transport = Arc::new(Scripted::default());
        transport.reply(KeyedResponse {
            cas: 1,
            token: Some(MutationToken::new("default", 1, 1, 1)),
            ..KeyedResponse::default()
        });
        let collection = Collection::new(
            transport.clone(),
            Arc::new(BucketInfo {
                name: "default".into(),
                partitions: 64,
                replicas: 0,
                mutation_tokens: true,
            }),
            "_default",
            "_default",
            Arc::new(ConnectionOptions::default().mutation_tokens(false)),
        );
        let result = collection
            .upsert("doc", &json!(1), UpsertOptions::default())
            .unwrap();
        assert!(result.token.is_none());
    }

    #[test]
    fn get_multi_keeps_per_key_outcomes() {
        let (transport, collection) = collection();
        transport.reply(KeyedResponse {
            cas: 1,
            value: b"1".to_vec(),
            ..KeyedResponse::default()
        });
        transport.reply(KeyedResponse::with_status(Status::KeyNotFound));
        let results = collection.get_multi(&["a", "b"], GetOptions::default());
        assert_eq!(results.len(), 2);
        assert!(results[0].1.is_ok());
        assert_eq!(results[1].1, Err(Error::KeyNotFound("b".into())));
    }
}
