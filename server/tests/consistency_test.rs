//! End-to-end tests: the engine's `Collection` against the in-process mock
//! node.

use kvdoc_engine::{
    Cluster, Collection, ConnectionOptions, CounterOptions, DurabilityLevel, Error,
    ExistsOptions, GetOptions, InsertOptions, LookupInOptions, LookupInSpec, MutateInOptions,
    MutateInSpec, MutationState, PasswordAuthenticator, RemoveOptions, ReplaceOptions, Status,
    StoreSemantics, TouchOptions, UpsertOptions,
};
use kvdoc_server::{Config, MockCluster};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

fn setup_with(config: Config, options: ConnectionOptions) -> (Arc<MockCluster>, Collection) {
    let mock = MockCluster::new_shared(config);
    let cluster = Cluster::connect(mock.clone(), options);
    let bucket = cluster.bucket("default").unwrap();
    (mock, bucket.default_collection())
}

fn setup() -> (Arc<MockCluster>, Collection) {
    setup_with(Config::default(), ConnectionOptions::default())
}

fn content(collection: &Collection, key: &str) -> Value {
    collection
        .get(key, GetOptions::default())
        .unwrap()
        .content_as()
        .unwrap()
}

mod properties {
    use super::*;

    #[test]
    fn test_positional_correspondence() {
        let (_mock, collection) = setup();
        collection
            .upsert("doc", &json!({"a": 1, "list": [1, 2]}), UpsertOptions::default())
            .unwrap();

        let result = collection
            .lookup_in(
                "doc",
                &[
                    LookupInSpec::get("a"),
                    LookupInSpec::exists("missing"),
                    LookupInSpec::count("list"),
                ],
                LookupInOptions::default(),
            )
            .unwrap();

        assert_eq!(result.len(), 3);
        assert_eq!(result.content_as::<i64>(0).unwrap(), 1);
        assert!(!result.exists(1).unwrap());
        assert_eq!(result.content_as::<usize>(2).unwrap(), 2);
        assert!(matches!(result.error(), Some(Error::MultiFailure { .. })));
    }

    #[test]
    fn test_partial_success_under_aggregate_failure() {
        let (_mock, collection) = setup();
        collection
            .upsert(
                "doc",
                &json!({"field1": 1, "array": [1, 2, 3]}),
                UpsertOptions::default(),
            )
            .unwrap();

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
        match result.error() {
            Some(Error::MultiFailure { failed, total }) => {
                assert_eq!(total, 3);
                assert_eq!(failed.len(), 1);
                assert_eq!(failed[0].index, 2);
            }
            other => panic!("expected MultiFailure, got {other:?}"),
        }

        assert_eq!(content(&collection, "doc"), json!({"field1": {"foo": "bar"}}));
    }

    #[test]
    fn test_cas_round_trip() {
        let (_mock, collection) = setup();
        let first = collection
            .upsert("doc", &json!({"v": 1}), UpsertOptions::default())
            .unwrap();
        let second = collection
            .upsert("doc", &json!({"v": 2}), UpsertOptions::default())
            .unwrap();
        assert_ne!(first.cas, second.cas);

        let stale = collection.replace("doc", &json!({"v": 3}), ReplaceOptions::new().cas(first.cas));
        assert_eq!(stale, Err(Error::CasMismatch("doc".into())));

        let fresh = collection
            .replace("doc", &json!({"v": 3}), ReplaceOptions::new().cas(second.cas))
            .unwrap();
        assert_ne!(fresh.cas, second.cas);
        assert_eq!(content(&collection, "doc"), json!({"v": 3}));
    }

    #[test]
    fn test_insert_exists_boundary() {
        let (_mock, collection) = setup();
        collection
            .insert("doc", &json!({"v": 1}), InsertOptions::default())
            .unwrap();
        assert_eq!(
            collection.insert("doc", &json!({"v": 1}), InsertOptions::default()),
            Err(Error::KeyExists("doc".into()))
        );
        collection
            .upsert("doc", &json!({"v": 2}), UpsertOptions::default())
            .unwrap();
        collection
            .upsert("doc", &json!({"v": 3}), UpsertOptions::default())
            .unwrap();
    }

    #[test]
    fn test_counter_semantics() {
        let (_mock, collection) = setup();
        let created = collection
            .counter("hits", 1, CounterOptions::new().initial(1))
            .unwrap();
        assert_eq!(created.content, 1);
        assert_eq!(collection.counter("hits", 1, CounterOptions::new()).unwrap().content, 2);
        assert_eq!(collection.counter("hits", -1, CounterOptions::new()).unwrap().content, 1);
        assert!(matches!(
            collection.counter("hits", 0, CounterOptions::new()),
            Err(Error::BadDelta(_))
        ));
        assert!(matches!(
            collection.increment("absent", CounterOptions::new()),
            Err(Error::KeyNotFound(_))
        ));
    }

    #[test]
    fn test_mutation_state_keeps_newest_per_shard() {
        let (_mock, collection) = setup();
        let first = collection
            .upsert("doc", &json!(1), UpsertOptions::default())
            .unwrap();
        let second = collection
            .upsert("doc", &json!(2), UpsertOptions::default())
            .unwrap();
        let other = collection
            .upsert("other-doc", &json!(3), UpsertOptions::default())
            .unwrap();

        let state = MutationState::from([&first, &second, &other]).unwrap();
        let newest = second.token.as_ref().unwrap();
        assert!(newest.sequence_number() > first.token.as_ref().unwrap().sequence_number());
        assert!(state.tokens().any(|t| t == newest));

        let vectors = state.export_for_query();
        let shards = vectors["default"].len();
        let expected = if newest.same_shard(other.token.as_ref().unwrap()) { 1 } else { 2 };
        assert_eq!(shards, expected);
    }

    #[test]
    fn test_lock_contention() {
        let (_mock, collection) = setup();
        collection
            .upsert("doc", &json!({"v": 1}), UpsertOptions::default())
            .unwrap();

        let locked = collection
            .get_and_lock("doc", Duration::from_secs(10), TouchOptions::default())
            .unwrap();
        assert_eq!(
            collection.get_and_lock("doc", Duration::from_secs(1), TouchOptions::default()),
            Err(Error::TempFail("doc".into()))
        );

        collection
            .unlock("doc", locked.cas, TouchOptions::default())
            .unwrap();
        collection
            .get_and_lock("doc", Duration::from_secs(1), TouchOptions::default())
            .unwrap();
    }

    #[test]
    fn test_empty_path_rules() {
        let (_mock, collection) = setup();
        collection
            .upsert("doc", &json!({"old": true}), UpsertOptions::default())
            .unwrap();

        collection
            .mutate_in(
                "doc",
                &[MutateInSpec::upsert("", json!({"new": true}))],
                MutateInOptions::default(),
            )
            .unwrap();
        assert_eq!(content(&collection, "doc"), json!({"new": true}));

        assert!(matches!(
            collection.lookup_in("doc", &[LookupInSpec::exists("")], LookupInOptions::default()),
            Err(Error::BadInput(_))
        ));
    }
}

mod documents {
    use super::*;

    #[test]
    fn test_missing_documents() {
        let (_mock, collection) = setup();
        assert_eq!(
            collection.get("nope", GetOptions::default()),
            Err(Error::KeyNotFound("nope".into()))
        );
        assert!(!collection.exists("nope", ExistsOptions::default()).unwrap().exists);
        assert_eq!(
            collection.remove("nope", RemoveOptions::default()),
            Err(Error::KeyNotFound("nope".into()))
        );
        assert_eq!(
            collection.replace("nope", &json!(1), ReplaceOptions::default()),
            Err(Error::KeyNotFound("nope".into()))
        );
    }

    #[test]
    fn test_locked_document_rejects_other_writers() {
        let (_mock, collection) = setup();
        collection
            .upsert("doc", &json!({"v": 1}), UpsertOptions::default())
            .unwrap();
        let locked = collection
            .get_and_lock("doc", Duration::from_secs(10), TouchOptions::default())
            .unwrap();

        assert_eq!(
            collection.get("doc", GetOptions::default()).unwrap().cas,
            u64::MAX
        );
        assert_eq!(
            collection.upsert("doc", &json!({"v": 2}), UpsertOptions::default()),
            Err(Error::TempFail("doc".into()))
        );
        collection
            .replace("doc", &json!({"v": 2}), ReplaceOptions::new().cas(locked.cas))
            .unwrap();
        // The write released the lock.
        collection
            .upsert("doc", &json!({"v": 3}), UpsertOptions::default())
            .unwrap();
    }

    #[test]
    fn test_lock_lapses_with_time() {
        let (mock, collection) = setup();
        collection
            .upsert("doc", &json!({}), UpsertOptions::default())
            .unwrap();
        let locked = collection
            .get_and_lock("doc", Duration::from_secs(5), TouchOptions::default())
            .unwrap();
        mock.advance_clock(Duration::from_secs(6));

        collection
            .get_and_lock("doc", Duration::from_secs(5), TouchOptions::default())
            .unwrap();
        assert_eq!(
            collection.unlock("doc", locked.cas, TouchOptions::default()),
            Err(Error::TempFail("doc".into()))
        );
    }

    #[test]
    fn test_expiry() {
        let (mock, collection) = setup();
        collection
            .upsert(
                "doc",
                &json!({"v": 1}),
                UpsertOptions::new().expiry(Duration::from_secs(60)),
            )
            .unwrap();

        let fetched = collection
            .get("doc", GetOptions::new().with_expiry(true))
            .unwrap();
        assert!(fetched.expiry.is_some());
        assert!(collection.get("doc", GetOptions::default()).unwrap().expiry.is_none());

        mock.advance_clock(Duration::from_secs(61));
        assert_eq!(
            collection.get("doc", GetOptions::default()),
            Err(Error::KeyNotFound("doc".into()))
        );
    }

    #[test]
    fn test_touch_extends_life() {
        let (mock, collection) = setup();
        collection
            .upsert("doc", &json!(1), UpsertOptions::new().expiry(Duration::from_secs(10)))
            .unwrap();
        collection
            .touch("doc", Duration::from_secs(100), TouchOptions::default())
            .unwrap();
        mock.advance_clock(Duration::from_secs(20));
        let fetched = collection
            .get_and_touch("doc", Duration::from_secs(100), TouchOptions::default())
            .unwrap();
        assert_eq!(fetched.content_as::<i64>().unwrap(), 1);
    }

    #[test]
    fn test_append_and_prepend() {
        let (_mock, collection) = setup();
        collection
            .upsert_raw(
                "log",
                kvdoc_engine::Content::string("b"),
                UpsertOptions::default(),
            )
            .unwrap();
        collection
            .append("log", "c", Default::default())
            .unwrap();
        collection
            .prepend("log", "a", Default::default())
            .unwrap();
        let fetched = collection.get("log", GetOptions::default()).unwrap();
        assert_eq!(fetched.content_bytes(), b"abc");

        assert_eq!(
            collection.append("nope", "x", Default::default()),
            Err(Error::KeyNotFound("nope".into()))
        );
    }

    #[test]
    fn test_multi_key_operations() {
        let (_mock, collection) = setup();
        let stored = collection.upsert_multi(
            &[("a", json!(1)), ("b", json!(2))],
            UpsertOptions::default(),
        );
        assert!(stored.iter().all(|(_, r)| r.is_ok()));

        let fetched = collection.get_multi(&["a", "missing", "b"], GetOptions::default());
        let keys: Vec<&str> = fetched.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, ["a", "missing", "b"]);
        assert!(fetched[0].1.is_ok());
        assert_eq!(fetched[1].1, Err(Error::KeyNotFound("missing".into())));

        let removed = collection.remove_multi(&["a", "b"], RemoveOptions::default());
        assert!(removed.iter().all(|(_, r)| r.is_ok()));
        assert!(!collection.exists("a", ExistsOptions::default()).unwrap().exists);
    }

    #[test]
    fn test_tokens_absent_without_negotiation() {
        let (_mock, collection) = setup_with(
            Config::default(),
            ConnectionOptions::new().mutation_tokens(false),
        );
        let result = collection
            .upsert("doc", &json!(1), UpsertOptions::default())
            .unwrap();
        assert!(result.token.is_none());
        assert!(MutationState::from([&result]).unwrap().is_empty());
    }
}

mod subdocument {
    use super::*;

    #[test]
    fn test_store_semantics() {
        let (_mock, collection) = setup();
        let spec = [MutateInSpec::upsert("name", json!("kv"))];

        assert_eq!(
            collection.mutate_in("doc", &spec, MutateInOptions::default()),
            Err(Error::KeyNotFound("doc".into()))
        );
        collection
            .mutate_in(
                "doc",
                &spec,
                MutateInOptions::new().store_semantics(StoreSemantics::Upsert),
            )
            .unwrap();
        assert_eq!(
            collection.mutate_in(
                "doc",
                &spec,
                MutateInOptions::new().store_semantics(StoreSemantics::Insert),
            ),
            Err(Error::KeyExists("doc".into()))
        );
        assert_eq!(content(&collection, "doc"), json!({"name": "kv"}));
    }

    #[test]
    fn test_mutate_in_cas_guard() {
        let (_mock, collection) = setup();
        let stored = collection
            .upsert("doc", &json!({"n": 0}), UpsertOptions::default())
            .unwrap();
        collection
            .upsert("doc", &json!({"n": 1}), UpsertOptions::default())
            .unwrap();
        assert_eq!(
            collection.mutate_in(
                "doc",
                &[MutateInSpec::counter("n", 1)],
                MutateInOptions::new().cas(stored.cas),
            ),
            Err(Error::CasMismatch("doc".into()))
        );
    }

    #[test]
    fn test_counter_and_arrays() {
        let (_mock, collection) = setup();
        collection
            .upsert("doc", &json!({"n": 5, "tags": ["b"]}), UpsertOptions::default())
            .unwrap();

        let result = collection
            .mutate_in(
                "doc",
                &[
                    MutateInSpec::counter("n", -2),
                    MutateInSpec::array_prepend("tags", json!("a")),
                    MutateInSpec::array_append_all("tags", vec![json!("c"), json!("d")]),
                    MutateInSpec::array_insert("tags[1]", json!("x")),
                    MutateInSpec::array_add_unique("tags", json!("a")),
                    MutateInSpec::counter("n", 0),
                ],
                MutateInOptions::default(),
            )
            .unwrap();

        assert_eq!(result.content_as::<i64>(0).unwrap(), 3);
        assert_eq!(result.status_at(4).unwrap(), Status::PathExists);
        assert!(result.entry(5).unwrap().error().is_some());
        assert_eq!(
            content(&collection, "doc"),
            json!({"n": 3, "tags": ["a", "x", "b", "c", "d"]})
        );
    }

    #[test]
    fn test_xattrs_and_macros() {
        let (_mock, collection) = setup();
        let result = collection
            .mutate_in(
                "doc",
                &[
                    MutateInSpec::upsert("body", json!(true)),
                    MutateInSpec::upsert("meta.cas", json!("${Mutation.CAS}"))
                        .xattr()
                        .create_path()
                        .expand_macros(),
                ],
                MutateInOptions::new().store_semantics(StoreSemantics::Upsert),
            )
            .unwrap();
        assert!(result.error().is_none());

        let lookup = collection
            .lookup_in(
                "doc",
                &[
                    LookupInSpec::get("body"),
                    LookupInSpec::get("meta.cas").xattr(),
                ],
                LookupInOptions::default(),
            )
            .unwrap();
        assert!(lookup.content_as::<bool>(0).unwrap());
        assert_eq!(
            lookup.content_as::<String>(1).unwrap(),
            format!("0x{:016x}", result.cas)
        );
        // Xattrs stay out of the body.
        assert_eq!(content(&collection, "doc"), json!({"body": true}));
    }

    #[test]
    fn test_non_json_document() {
        let (_mock, collection) = setup();
        collection
            .upsert_raw(
                "blob",
                kvdoc_engine::Content::binary(vec![0xff, 0x00]),
                UpsertOptions::default(),
            )
            .unwrap();
        let lookup = collection
            .lookup_in("blob", &[LookupInSpec::get("a")], LookupInOptions::default())
            .unwrap();
        assert_eq!(lookup.status_at(0).unwrap(), Status::DocNotJson);
    }

    #[test]
    fn test_retrieve_in_and_full_document() {
        let (_mock, collection) = setup();
        collection
            .upsert("doc", &json!({"a": 1, "b": {"c": 2}}), UpsertOptions::default())
            .unwrap();
        let result = collection.retrieve_in("doc", &["a", "b.c"]).unwrap();
        assert_eq!(result.content_as::<i64>(1).unwrap(), 2);

        let whole = collection
            .lookup_in("doc", &[LookupInSpec::get("")], LookupInOptions::default())
            .unwrap();
        assert_eq!(
            whole.content_as::<Value>(0).unwrap(),
            json!({"a": 1, "b": {"c": 2}})
        );
    }
}

mod datastructures {
    use super::*;

    #[test]
    fn test_map() {
        let (_mock, collection) = setup();
        collection.map_add("profile", "name", "ada").unwrap();
        collection.map_add("profile", "age", &36).unwrap();
        assert_eq!(collection.map_get::<String>("profile", "name").unwrap(), "ada");
        assert_eq!(collection.map_size("profile").unwrap(), 2);
        collection.map_remove("profile", "age").unwrap();
        assert_eq!(collection.map_size("profile").unwrap(), 1);
        assert!(matches!(
            collection.map_remove("profile", "age"),
            Err(Error::PathNotFound(_))
        ));
    }

    #[test]
    fn test_list() {
        let (_mock, collection) = setup();
        collection.list_push("list", &2).unwrap();
        collection.list_push("list", &3).unwrap();
        collection.list_shift("list", &1).unwrap();
        assert_eq!(collection.list_size("list").unwrap(), 3);
        assert_eq!(collection.list_get::<i64>("list", 0).unwrap(), 1);
        assert_eq!(collection.list_get::<i64>("list", -1).unwrap(), 3);

        collection.list_set("list", 1, &20).unwrap();
        collection.list_remove("list", 0).unwrap();
        assert_eq!(content(&collection, "list"), json!([20, 3]));
    }

    #[test]
    fn test_set() {
        let (_mock, collection) = setup();
        assert!(collection.set_add("set", "a").unwrap());
        assert!(collection.set_add("set", "b").unwrap());
        assert!(!collection.set_add("set", "a").unwrap());
        assert_eq!(collection.set_size("set").unwrap(), 2);
        assert!(collection.set_exists("set", "b").unwrap());

        assert!(collection.set_remove("set", "a").unwrap().is_some());
        assert!(collection.set_remove("set", "zzz").unwrap().is_none());
        assert!(!collection.set_exists("set", "a").unwrap());
    }

    #[test]
    fn test_queue_is_fifo() {
        let (_mock, collection) = setup();
        collection.queue_push("jobs", "first").unwrap();
        collection.queue_push("jobs", "second").unwrap();
        assert_eq!(collection.queue_size("jobs").unwrap(), 2);

        assert_eq!(collection.queue_pop::<String>("jobs").unwrap().as_deref(), Some("first"));
        assert_eq!(collection.queue_pop::<String>("jobs").unwrap().as_deref(), Some("second"));
        assert_eq!(collection.queue_pop::<String>("jobs").unwrap(), None);
    }
}

mod durability {
    use super::*;

    fn quick() -> ConnectionOptions {
        ConnectionOptions::new()
            .durability_interval(Duration::from_millis(5))
            .durability_timeout(Duration::from_millis(50))
    }

    #[test]
    fn test_observe_durability_met() {
        let (_mock, collection) = setup_with(Config::default(), quick());
        collection
            .upsert(
                "doc",
                &json!(1),
                UpsertOptions::new().persist_to(2).replicate_to(1),
            )
            .unwrap();
    }

    #[test]
    fn test_observe_durability_times_out_after_applying() {
        let (mock, collection) = setup_with(Config::default(), quick());
        mock.set_topology(|t| t.replicating = false);

        let err = collection
            .upsert("doc", &json!(1), UpsertOptions::new().replicate_to(1))
            .unwrap_err();
        assert!(err.is_ambiguous());
        let applied = err.applied_mutation().unwrap();
        assert_eq!(collection.get("doc", GetOptions::default()).unwrap().cas, applied.cas);
    }

    #[test]
    fn test_observe_skipped_when_no_spec_applied() {
        let (_mock, collection) = setup_with(Config::default(), quick());
        let stored = collection
            .upsert("doc", &json!({"a": 1}), UpsertOptions::default())
            .unwrap();

        let result = collection
            .mutate_in(
                "doc",
                &[MutateInSpec::replace("missing", json!(2))],
                MutateInOptions::new().replicate_to(1),
            )
            .unwrap();
        assert_eq!(result.status_at(0).unwrap(), Status::PathNotFound);
        assert!(matches!(result.error(), Some(Error::MultiFailure { .. })));
        assert_eq!(collection.get("doc", GetOptions::default()).unwrap().cas, stored.cas);
    }

    #[test]
    fn test_partial_mutate_in_durability_failure_keeps_spec_detail() {
        let (mock, collection) = setup_with(Config::default(), quick());
        collection
            .upsert("doc", &json!({"a": 1}), UpsertOptions::default())
            .unwrap();
        mock.set_topology(|t| t.replicating = false);

        let err = collection
            .mutate_in(
                "doc",
                &[
                    MutateInSpec::upsert("b", json!(2)),
                    MutateInSpec::replace("missing", json!(3)),
                ],
                MutateInOptions::new().replicate_to(1),
            )
            .unwrap_err();

        let applied = err.applied_mutation().unwrap();
        assert_eq!(collection.get("doc", GetOptions::default()).unwrap().cas, applied.cas);
        let failed = err.failed_specs();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].index, 1);
        assert_eq!(failed[0].status, Status::PathNotFound);
        assert_eq!(content(&collection, "doc"), json!({"a": 1, "b": 2}));
    }

    #[test]
    fn test_impossible_observe_requirement_sends_nothing() {
        let (_mock, collection) = setup_with(Config::default(), quick());
        let err = collection
            .upsert("doc", &json!(1), UpsertOptions::new().replicate_to(3))
            .unwrap_err();
        assert!(err.applied_mutation().is_none());
        assert!(!collection.exists("doc", ExistsOptions::default()).unwrap().exists);
    }

    #[test]
    fn test_sync_durability_impossible() {
        let (mock, collection) = setup();
        mock.set_topology(|t| t.available_replicas = 0);
        let err = collection
            .upsert(
                "doc",
                &json!(1),
                UpsertOptions::new().durability_level(DurabilityLevel::Majority),
            )
            .unwrap_err();
        assert!(matches!(err, Error::DurabilityFailure { applied: None, .. }));
    }

    #[test]
    fn test_sync_write_ambiguous_carries_result() {
        let (mock, collection) = setup();
        mock.set_topology(|t| t.ambiguous_sync_writes = true);
        let err = collection
            .upsert(
                "doc",
                &json!(1),
                UpsertOptions::new().durability_level(DurabilityLevel::Majority),
            )
            .unwrap_err();
        assert!(err.applied_mutation().is_some());
        assert!(collection.exists("doc", ExistsOptions::default()).unwrap().exists);
    }

    #[test]
    fn test_injected_timeout_is_ambiguous() {
        let (mock, collection) = setup();
        mock.fail_next(Error::Timeout("no reply".into()));
        let err = collection
            .upsert("doc", &json!(1), UpsertOptions::default())
            .unwrap_err();
        assert!(err.is_ambiguous());
        assert!(err.applied_mutation().is_none());
    }
}

mod sessions {
    use super::*;

    #[test]
    fn test_authentication() {
        let mock = MockCluster::new_shared(Config {
            password: Some("secret".into()),
            ..Config::default()
        });

        let mut cluster = Cluster::connect(mock.clone(), ConnectionOptions::default());
        cluster.authenticate(PasswordAuthenticator::new("admin", "wrong"));
        assert!(matches!(
            cluster.bucket("default"),
            Err(Error::AuthenticationFailure(_))
        ));

        cluster.authenticate(PasswordAuthenticator::new("admin", "secret"));
        let bucket = cluster.bucket("default").unwrap();
        assert_eq!(bucket.info().partitions, 64);
        assert!(matches!(
            cluster.bucket("missing"),
            Err(Error::BucketNotFound(_))
        ));
    }

    #[test]
    fn test_collections_are_isolated() {
        let mock = MockCluster::new_shared(Config::default());
        let cluster = Cluster::connect(mock, ConnectionOptions::default());
        let bucket = cluster.bucket("default").unwrap();
        let orders = bucket.scope("shop").collection("orders");
        let users = bucket.scope("shop").collection("users");

        orders
            .upsert("id-1", &json!("order"), UpsertOptions::default())
            .unwrap();
        assert!(!users.exists("id-1", ExistsOptions::default()).unwrap().exists);
        assert!(!bucket
            .default_collection()
            .exists("id-1", ExistsOptions::default())
            .unwrap()
            .exists);
    }
}
