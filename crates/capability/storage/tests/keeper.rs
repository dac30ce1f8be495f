use domain::{KeyValue, KvResponse};
use edge_storage::keeper::{
    children_pattern, decode_value, encode_value, flatten, join_key, validate_key, value_text,
};
use edge_storage::sql::escape_like;
use edge_storage::{ErrorKind, InMemoryKvStore, KvStore};
use serde_json::{Value, json};

#[test]
fn keys_join_without_doubled_separators() {
    assert_eq!(join_key("edgex/core", "data"), "edgex/core/data");
    assert_eq!(join_key("edgex/core/", "/data"), "edgex/core/data");
    assert_eq!(join_key("", "data"), "data");
    assert_eq!(children_pattern("edgex/core/"), "edgex/core/%");
}

#[test]
fn like_wildcards_in_keys_are_escaped() {
    assert_eq!(children_pattern("a_b"), "a\\_b/%");
    assert_eq!(children_pattern("100%/"), "100\\%/%");
    assert_eq!(escape_like("50%_\\"), "50\\%\\_\\\\");
    assert_eq!(escape_like("plain/key"), "plain/key");
}

#[test]
fn flatten_emits_one_leaf_per_scalar_and_skips_empty_objects() {
    let value = json!({
        "Writable": { "LogLevel": "INFO", "Retries": 3 },
        "Service": { "Port": 59880, "Tags": ["a", "b"] },
        "Empty": {}
    });
    let leaves = flatten("core-data", &value);
    let keys: Vec<&str> = leaves.iter().map(|(key, _)| key.as_str()).collect();
    assert_eq!(
        keys,
        vec![
            "core-data/Service/Port",
            "core-data/Service/Tags",
            "core-data/Writable/LogLevel",
            "core-data/Writable/Retries",
        ]
    );
    assert_eq!(leaves[1].1, json!(["a", "b"]));
}

#[test]
fn values_are_stored_as_base64_of_text_form() {
    assert_eq!(value_text(&json!("INFO")), "INFO");
    assert_eq!(value_text(&json!(3)), "3");
    assert_eq!(value_text(&json!(true)), "true");
    assert_eq!(value_text(&json!({"a": 1})), "{\"a\":1}");

    assert_eq!(value_text(&Value::Null), "");
    assert_eq!(encode_value(&Value::Null), "");

    let stored = encode_value(&json!("INFO"));
    assert_eq!(stored, "SU5GTw==");
    assert_eq!(decode_value(&stored).expect("decode"), "INFO");

    let err = decode_value("not base64!").expect_err("garbage");
    assert_eq!(err.kind(), ErrorKind::ServerError);
}

#[test]
fn empty_key_is_invalid() {
    for key in ["", "/", "//"] {
        let err = validate_key(key).expect_err("empty key");
        assert_eq!(err.kind(), ErrorKind::ContractInvalid);
    }
    validate_key("a/b").expect("valid key");
}

async fn seeded() -> InMemoryKvStore {
    let store = InMemoryKvStore::new();
    store
        .add_keeper_keys(
            KeyValue::new(
                "core-data",
                json!({ "Writable": { "LogLevel": "INFO" }, "Service": { "Port": 59880 } }),
            ),
            true,
        )
        .await
        .expect("add flattened");
    store
}

#[tokio::test]
async fn flattened_put_returns_leaf_keys() {
    let store = InMemoryKvStore::new();
    let keys = store
        .add_keeper_keys(
            KeyValue::new("core-data", json!({ "Writable": { "LogLevel": "INFO" } })),
            true,
        )
        .await
        .expect("add flattened");
    assert_eq!(keys, vec!["core-data/Writable/LogLevel"]);
}

#[tokio::test]
async fn query_returns_key_and_children() {
    let store = seeded().await;

    let keys = store
        .keeper_keys("core-data", true, false)
        .await
        .expect("keys only");
    let keys: Vec<&str> = keys.iter().map(KvResponse::key).collect();
    assert_eq!(
        keys,
        vec!["core-data/Service/Port", "core-data/Writable/LogLevel"]
    );

    let entries = store
        .keeper_keys("core-data/Writable/LogLevel", false, true)
        .await
        .expect("raw entry");
    match &entries[0] {
        KvResponse::Entry(entry) => {
            assert_eq!(entry.value, Value::String("INFO".to_string()));
            assert!(entry.created > 0);
        }
        other => panic!("expected entry, got {other:?}"),
    }

    let encoded = store
        .keeper_keys("core-data/Writable/LogLevel", false, false)
        .await
        .expect("encoded entry");
    match &encoded[0] {
        KvResponse::Entry(entry) => assert_eq!(entry.value, json!("SU5GTw==")),
        other => panic!("expected entry, got {other:?}"),
    }
}

#[tokio::test]
async fn prefix_match_respects_separator() {
    let store = seeded().await;
    store
        .add_keeper_keys(KeyValue::new("core-data-extra", json!("x")), false)
        .await
        .expect("add sibling");

    let keys = store
        .keeper_keys("core-data", true, false)
        .await
        .expect("keys only");
    assert!(keys.iter().all(|response| response.key() != "core-data-extra"));
}

#[tokio::test]
async fn put_overwrites_existing_value() {
    let store = seeded().await;
    store
        .add_keeper_keys(KeyValue::new("core-data/Writable/LogLevel", json!("DEBUG")), false)
        .await
        .expect("overwrite");
    let entries = store
        .keeper_keys("core-data/Writable/LogLevel", false, true)
        .await
        .expect("raw entry");
    match &entries[0] {
        KvResponse::Entry(entry) => {
            assert_eq!(entry.value, json!("DEBUG"));
            assert!(entry.modified >= entry.created);
        }
        other => panic!("expected entry, got {other:?}"),
    }
}

#[tokio::test]
async fn missing_key_is_not_found() {
    let store = seeded().await;
    let err = store
        .keeper_keys("core-metadata", true, false)
        .await
        .expect_err("missing");
    assert_eq!(err.kind(), ErrorKind::EntityDoesNotExist);
    let err = store
        .delete_keeper_keys("core-metadata", false)
        .await
        .expect_err("missing");
    assert_eq!(err.kind(), ErrorKind::EntityDoesNotExist);
}

#[tokio::test]
async fn delete_with_children_requires_recursion() {
    let store = seeded().await;
    let err = store
        .delete_keeper_keys("core-data", false)
        .await
        .expect_err("has children");
    assert_eq!(err.kind(), ErrorKind::StatusConflict);

    let mut deleted = store
        .delete_keeper_keys("core-data", true)
        .await
        .expect("recursive delete");
    deleted.sort();
    assert_eq!(
        deleted,
        vec!["core-data/Service/Port", "core-data/Writable/LogLevel"]
    );
    assert!(store.keeper_keys("core-data", true, false).await.is_err());
}

#[tokio::test]
async fn leaf_delete_does_not_need_recursion() {
    let store = seeded().await;
    let deleted = store
        .delete_keeper_keys("core-data/Service/Port", false)
        .await
        .expect("delete leaf");
    assert_eq!(deleted, vec!["core-data/Service/Port"]);
}

#[test]
fn null_leaves_are_kept_when_flattening() {
    let leaves = flatten("svc", &json!({ "Timeout": null, "Port": 1 }));
    assert_eq!(
        leaves,
        vec![
            ("svc/Port".to_string(), json!(1)),
            ("svc/Timeout".to_string(), Value::Null),
        ]
    );
}

#[tokio::test]
async fn null_value_reads_back_as_empty_text() {
    let store = InMemoryKvStore::new();
    store
        .add_keeper_keys(KeyValue::new("svc/Timeout", Value::Null), false)
        .await
        .expect("add null");
    let responses = store
        .keeper_keys("svc/Timeout", false, true)
        .await
        .expect("raw query");
    match &responses[0] {
        KvResponse::Entry(entry) => assert_eq!(entry.value, json!("")),
        other => panic!("expected entry, got {other:?}"),
    }
}

#[tokio::test]
async fn recursive_delete_matches_underscore_literally() {
    let store = InMemoryKvStore::new();
    for key in ["a_b/x", "axb/y"] {
        store
            .add_keeper_keys(KeyValue::new(key, json!("v")), false)
            .await
            .expect("add key");
    }
    let deleted = store
        .delete_keeper_keys("a_b", true)
        .await
        .expect("recursive delete");
    assert_eq!(deleted, vec!["a_b/x"]);
    let remaining = store
        .keeper_keys("axb", true, false)
        .await
        .expect("sibling remains");
    assert_eq!(remaining.len(), 1);
}
