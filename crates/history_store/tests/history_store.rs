use std::sync::Arc;

use history_store::{
    counter_key, key_file_name, store_root, FileStore, KeyValueStore, MemoryStore, StoreError,
    HISTORY_KEY, STRATEGY_KEY,
};
use tempfile::TempDir;

fn file_store() -> (TempDir, FileStore) {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let store = FileStore::new(store_root(dir.path()));
    (dir, store)
}

#[tokio::test]
async fn file_store_missing_key_reads_as_none() {
    let (_dir, store) = file_store();

    let value = store.get(HISTORY_KEY).await.expect("missing key is not an error");
    assert_eq!(value, None);
}

#[tokio::test]
async fn file_store_creates_root_and_round_trips_values() {
    let (dir, store) = file_store();

    store
        .set(STRATEGY_KEY, "Counter-press, 4-2-3-1\nyoung squad")
        .await
        .expect("set should succeed");

    assert_eq!(store.root(), store_root(dir.path()).as_path());
    assert!(store.root().is_dir());
    assert!(dir.path().join("scout_chat").join("store").is_dir());
    assert_eq!(
        store.get(STRATEGY_KEY).await.expect("get should succeed"),
        Some("Counter-press, 4-2-3-1\nyoung squad".to_string())
    );
}

#[tokio::test]
async fn file_store_last_write_wins_and_leaves_no_temp_file() {
    let (_dir, store) = file_store();

    store.set(HISTORY_KEY, "[1]").await.expect("first write");
    store.set(HISTORY_KEY, "[1,2]").await.expect("second write");

    assert_eq!(
        store.get(HISTORY_KEY).await.expect("get"),
        Some("[1,2]".to_string())
    );

    let names: Vec<String> = std::fs::read_dir(store.root())
        .expect("root should be readable")
        .map(|entry| {
            entry
                .expect("dir entry")
                .file_name()
                .to_string_lossy()
                .into_owned()
        })
        .collect();
    assert_eq!(names, vec![key_file_name(HISTORY_KEY)]);
}

#[tokio::test]
async fn file_store_remove_is_idempotent() {
    let (_dir, store) = file_store();

    store.set(HISTORY_KEY, "[]").await.expect("set");
    store.remove(HISTORY_KEY).await.expect("first remove");
    store.remove(HISTORY_KEY).await.expect("second remove");

    assert_eq!(store.get(HISTORY_KEY).await.expect("get"), None);
}

#[tokio::test]
async fn file_store_keys_do_not_collide_after_escaping() {
    let (_dir, store) = file_store();

    store.set("a/b", "slash").await.expect("set slash key");
    store.set("a_b", "underscore").await.expect("set underscore key");

    assert_eq!(store.get("a/b").await.expect("get"), Some("slash".to_string()));
    assert_eq!(
        store.get("a_b").await.expect("get"),
        Some("underscore".to_string())
    );
}

#[tokio::test]
async fn file_store_reports_io_errors_with_operation_and_path() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, "file").expect("blocker file");
    let store = FileStore::new(blocker.join("store"));

    let error = store
        .set(&counter_key("sends"), "1")
        .await
        .expect_err("root under a file cannot be created");

    match error {
        StoreError::Io {
            operation, path, ..
        } => {
            assert_eq!(operation, "creating store directory");
            assert_eq!(path, blocker.join("store"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn empty_keys_are_rejected() {
    let (_dir, store) = file_store();
    assert!(matches!(store.get("").await, Err(StoreError::EmptyKey)));
    assert!(matches!(
        MemoryStore::new().set("", "x").await,
        Err(StoreError::EmptyKey)
    ));
}

#[tokio::test]
async fn memory_store_behaves_like_file_store_through_the_trait() {
    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new().with_value(STRATEGY_KEY, "press"));

    assert_eq!(
        store.get(STRATEGY_KEY).await.expect("get"),
        Some("press".to_string())
    );
    assert_eq!(store.get(HISTORY_KEY).await.expect("get"), None);

    store.set(HISTORY_KEY, "[]").await.expect("set");
    store.remove(STRATEGY_KEY).await.expect("remove");
    store.remove(STRATEGY_KEY).await.expect("remove again");

    assert_eq!(store.get(STRATEGY_KEY).await.expect("get"), None);
    assert_eq!(store.get(HISTORY_KEY).await.expect("get"), Some("[]".to_string()));
}
