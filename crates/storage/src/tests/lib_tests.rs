use super::*;
use serde::Deserialize;

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct Snapshot {
    token: String,
    count: u32,
}

#[tokio::test]
async fn memory_store_round_trips_and_removes() {
    let store = MemoryStore::new();
    assert_eq!(store.get("missing").await.expect("get"), None);

    store.set("a", "1").await.expect("set");
    store.set("a", "2").await.expect("overwrite");
    assert_eq!(store.get("a").await.expect("get"), Some("2".to_string()));

    store.remove("a").await.expect("remove");
    assert!(store.keys().await.expect("keys").is_empty());
}

#[tokio::test]
async fn sqlite_store_overwrites_existing_key() {
    let store = SqliteStore::new("sqlite::memory:").await.expect("db");
    store.set(AUTH_STORE_KEY, "first").await.expect("set");
    store.set(AUTH_STORE_KEY, "second").await.expect("set again");
    store.set(TEAM_DASHBOARD_KEY, "{}").await.expect("set other");

    assert_eq!(
        store.get(AUTH_STORE_KEY).await.expect("get"),
        Some("second".to_string())
    );
    assert_eq!(
        store.keys().await.expect("keys"),
        vec![AUTH_STORE_KEY.to_string(), TEAM_DASHBOARD_KEY.to_string()]
    );

    store.remove(TEAM_DASHBOARD_KEY).await.expect("remove");
    assert_eq!(store.get(TEAM_DASHBOARD_KEY).await.expect("get"), None);
}

#[tokio::test]
async fn health_check_succeeds_for_live_pool() {
    let store = SqliteStore::new("sqlite::memory:").await.expect("db");
    store.health_check().await.expect("health check");
}

#[tokio::test]
async fn creates_database_file_when_missing() {
    let temp_root = tempfile::tempdir().expect("tempdir");
    let db_path = temp_root.path().join("nested").join("scip.db");
    let database_url = format!("sqlite://{}", db_path.to_string_lossy().replace('\\', "/"));

    let store = SqliteStore::new(&database_url).await.expect("db");
    store.set("k", "v").await.expect("set");
    drop(store);

    assert!(
        db_path.exists(),
        "database file should exist: {}",
        db_path.display()
    );

    let reopened = SqliteStore::new(&database_url).await.expect("reopen");
    assert_eq!(reopened.get("k").await.expect("get"), Some("v".to_string()));
}

#[tokio::test]
async fn json_helpers_encode_and_decode() {
    let store = MemoryStore::new();
    let snapshot = Snapshot {
        token: "abc".into(),
        count: 3,
    };
    save_json(&store, "snap", &snapshot).await.expect("save");
    let loaded: Option<Snapshot> = load_json(&store, "snap").await.expect("load");
    assert_eq!(loaded, Some(snapshot));
}

#[tokio::test]
async fn load_json_reports_corrupt_values() {
    let store = MemoryStore::new();
    store.set("snap", "{not json").await.expect("set");
    let err = load_json::<Snapshot>(&store, "snap")
        .await
        .expect_err("corrupt value");
    assert!(err.to_string().contains("snap"));
}

#[test]
fn sqlite_path_ignores_memory_urls() {
    assert_eq!(sqlite_path("sqlite::memory:"), None);
    assert_eq!(
        sqlite_path("sqlite://./data/scip.db?mode=rwc"),
        Some(PathBuf::from("./data/scip.db"))
    );
}
