//! Tests for database initialization

use clist_common::db::{get_setting, init_database, set_setting, MAX_LOCK_WAIT_MS, SEARCH_RESULT_LIMIT};

#[tokio::test]
async fn test_database_creation_when_missing() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("nested").join("clist.db");

    let result = init_database(&db_path).await;

    assert!(result.is_ok(), "Database initialization failed: {:?}", result.err());
    assert!(db_path.exists(), "Database file was not created");
}

#[tokio::test]
async fn test_database_opens_existing() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("clist.db");

    let pool1 = init_database(&db_path).await;
    assert!(pool1.is_ok());
    drop(pool1);

    let pool2 = init_database(&db_path).await;
    assert!(pool2.is_ok(), "Failed to open existing database: {:?}", pool2.err());
}

#[tokio::test]
async fn test_all_tables_created() {
    let dir = tempfile::tempdir().unwrap();
    let pool = init_database(&dir.path().join("clist.db")).await.unwrap();

    for table in [
        "settings",
        "preview_sessions",
        "vendors",
        "survey_pending_ratings",
        "match_sessions",
    ] {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?)",
        )
        .bind(table)
        .fetch_one(&pool)
        .await
        .unwrap();

        assert!(exists, "table {} missing", table);
    }
}

#[tokio::test]
async fn test_default_settings_initialized() {
    let dir = tempfile::tempdir().unwrap();
    let pool = init_database(&dir.path().join("clist.db")).await.unwrap();

    let limit: i64 = get_setting(&pool, SEARCH_RESULT_LIMIT, 0).await.unwrap();
    assert_eq!(limit, 10);

    let wait: u64 = get_setting(&pool, MAX_LOCK_WAIT_MS, 0).await.unwrap();
    assert_eq!(wait, 5000);
}

#[tokio::test]
async fn test_existing_settings_survive_reinit() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("clist.db");

    let pool = init_database(&db_path).await.unwrap();
    set_setting(&pool, SEARCH_RESULT_LIMIT, "25").await.unwrap();
    pool.close().await;

    let pool = init_database(&db_path).await.unwrap();
    let limit: i64 = get_setting(&pool, SEARCH_RESULT_LIMIT, 0).await.unwrap();
    assert_eq!(limit, 25);
}

#[tokio::test]
async fn test_unparsable_setting_uses_default() {
    let dir = tempfile::tempdir().unwrap();
    let pool = init_database(&dir.path().join("clist.db")).await.unwrap();

    set_setting(&pool, SEARCH_RESULT_LIMIT, "lots").await.unwrap();

    let limit: i64 = get_setting(&pool, SEARCH_RESULT_LIMIT, 10).await.unwrap();
    assert_eq!(limit, 10);
}
