use super::*;
use crate::traits::{DatabaseCore, DatabaseTransaction};

async fn backend_with_users() -> SqliteBackend {
    let db = SqliteBackend::in_memory().await.unwrap();
    db.execute_batch(
        "CREATE TABLE users (id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL, name TEXT NULL, score REAL NULL); \
         CREATE UNIQUE INDEX UQE_users_name ON users (name); \
         INSERT INTO users (name, score) VALUES ('ada', 1.5), ('grace', NULL);",
    )
    .await
    .unwrap();
    db
}

#[tokio::test]
async fn test_in_memory() {
    let db = SqliteBackend::in_memory().await.unwrap();
    assert_eq!(db.db_type(), "sqlite");
    assert_eq!(db.dialect(), Dialect::Sqlite);
}

#[tokio::test]
async fn test_execute_returns_affected_rows() {
    let db = backend_with_users().await;
    let affected = db.execute("UPDATE users SET score = 0").await.unwrap();
    assert_eq!(affected, 2);
}

#[tokio::test]
async fn test_query_count() {
    let db = backend_with_users().await;
    assert_eq!(db.query_count("SELECT * FROM users").await.unwrap(), 2);
    assert_eq!(
        db.query_count("SELECT 1 FROM users WHERE score IS NULL")
            .await
            .unwrap(),
        1
    );
}

#[tokio::test]
async fn test_query_rows_renders_cells() {
    let db = backend_with_users().await;
    let rows = db
        .query_rows("SELECT id, name, score FROM users ORDER BY id")
        .await
        .unwrap();
    assert_eq!(
        rows,
        vec![
            vec![
                Some("1".to_string()),
                Some("ada".to_string()),
                Some("1.5".to_string())
            ],
            vec![Some("2".to_string()), Some("grace".to_string()), None],
        ]
    );
}

#[tokio::test]
async fn test_execution_error_carries_statement() {
    let db = SqliteBackend::in_memory().await.unwrap();
    let err = db.execute("SELECT * FROM missing").await.unwrap_err();
    match err {
        DbError::ExecutionError { sql, .. } => assert_eq!(sql, "SELECT * FROM missing"),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_introspection() {
    let db = backend_with_users().await;
    assert!(db.relation_exists("users").await.unwrap());
    assert!(!db.relation_exists("nonexistent").await.unwrap());
    assert!(db.column_exists("users", "name").await.unwrap());
    assert!(!db.column_exists("users", "email").await.unwrap());
    assert!(!db.column_exists("nonexistent", "name").await.unwrap());
    assert!(db.index_exists("users", "UQE_users_name").await.unwrap());
    assert!(!db.index_exists("users", "IDX_users_score").await.unwrap());
}

#[tokio::test]
async fn test_rollback_discards_ddl() {
    let db = SqliteBackend::in_memory().await.unwrap();
    db.begin().await.unwrap();
    db.execute("CREATE TABLE scratch (id INTEGER)")
        .await
        .unwrap();
    db.rollback().await.unwrap();
    assert!(!db.relation_exists("scratch").await.unwrap());

    db.begin().await.unwrap();
    db.execute("CREATE TABLE scratch (id INTEGER)")
        .await
        .unwrap();
    db.commit().await.unwrap();
    assert!(db.relation_exists("scratch").await.unwrap());
}

#[tokio::test]
async fn test_commit_without_begin_fails() {
    let db = SqliteBackend::in_memory().await.unwrap();
    let err = db.commit().await.unwrap_err();
    assert!(matches!(
        err,
        DbError::TransactionError {
            action: "commit",
            ..
        }
    ));
}

#[tokio::test]
async fn test_lock_excludes_second_connection() {
    let dir = tempfile::TempDir::new().unwrap();
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("lock.db").display());

    let first = SqliteBackend::connect(&url).await.unwrap();
    let second = SqliteBackend::connect(&url).await.unwrap();
    assert_ne!(first.owner(), second.owner());

    assert!(first.try_lock("strata_migrations").await.unwrap());
    // Re-acquiring from the holder succeeds
    assert!(first.try_lock("strata_migrations").await.unwrap());
    assert!(!second.try_lock("strata_migrations").await.unwrap());
    // A different key is independent
    assert!(second.try_lock("other").await.unwrap());

    // Unlock by a non-holder leaves the lock in place
    second.unlock("strata_migrations").await.unwrap();
    assert!(!second.try_lock("strata_migrations").await.unwrap());

    first.unlock("strata_migrations").await.unwrap();
    assert!(second.try_lock("strata_migrations").await.unwrap());
}

#[tokio::test]
async fn test_force_unlock_clears_stale_lock() {
    let dir = tempfile::TempDir::new().unwrap();
    let url = format!(
        "sqlite://{}?mode=rwc",
        dir.path().join("stale.db").display()
    );

    let crashed = SqliteBackend::connect(&url).await.unwrap();
    assert!(crashed.try_lock("strata_migrations").await.unwrap());
    drop(crashed);

    let operator = SqliteBackend::connect(&url).await.unwrap();
    assert!(!operator.try_lock("strata_migrations").await.unwrap());
    assert!(operator.force_unlock("strata_migrations").await.unwrap());
    assert!(!operator.force_unlock("strata_migrations").await.unwrap());
    assert!(operator.try_lock("strata_migrations").await.unwrap());
}
