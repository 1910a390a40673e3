use super::*;
use crate::traits::{DatabaseCore, DatabaseSchema};

#[tokio::test]
async fn test_connect_sqlite_memory() {
    let db = connect("sqlite::memory:", Dialect::Sqlite).await.unwrap();
    assert_eq!(db.dialect(), Dialect::Sqlite);
    db.execute("CREATE TABLE t (id INTEGER)").await.unwrap();
    assert!(db.relation_exists("t").await.unwrap());
}

#[tokio::test]
async fn test_connect_rejects_mismatched_dialect() {
    let err = connect("sqlite::memory:", Dialect::Postgres)
        .await
        .err()
        .unwrap();
    assert!(matches!(err, DbError::UnsupportedUrl(_)));
}

#[tokio::test]
async fn test_connect_rejects_unknown_scheme() {
    let err = connect("oracle://db/x", Dialect::Sqlite)
        .await
        .err()
        .unwrap();
    assert!(matches!(err, DbError::UnsupportedUrl(_)));
}

#[tokio::test]
async fn test_connect_config_creates_file() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("app.db");
    let config = DatabaseConfig {
        url: format!("sqlite://{}?mode=rwc", path.display()),
        dialect: None,
    };
    let db = connect_config(&config).await.unwrap();
    db.execute("CREATE TABLE t (id INTEGER)").await.unwrap();
    assert!(path.exists());
}
