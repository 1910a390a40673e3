use super::*;
use crate::dialect::{MysqlDialect, PostgresDialect};

fn uid_backfill() -> RawSqlVariants {
    RawSqlVariants::new()
        .sqlite("UPDATE cloud_migration SET uid=printf('u%09d',id) WHERE uid IS NULL;")
        .postgres(
            "UPDATE `cloud_migration` SET uid='u' || lpad('' || id::text,9,'0') WHERE uid IS NULL;",
        )
        .mysql("UPDATE cloud_migration SET uid=concat('u',lpad(id,9,'0')) WHERE uid IS NULL;")
}

#[test]
fn test_resolve_exact_match() {
    let raw = uid_backfill();
    for dialect in Dialect::ALL {
        assert!(raw.covers(dialect));
        assert!(raw.resolve(dialect).unwrap().is_some());
    }
    assert!(raw
        .resolve(Dialect::Mysql)
        .unwrap()
        .unwrap()
        .contains("concat('u'"));
}

#[test]
fn test_missing_variant_is_unsupported() {
    let raw = RawSqlVariants::new()
        .sqlite("SELECT 1")
        .postgres("SELECT 1");
    assert!(!raw.covers(Dialect::Mysql));
    let err = raw.resolve(Dialect::Mysql).unwrap_err();
    assert!(matches!(
        err,
        SqlError::UnsupportedDialect {
            dialect: Dialect::Mysql,
            ..
        }
    ));
    assert!(err.to_string().contains("sqlite, postgres"));
}

#[test]
fn test_fallback_used_when_no_match() {
    let raw = RawSqlVariants::new()
        .mysql("SELECT 2")
        .with_fallback("SELECT 1");
    assert_eq!(raw.resolve(Dialect::Sqlite).unwrap(), Some("SELECT 1"));
    assert_eq!(raw.resolve(Dialect::Mysql).unwrap(), Some("SELECT 2"));
}

#[test]
fn test_explicit_skip() {
    let raw = RawSqlVariants::new()
        .postgres("CREATE EXTENSION IF NOT EXISTS pgcrypto")
        .skip(Dialect::Sqlite)
        .skip(Dialect::Mysql);
    assert_eq!(raw.resolve(Dialect::Sqlite).unwrap(), None);
    assert!(raw.resolve(Dialect::Postgres).unwrap().is_some());
}

#[test]
fn test_render_normalizes_for_postgres() {
    let raw = uid_backfill();
    let pg = raw.render(&PostgresDialect::new()).unwrap().unwrap();
    assert!(pg.starts_with("UPDATE \"cloud_migration\""));
    let mysql = raw.render(&MysqlDialect::new()).unwrap().unwrap();
    assert!(mysql.starts_with("UPDATE cloud_migration"));
}

#[test]
fn test_deserialize_yaml() {
    let yaml = r#"
sqlite: "UPDATE t SET a = 1"
postgres: "UPDATE t SET a = 2"
mysql: null
"#;
    let raw: RawSqlVariants = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(raw.resolve(Dialect::Sqlite).unwrap(), Some("UPDATE t SET a = 1"));
    assert_eq!(raw.resolve(Dialect::Mysql).unwrap(), None);
    assert!(raw.fallback.is_none());
}

#[test]
fn test_empty() {
    assert!(RawSqlVariants::new().is_empty());
    assert!(!RawSqlVariants::new().with_fallback("SELECT 1").is_empty());
}
