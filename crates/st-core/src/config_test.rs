use super::*;
use serial_test::serial;

#[test]
fn test_parse_minimal_config() {
    let config: Config = serde_yaml::from_str("name: grafana").unwrap();
    config.validate().unwrap();
    assert_eq!(config.ledger_table, "migration_log");
    assert_eq!(config.lock.key, "strata_migrations");
    assert_eq!(config.lock.wait_timeout(), Duration::ZERO);
    assert_eq!(config.database.dialect().unwrap(), Dialect::Sqlite);

    let root = PathBuf::from("/tmp/project");
    assert_eq!(
        config.migration_paths_absolute(&root),
        vec![root.join("migrations")]
    );
}

#[test]
fn test_parse_full_config() {
    let yaml = r#"
name: grafana
database:
  url: "postgres://grafana@localhost/grafana"
ledger_table: schema_log
lock:
  key: grafana_migrations
  wait_timeout_secs: 30
  poll_interval_ms: 250
migration_paths: [migrations/core, migrations/cloud]
targets:
  local:
    database:
      url: "sqlite://grafana.db?mode=rwc"
  prod: {}
"#;
    let config: Config = serde_yaml::from_str(yaml).unwrap();
    config.validate().unwrap();
    assert_eq!(config.database.dialect().unwrap(), Dialect::Postgres);
    assert_eq!(config.lock.wait_timeout(), Duration::from_secs(30));
    assert_eq!(config.lock.poll_interval(), Duration::from_millis(250));
    assert_eq!(config.available_targets(), vec!["local", "prod"]);

    let local = config.get_database_config(Some("local")).unwrap();
    assert_eq!(local.dialect().unwrap(), Dialect::Sqlite);

    // Targets without a database block fall back to the base config
    let prod = config.get_database_config(Some("prod")).unwrap();
    assert_eq!(prod, config.database);
}

#[test]
fn test_unknown_target() {
    let config: Config = serde_yaml::from_str("name: grafana").unwrap();
    let err = config.get_database_config(Some("staging")).unwrap_err();
    assert!(err.to_string().contains("Target 'staging' not found"));
}

#[test]
fn test_dialect_mismatch_rejected() {
    let yaml = r#"
name: grafana
database:
  url: "mysql://root@localhost/grafana"
  dialect: postgres
"#;
    let config: Config = serde_yaml::from_str(yaml).unwrap();
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("does not match url scheme"));
}

#[test]
fn test_explicit_dialect_for_unknown_scheme() {
    let yaml = r#"
name: grafana
database:
  url: "cockroach://localhost/grafana"
  dialect: postgres
"#;
    let config: Config = serde_yaml::from_str(yaml).unwrap();
    config.validate().unwrap();
    assert_eq!(config.database.dialect().unwrap(), Dialect::Postgres);
}

#[test]
fn test_invalid_ledger_table() {
    let config: Config =
        serde_yaml::from_str("name: grafana\nledger_table: \"log; DROP\"").unwrap();
    assert!(config.validate().is_err());
}

#[test]
fn test_unknown_field_rejected() {
    let result: Result<Config, _> = serde_yaml::from_str("name: grafana\nmodel_paths: [x]");
    assert!(result.is_err());
}

#[test]
fn test_load_from_dir() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("strata.yml"),
        "name: on_disk\ndatabase:\n  url: \"mysql://root@db/app\"\n",
    )
    .unwrap();
    let config = Config::load_from_dir(dir.path()).unwrap();
    assert_eq!(config.name, "on_disk");
    assert_eq!(config.database.dialect().unwrap(), Dialect::Mysql);
}

#[test]
fn test_load_missing_config() {
    let dir = tempfile::tempdir().unwrap();
    let err = Config::load_from_dir(dir.path()).unwrap_err();
    assert!(matches!(err, CoreError::ConfigNotFound { .. }));
}

#[test]
#[serial]
fn test_resolve_target_priority() {
    std::env::set_var(TARGET_ENV_VAR, "prod");
    assert_eq!(Config::resolve_target(Some("dev")), Some("dev".to_string()));
    assert_eq!(Config::resolve_target(None), Some("prod".to_string()));
    std::env::remove_var(TARGET_ENV_VAR);
    assert_eq!(Config::resolve_target(None), None);
}
