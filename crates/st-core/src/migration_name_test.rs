use super::*;

#[test]
fn test_valid_name() {
    let name = MigrationName::new("create cloud_migration table v1");
    assert_eq!(name.as_str(), "create cloud_migration table v1");
    assert_eq!(name, "create cloud_migration table v1");
}

#[test]
fn test_rejects_empty_and_padded() {
    assert!(MigrationName::try_new("").is_none());
    assert!(MigrationName::try_new(" add uid").is_none());
    assert!(MigrationName::try_new("add uid\n").is_none());
}

#[test]
#[should_panic(expected = "MigrationName must be non-empty")]
fn test_new_panics_on_empty() {
    let _ = MigrationName::new("");
}

#[test]
fn test_deserialize_rejects_empty() {
    let result: Result<MigrationName, _> = serde_yaml::from_str("''");
    assert!(result.is_err());

    let name: MigrationName = serde_yaml::from_str("add stack_id column").unwrap();
    assert_eq!(name, "add stack_id column");
}
