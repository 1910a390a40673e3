use super::*;

#[test]
fn test_from_url() {
    assert_eq!(
        Dialect::from_url("sqlite://data/app.db?mode=rwc").unwrap(),
        Dialect::Sqlite
    );
    assert_eq!(Dialect::from_url("sqlite::memory:").unwrap(), Dialect::Sqlite);
    assert_eq!(
        Dialect::from_url("postgresql://user@localhost/app").unwrap(),
        Dialect::Postgres
    );
    assert_eq!(
        Dialect::from_url("postgres://localhost").unwrap(),
        Dialect::Postgres
    );
    assert_eq!(
        Dialect::from_url("mariadb://root@db/app").unwrap(),
        Dialect::Mysql
    );
}

#[test]
fn test_from_url_unknown_scheme() {
    let err = Dialect::from_url("mssql://localhost").unwrap_err();
    assert!(err.to_string().contains("[C005]"));
    assert!(Dialect::from_url("no-scheme").is_err());
}

#[test]
fn test_from_str_and_display() {
    for dialect in Dialect::ALL {
        let parsed: Dialect = dialect.to_string().parse().unwrap();
        assert_eq!(parsed, dialect);
    }
    assert_eq!("PG".parse::<Dialect>().unwrap(), Dialect::Postgres);
}

#[test]
fn test_serde_lowercase() {
    let dialect: Dialect = serde_yaml::from_str("mysql").unwrap();
    assert_eq!(dialect, Dialect::Mysql);
    assert_eq!(serde_yaml::to_string(&Dialect::Sqlite).unwrap().trim(), "sqlite");
}
