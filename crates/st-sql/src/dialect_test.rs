use super::*;

fn migration_table() -> TableDescriptor {
    TableDescriptor::new("cloud_migration")
        .column(ColumnDescriptor::new("id", ColumnType::BigInt).auto_increment())
        .column(ColumnDescriptor::new("uid", ColumnType::NVarchar(40)).nullable())
        .column(ColumnDescriptor::new("stack", ColumnType::Text))
        .column(ColumnDescriptor::new("created", ColumnType::DateTime))
        .index(IndexDescriptor::unique(["uid"]))
}

#[test]
fn test_sqlite_create_table() {
    let sql = SqliteDialect::new().create_table_sql(&migration_table(), false);
    assert_eq!(
        sql,
        vec![
            "CREATE TABLE \"cloud_migration\" (\"id\" INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL, \
             \"uid\" TEXT NULL, \"stack\" TEXT NOT NULL, \"created\" DATETIME NOT NULL)"
                .to_string(),
            "CREATE UNIQUE INDEX \"UQE_cloud_migration_uid\" ON \"cloud_migration\" (\"uid\")"
                .to_string(),
        ]
    );
}

#[test]
fn test_postgres_create_table() {
    let sql = PostgresDialect::new().create_table_sql(&migration_table(), true);
    assert_eq!(
        sql[0],
        "CREATE TABLE IF NOT EXISTS \"cloud_migration\" (\"id\" BIGSERIAL PRIMARY KEY NOT NULL, \
         \"uid\" VARCHAR(40) NULL, \"stack\" TEXT NOT NULL, \"created\" TIMESTAMP NOT NULL)"
    );
}

#[test]
fn test_mysql_create_table() {
    let sql = MysqlDialect::new().create_table_sql(&migration_table(), false);
    assert_eq!(
        sql[0],
        "CREATE TABLE `cloud_migration` (`id` BIGINT(20) PRIMARY KEY AUTO_INCREMENT NOT NULL, \
         `uid` NVARCHAR(40) NULL, `stack` TEXT NOT NULL, `created` DATETIME NOT NULL) \
         ENGINE=InnoDB DEFAULT CHARSET=utf8mb4"
    );
    assert_eq!(
        sql[1],
        "CREATE UNIQUE INDEX `UQE_cloud_migration_uid` ON `cloud_migration` (`uid`)"
    );
}

#[test]
fn test_composite_primary_key() {
    let table = TableDescriptor::new("membership")
        .column(ColumnDescriptor::new("org_id", ColumnType::BigInt).primary_key())
        .column(ColumnDescriptor::new("user_id", ColumnType::BigInt).primary_key());
    let sql = PostgresDialect::new().create_table_sql(&table, false);
    assert_eq!(
        sql[0],
        "CREATE TABLE \"membership\" (\"org_id\" BIGINT NOT NULL, \"user_id\" BIGINT NOT NULL, \
         PRIMARY KEY (\"org_id\", \"user_id\"))"
    );
}

#[test]
fn test_rendered_ddl_parses() {
    let table = migration_table();
    for dialect in Dialect::ALL {
        let adapter = dialect_for(dialect);
        for statement in adapter.create_table_sql(&table, false) {
            adapter
                .parse(&statement)
                .unwrap_or_else(|e| panic!("{dialect}: {statement}: {e}"));
        }
    }
}

#[test]
fn test_add_column_fills_not_null_default() {
    let table = TableName::new("cloud_migration");
    let stack_id = ColumnDescriptor::new("stack_id", ColumnType::BigInt);
    assert_eq!(
        SqliteDialect::new().add_column_sql(&table, &stack_id),
        "ALTER TABLE \"cloud_migration\" ADD COLUMN \"stack_id\" INTEGER NOT NULL DEFAULT 0"
    );
    assert_eq!(
        PostgresDialect::new().add_column_sql(&table, &stack_id),
        "ALTER TABLE \"cloud_migration\" ADD COLUMN \"stack_id\" BIGINT NOT NULL DEFAULT 0"
    );
    assert_eq!(
        MysqlDialect::new().add_column_sql(&table, &stack_id),
        "ALTER TABLE `cloud_migration` ADD COLUMN `stack_id` BIGINT(20) NOT NULL"
    );
}

#[test]
fn test_add_column_keeps_explicit_default() {
    let table = TableName::new("cloud_migration");
    let column = ColumnDescriptor::new("region_slug", ColumnType::Text).default_value("'us'");
    assert_eq!(
        SqliteDialect::new().add_column_sql(&table, &column),
        "ALTER TABLE \"cloud_migration\" ADD COLUMN \"region_slug\" TEXT NOT NULL DEFAULT 'us'"
    );
    let nullable = ColumnDescriptor::new("uid", ColumnType::NVarchar(40)).nullable();
    assert_eq!(
        PostgresDialect::new().add_column_sql(&table, &nullable),
        "ALTER TABLE \"cloud_migration\" ADD COLUMN \"uid\" VARCHAR(40) NULL"
    );
}

#[test]
fn test_drop_index() {
    let table = TableName::new("cloud_migration");
    assert_eq!(
        SqliteDialect::new().drop_index_sql(&table, "UQE_cloud_migration_uid"),
        "DROP INDEX \"UQE_cloud_migration_uid\""
    );
    assert_eq!(
        MysqlDialect::new().drop_index_sql(&table, "UQE_cloud_migration_uid"),
        "DROP INDEX `UQE_cloud_migration_uid` ON `cloud_migration`"
    );
}

#[test]
fn test_rename_and_drop_table() {
    let from = TableName::new("cloud_migration_session_tmp_v2");
    let to = TableName::new("cloud_migration_session");
    assert_eq!(
        PostgresDialect::new().rename_table_sql(&from, &to),
        "ALTER TABLE \"cloud_migration_session_tmp_v2\" RENAME TO \"cloud_migration_session\""
    );
    assert_eq!(
        MysqlDialect::new().drop_table_sql(&to),
        "DROP TABLE `cloud_migration_session`"
    );
}

#[test]
fn test_padded_key_expressions() {
    assert_eq!(
        SqliteDialect::new().padded_key_expr("u", 9, "\"id\""),
        "CASE WHEN \"id\" IS NULL THEN NULL ELSE 'u' || printf('%09d', \"id\") END"
    );
    assert_eq!(
        PostgresDialect::new().padded_key_expr("u", 9, "\"id\""),
        "'u' || lpad(CAST(\"id\" AS TEXT), GREATEST(9, length(CAST(\"id\" AS TEXT))), '0')"
    );
    assert_eq!(
        MysqlDialect::new().padded_key_expr("u", 9, "`id`"),
        "CONCAT('u', LPAD(`id`, GREATEST(9, CHAR_LENGTH(`id`)), '0'))"
    );
}

#[test]
fn test_insert_select_parses() {
    let dest = TableName::new("cloud_migration_session_tmp_v2");
    let source = TableName::new("cloud_migration");
    for dialect in Dialect::ALL {
        let adapter = dialect_for(dialect);
        let exprs = vec![
            adapter.quote_ident("id"),
            adapter.padded_key_expr("u", 9, &adapter.quote_ident("id")),
            adapter.quote_ident("stack"),
        ];
        let sql = adapter.insert_select_sql(&dest, &["id", "uid", "slug"], &source, &exprs);
        adapter
            .parse(&sql)
            .unwrap_or_else(|e| panic!("{dialect}: {sql}: {e}"));
    }
}

#[test]
fn test_quote_ident_escapes() {
    assert_eq!(SqliteDialect::new().quote_ident("user\"name"), "\"user\"\"name\"");
    assert_eq!(MysqlDialect::new().quote_ident("user`name"), "`user``name`");
}

#[test]
fn test_quote_literal() {
    assert_eq!(PostgresDialect::new().quote_literal("it's"), "'it''s'");
    assert_eq!(MysqlDialect::new().quote_literal("a\\b'c"), "'a\\\\b''c'");
}

#[test]
fn test_postgres_normalizes_backticks() {
    let sql = "UPDATE `cloud_migration` SET uid='u' || lpad('' || id::text,9,'0') WHERE uid IS NULL;";
    let normalized = PostgresDialect::new().normalize_raw(sql);
    assert!(normalized.starts_with("UPDATE \"cloud_migration\" SET"));
    assert_eq!(SqliteDialect::new().normalize_raw(sql), sql);
}

#[test]
fn test_postgres_normalize_keeps_backticks_in_literals() {
    let sql = "UPDATE `notes` SET body = 'see `x` and it''s `y`' WHERE `id` = 1";
    assert_eq!(
        PostgresDialect::new().normalize_raw(sql),
        "UPDATE \"notes\" SET body = 'see `x` and it''s `y`' WHERE \"id\" = 1"
    );
}

#[test]
fn test_sync_identity_only_on_postgres() {
    let table = TableName::new("cloud_migration_session_tmp_v2");
    let pg = PostgresDialect::new();
    let sql = pg.sync_identity_sql(&table, "id").unwrap();
    assert_eq!(
        sql,
        "SELECT setval(pg_get_serial_sequence('\"cloud_migration_session_tmp_v2\"', 'id'), \
         COALESCE(MAX(\"id\"), 1), MAX(\"id\") IS NOT NULL) FROM \"cloud_migration_session_tmp_v2\""
    );
    pg.parse(&sql).unwrap();
    assert!(SqliteDialect::new().sync_identity_sql(&table, "id").is_none());
    assert!(MysqlDialect::new().sync_identity_sql(&table, "id").is_none());
}

#[test]
fn test_transactional_ddl_support() {
    assert!(SqliteDialect::new().supports_transactional_ddl());
    assert!(PostgresDialect::new().supports_transactional_ddl());
    assert!(!MysqlDialect::new().supports_transactional_ddl());
}

#[test]
fn test_dialect_for_round_trip() {
    for dialect in Dialect::ALL {
        assert_eq!(dialect_for(dialect).dialect(), dialect);
        assert_eq!(dialect_for(dialect).name(), dialect.as_str());
    }
}

#[test]
fn test_parse_error() {
    let err = SqliteDialect::new().parse("CREATE TABLE (").unwrap_err();
    assert!(matches!(err, SqlError::ParseError { dialect: Dialect::Sqlite, .. }));
}
