//! SQL dialect abstraction
//!
//! Every statement the engine issues is rendered here. The trait's default
//! methods hold the syntax the three families share; each implementation
//! overrides type mapping, quoting, and the handful of statements that differ.

use sqlparser::ast::Statement;
use sqlparser::dialect::{
    Dialect as ParserDialect, MySqlDialect as SqlParserMySql,
    PostgreSqlDialect as SqlParserPostgres, SQLiteDialect as SqlParserSqlite,
};
use sqlparser::parser::Parser;
use st_core::{ColumnDescriptor, ColumnType, Dialect, IndexDescriptor, TableDescriptor, TableName};

use crate::error::{SqlError, SqlResult};

/// Trait for SQL dialect implementations
pub trait SqlDialect: Send + Sync {
    /// Dialect tag this implementation renders for
    fn dialect(&self) -> Dialect;

    /// Get the underlying sqlparser dialect
    fn parser_dialect(&self) -> &dyn ParserDialect;

    /// Quote an identifier for this dialect
    fn quote_ident(&self, ident: &str) -> String;

    /// Whether DDL participates in transactions (so a step and its ledger
    /// entry can commit atomically)
    fn supports_transactional_ddl(&self) -> bool;

    /// Concrete column type, including auto-increment spelling where the
    /// dialect folds it into the type
    fn column_type(&self, column: &ColumnDescriptor) -> String;

    /// Text appended after the type for a single-column primary key
    fn inline_primary_key(&self, column: &ColumnDescriptor) -> String;

    /// Default used when adding a NOT NULL column that declares none, so
    /// existing rows receive a value. `None` leaves the engine's implicit
    /// default in place.
    fn implicit_default(&self, column_type: ColumnType) -> Option<&'static str>;

    /// Expression producing `prefix` followed by `key` zero-padded to at
    /// least `width` digits. Keys wider than `width` are never truncated.
    fn padded_key_expr(&self, prefix: &str, width: u32, key_expr: &str) -> String;

    /// Cast an expression to the dialect's text type
    fn cast_to_text(&self, expr: &str) -> String {
        format!("CAST({expr} AS TEXT)")
    }

    /// Dialect name
    fn name(&self) -> &'static str {
        self.dialect().as_str()
    }

    /// Parse SQL into AST statements
    fn parse(&self, sql: &str) -> SqlResult<Vec<Statement>> {
        Parser::parse_sql(self.parser_dialect(), sql).map_err(|e| SqlError::ParseError {
            dialect: self.dialect(),
            message: e.to_string(),
        })
    }

    /// Quote a string literal
    fn quote_literal(&self, value: &str) -> String {
        format!("'{}'", value.replace('\'', "''"))
    }

    /// Rewrite author-supplied raw SQL before execution
    fn normalize_raw(&self, sql: &str) -> String {
        sql.to_string()
    }

    /// Trailing table options for CREATE TABLE
    fn table_options(&self) -> &'static str {
        ""
    }

    /// Full column definition as used in CREATE TABLE and ADD COLUMN
    fn column_definition(&self, column: &ColumnDescriptor, inline_pk: bool) -> String {
        let mut def = format!(
            "{} {}",
            self.quote_ident(&column.name),
            self.column_type(column)
        );
        if inline_pk {
            def.push_str(&self.inline_primary_key(column));
        }
        if column.nullable && !column.primary_key {
            def.push_str(" NULL");
        } else {
            def.push_str(" NOT NULL");
        }
        if let Some(default) = &column.default {
            def.push_str(" DEFAULT ");
            def.push_str(default);
        }
        def
    }

    /// CREATE TABLE followed by one CREATE INDEX per declared index
    fn create_table_sql(&self, table: &TableDescriptor, if_not_exists: bool) -> Vec<String> {
        let pk = table.primary_key_columns();
        let inline_pk = pk.len() == 1;

        let mut parts: Vec<String> = table
            .columns
            .iter()
            .map(|c| self.column_definition(c, inline_pk && c.primary_key))
            .collect();
        if pk.len() > 1 {
            let cols: Vec<String> = pk.iter().map(|c| self.quote_ident(&c.name)).collect();
            parts.push(format!("PRIMARY KEY ({})", cols.join(", ")));
        }

        let mut statements = vec![format!(
            "CREATE TABLE {}{} ({}){}",
            if if_not_exists { "IF NOT EXISTS " } else { "" },
            self.quote_ident(&table.name),
            parts.join(", "),
            self.table_options()
        )];
        statements.extend(
            table
                .indices
                .iter()
                .map(|index| self.create_index_sql(&table.name, index)),
        );
        statements
    }

    /// ALTER TABLE ... ADD COLUMN
    fn add_column_sql(&self, table: &TableName, column: &ColumnDescriptor) -> String {
        let mut column = column.clone();
        if !column.nullable && column.default.is_none() {
            column.default = self
                .implicit_default(column.column_type)
                .map(str::to_string);
        }
        format!(
            "ALTER TABLE {} ADD COLUMN {}",
            self.quote_ident(table),
            self.column_definition(&column, false)
        )
    }

    /// CREATE [UNIQUE] INDEX
    fn create_index_sql(&self, table: &TableName, index: &IndexDescriptor) -> String {
        let cols: Vec<String> = index.columns.iter().map(|c| self.quote_ident(c)).collect();
        format!(
            "CREATE {}INDEX {} ON {} ({})",
            if index.unique { "UNIQUE " } else { "" },
            self.quote_ident(&index.name_for(table)),
            self.quote_ident(table),
            cols.join(", ")
        )
    }

    /// DROP INDEX
    fn drop_index_sql(&self, _table: &TableName, index_name: &str) -> String {
        format!("DROP INDEX {}", self.quote_ident(index_name))
    }

    /// DROP TABLE
    fn drop_table_sql(&self, table: &TableName) -> String {
        format!("DROP TABLE {}", self.quote_ident(table))
    }

    /// Rename a table
    fn rename_table_sql(&self, from: &TableName, to: &TableName) -> String {
        format!(
            "ALTER TABLE {} RENAME TO {}",
            self.quote_ident(from),
            self.quote_ident(to)
        )
    }

    /// Remove every row from a table
    fn delete_all_sql(&self, table: &TableName) -> String {
        format!("DELETE FROM {}", self.quote_ident(table))
    }

    /// `INSERT INTO dest (cols) SELECT exprs FROM source`
    ///
    /// `select_exprs` are already rendered and aligned with `dest_columns`.
    fn insert_select_sql(
        &self,
        dest: &TableName,
        dest_columns: &[&str],
        source: &TableName,
        select_exprs: &[String],
    ) -> String {
        let cols: Vec<String> = dest_columns.iter().map(|c| self.quote_ident(c)).collect();
        format!(
            "INSERT INTO {} ({}) SELECT {} FROM {}",
            self.quote_ident(dest),
            cols.join(", "),
            select_exprs.join(", "),
            self.quote_ident(source)
        )
    }

    /// Statement moving the generator behind an auto-increment column past
    /// the largest stored value, or `None` when explicit inserts already do.
    fn sync_identity_sql(&self, _table: &TableName, _column: &str) -> Option<String> {
        None
    }
}

/// Resolve the adapter for a dialect tag.
pub fn dialect_for(dialect: Dialect) -> Box<dyn SqlDialect> {
    match dialect {
        Dialect::Sqlite => Box::new(SqliteDialect::new()),
        Dialect::Postgres => Box::new(PostgresDialect::new()),
        Dialect::Mysql => Box::new(MysqlDialect::new()),
    }
}

/// SQLite SQL dialect
pub struct SqliteDialect {
    dialect: SqlParserSqlite,
}

impl SqliteDialect {
    /// Create a new SQLite dialect
    pub fn new() -> Self {
        Self {
            dialect: SqlParserSqlite {},
        }
    }
}

impl Default for SqliteDialect {
    fn default() -> Self {
        Self::new()
    }
}

impl SqlDialect for SqliteDialect {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn parser_dialect(&self) -> &dyn ParserDialect {
        &self.dialect
    }

    fn quote_ident(&self, ident: &str) -> String {
        format!("\"{}\"", ident.replace('"', "\"\""))
    }

    fn supports_transactional_ddl(&self) -> bool {
        true
    }

    fn column_type(&self, column: &ColumnDescriptor) -> String {
        match column.column_type {
            ColumnType::BigInt | ColumnType::Int | ColumnType::Bool => "INTEGER",
            ColumnType::Text
            | ColumnType::Varchar(_)
            | ColumnType::NVarchar(_)
            | ColumnType::Char(_) => "TEXT",
            ColumnType::DateTime => "DATETIME",
            ColumnType::Float | ColumnType::Double => "REAL",
            ColumnType::Blob => "BLOB",
        }
        .to_string()
    }

    fn inline_primary_key(&self, column: &ColumnDescriptor) -> String {
        if column.auto_increment {
            " PRIMARY KEY AUTOINCREMENT".to_string()
        } else {
            " PRIMARY KEY".to_string()
        }
    }

    fn implicit_default(&self, column_type: ColumnType) -> Option<&'static str> {
        Some(zero_value(column_type, "0"))
    }

    // printf renders NULL as zero; keep NULL keys NULL like || does elsewhere.
    fn padded_key_expr(&self, prefix: &str, width: u32, key_expr: &str) -> String {
        format!(
            "CASE WHEN {key} IS NULL THEN NULL ELSE {} || printf('%0{}d', {key}) END",
            self.quote_literal(prefix),
            width,
            key = key_expr
        )
    }
}

/// PostgreSQL dialect
pub struct PostgresDialect {
    dialect: SqlParserPostgres,
}

impl PostgresDialect {
    /// Create a new Postgres dialect
    pub fn new() -> Self {
        Self {
            dialect: SqlParserPostgres {},
        }
    }
}

impl Default for PostgresDialect {
    fn default() -> Self {
        Self::new()
    }
}

impl SqlDialect for PostgresDialect {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    fn parser_dialect(&self) -> &dyn ParserDialect {
        &self.dialect
    }

    fn quote_ident(&self, ident: &str) -> String {
        format!("\"{}\"", ident.replace('"', "\"\""))
    }

    fn supports_transactional_ddl(&self) -> bool {
        true
    }

    fn column_type(&self, column: &ColumnDescriptor) -> String {
        match column.column_type {
            ColumnType::BigInt if column.auto_increment => "BIGSERIAL".to_string(),
            ColumnType::Int if column.auto_increment => "SERIAL".to_string(),
            ColumnType::BigInt => "BIGINT".to_string(),
            ColumnType::Int => "INTEGER".to_string(),
            ColumnType::Bool => "BOOL".to_string(),
            ColumnType::Text => "TEXT".to_string(),
            ColumnType::Varchar(len) | ColumnType::NVarchar(len) => format!("VARCHAR({len})"),
            ColumnType::Char(len) => format!("CHAR({len})"),
            ColumnType::DateTime => "TIMESTAMP".to_string(),
            ColumnType::Float => "REAL".to_string(),
            ColumnType::Double => "DOUBLE PRECISION".to_string(),
            ColumnType::Blob => "BYTEA".to_string(),
        }
    }

    fn inline_primary_key(&self, _column: &ColumnDescriptor) -> String {
        " PRIMARY KEY".to_string()
    }

    fn implicit_default(&self, column_type: ColumnType) -> Option<&'static str> {
        Some(zero_value(column_type, "FALSE"))
    }

    fn padded_key_expr(&self, prefix: &str, width: u32, key_expr: &str) -> String {
        let text = self.cast_to_text(key_expr);
        format!(
            "{} || lpad({text}, GREATEST({width}, length({text})), '0')",
            self.quote_literal(prefix)
        )
    }

    /// Migration authors commonly write MySQL-style backtick quoting; Postgres
    /// only understands double quotes. Backticks inside single-quoted
    /// literals are data and are copied untouched.
    fn normalize_raw(&self, sql: &str) -> String {
        let mut out = String::with_capacity(sql.len());
        let mut in_literal = false;
        for ch in sql.chars() {
            match ch {
                '\'' => {
                    // A doubled quote toggles twice and stays inside.
                    in_literal = !in_literal;
                    out.push(ch);
                }
                '`' if !in_literal => out.push('"'),
                _ => out.push(ch),
            }
        }
        out
    }

    fn sync_identity_sql(&self, table: &TableName, column: &str) -> Option<String> {
        let col = self.quote_ident(column);
        Some(format!(
            "SELECT setval(pg_get_serial_sequence({}, {}), COALESCE(MAX({col}), 1), MAX({col}) IS NOT NULL) FROM {}",
            self.quote_literal(&self.quote_ident(table)),
            self.quote_literal(column),
            self.quote_ident(table)
        ))
    }
}

/// MySQL / MariaDB dialect
pub struct MysqlDialect {
    dialect: SqlParserMySql,
}

impl MysqlDialect {
    /// Create a new MySQL dialect
    pub fn new() -> Self {
        Self {
            dialect: SqlParserMySql {},
        }
    }
}

impl Default for MysqlDialect {
    fn default() -> Self {
        Self::new()
    }
}

impl SqlDialect for MysqlDialect {
    fn dialect(&self) -> Dialect {
        Dialect::Mysql
    }

    fn parser_dialect(&self) -> &dyn ParserDialect {
        &self.dialect
    }

    fn quote_ident(&self, ident: &str) -> String {
        format!("`{}`", ident.replace('`', "``"))
    }

    fn quote_literal(&self, value: &str) -> String {
        format!("'{}'", value.replace('\\', "\\\\").replace('\'', "''"))
    }

    fn supports_transactional_ddl(&self) -> bool {
        false
    }

    fn column_type(&self, column: &ColumnDescriptor) -> String {
        match column.column_type {
            ColumnType::BigInt => "BIGINT(20)".to_string(),
            ColumnType::Int => "INT(11)".to_string(),
            ColumnType::Bool => "TINYINT(1)".to_string(),
            ColumnType::Text => "TEXT".to_string(),
            ColumnType::Varchar(len) => format!("VARCHAR({len})"),
            ColumnType::NVarchar(len) => format!("NVARCHAR({len})"),
            ColumnType::Char(len) => format!("CHAR({len})"),
            ColumnType::DateTime => "DATETIME".to_string(),
            ColumnType::Float => "FLOAT".to_string(),
            ColumnType::Double => "DOUBLE".to_string(),
            ColumnType::Blob => "BLOB".to_string(),
        }
    }

    fn inline_primary_key(&self, column: &ColumnDescriptor) -> String {
        if column.auto_increment {
            " PRIMARY KEY AUTO_INCREMENT".to_string()
        } else {
            " PRIMARY KEY".to_string()
        }
    }

    // MySQL fills existing rows with the type's implicit default, and TEXT
    // columns reject literal defaults on older servers.
    fn implicit_default(&self, _column_type: ColumnType) -> Option<&'static str> {
        None
    }

    fn padded_key_expr(&self, prefix: &str, width: u32, key_expr: &str) -> String {
        format!(
            "CONCAT({}, LPAD({key_expr}, GREATEST({width}, CHAR_LENGTH({key_expr})), '0'))",
            self.quote_literal(prefix)
        )
    }

    fn cast_to_text(&self, expr: &str) -> String {
        format!("CAST({expr} AS CHAR)")
    }

    fn table_options(&self) -> &'static str {
        " ENGINE=InnoDB DEFAULT CHARSET=utf8mb4"
    }

    fn drop_index_sql(&self, table: &TableName, index_name: &str) -> String {
        format!(
            "DROP INDEX {} ON {}",
            self.quote_ident(index_name),
            self.quote_ident(table)
        )
    }
}

/// Zero value of a type as a SQL literal; `bool_zero` differs per dialect.
fn zero_value(column_type: ColumnType, bool_zero: &'static str) -> &'static str {
    match column_type {
        ColumnType::BigInt | ColumnType::Int | ColumnType::Float | ColumnType::Double => "0",
        ColumnType::Bool => bool_zero,
        ColumnType::Text
        | ColumnType::Varchar(_)
        | ColumnType::NVarchar(_)
        | ColumnType::Char(_)
        | ColumnType::Blob => "''",
        ColumnType::DateTime => "'1970-01-01 00:00:00'",
    }
}

#[cfg(test)]
#[path = "dialect_test.rs"]
mod tests;
