//! Dialect-neutral table, column, and index descriptors.
//!
//! Descriptors are pure data: the dialect adapter turns them into DDL and
//! the migration engine validates them before anything runs.

use crate::error::{CoreError, CoreResult};
use crate::table_name::TableName;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Logical column type, mapped to concrete syntax by each dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnType {
    #[serde(rename = "bigint")]
    BigInt,
    #[serde(rename = "int")]
    Int,
    #[serde(rename = "bool")]
    Bool,
    #[serde(rename = "text")]
    Text,
    /// Variable-length string with a length bound
    #[serde(rename = "varchar")]
    Varchar(u32),
    /// Variable-length national-character string with a length bound
    #[serde(rename = "nvarchar")]
    NVarchar(u32),
    /// Fixed-length string
    #[serde(rename = "char")]
    Char(u32),
    #[serde(rename = "datetime")]
    DateTime,
    #[serde(rename = "float")]
    Float,
    #[serde(rename = "double")]
    Double,
    #[serde(rename = "blob")]
    Blob,
}

impl ColumnType {
    /// Returns true for integer types that may carry auto-increment.
    pub fn is_integer(&self) -> bool {
        matches!(self, ColumnType::BigInt | ColumnType::Int)
    }

    /// Length bound for string types, if any.
    pub fn length(&self) -> Option<u32> {
        match self {
            ColumnType::Varchar(len) | ColumnType::NVarchar(len) | ColumnType::Char(len) => {
                Some(*len)
            }
            _ => None,
        }
    }
}

/// A single column of a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    /// Column name
    pub name: String,

    /// Logical type
    #[serde(rename = "type")]
    pub column_type: ColumnType,

    /// Whether NULL is allowed
    #[serde(default)]
    pub nullable: bool,

    /// Part of the primary key
    #[serde(default)]
    pub primary_key: bool,

    /// Values assigned by the engine on insert
    #[serde(default)]
    pub auto_increment: bool,

    /// Default value as a SQL literal (e.g. `'pending'` or `0`)
    #[serde(default)]
    pub default: Option<String>,
}

impl ColumnDescriptor {
    /// Create a NOT NULL column with no default.
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            nullable: false,
            primary_key: false,
            auto_increment: false,
            default: None,
        }
    }

    /// Allow NULL values.
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Mark as (part of) the primary key.
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Mark as an auto-increment primary key.
    pub fn auto_increment(mut self) -> Self {
        self.primary_key = true;
        self.auto_increment = true;
        self
    }

    /// Set the default value, given as a SQL literal.
    pub fn default_value(mut self, literal: impl Into<String>) -> Self {
        self.default = Some(literal.into());
        self
    }

    /// Returns true if inserting a row without this column succeeds:
    /// the column is nullable, has a default, or is generated by the engine.
    pub fn has_implicit_value(&self) -> bool {
        self.nullable || self.default.is_some() || self.auto_increment
    }
}

/// An index over one or more columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDescriptor {
    /// Indexed columns, in order
    pub columns: Vec<String>,

    /// Unique constraint
    #[serde(default)]
    pub unique: bool,

    /// Explicit index name; derived from the table and columns when absent
    #[serde(default)]
    pub name: Option<String>,
}

impl IndexDescriptor {
    /// Non-unique index over `columns`.
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            unique: false,
            name: None,
        }
    }

    /// Unique index over `columns`.
    pub fn unique<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            unique: true,
            ..Self::new(columns)
        }
    }

    /// Override the derived index name.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Index name as created on `table`.
    ///
    /// Derived names are `UQE_<table>_<cols>` for unique indices and
    /// `IDX_<table>_<cols>` otherwise.
    pub fn name_for(&self, table: &TableName) -> String {
        if let Some(name) = &self.name {
            return name.clone();
        }
        let prefix = if self.unique { "UQE" } else { "IDX" };
        format!("{}_{}_{}", prefix, table, self.columns.join("_"))
    }
}

/// Complete description of a table's shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDescriptor {
    /// Table name
    pub name: TableName,

    /// Columns in declaration order
    pub columns: Vec<ColumnDescriptor>,

    /// Indices created together with the table
    #[serde(default, alias = "indexes")]
    pub indices: Vec<IndexDescriptor>,
}

impl TableDescriptor {
    /// Create an empty descriptor for `name`.
    ///
    /// # Panics
    ///
    /// Panics if `name` is empty or padded with whitespace; use
    /// [`TableDescriptor::try_new`] for untrusted names.
    pub fn new(name: impl Into<String>) -> Self {
        Self::try_new(name)
            .unwrap_or_else(|| panic!("TableName must be non-empty without surrounding whitespace"))
    }

    /// Create an empty descriptor, or `None` if `name` is not a valid table name.
    pub fn try_new(name: impl Into<String>) -> Option<Self> {
        Some(Self {
            name: TableName::try_new(name)?,
            columns: Vec::new(),
            indices: Vec::new(),
        })
    }

    /// Append a column.
    pub fn column(mut self, column: ColumnDescriptor) -> Self {
        self.columns.push(column);
        self
    }

    /// Append an index.
    pub fn index(mut self, index: IndexDescriptor) -> Self {
        self.indices.push(index);
        self
    }

    /// Look up a column by name.
    pub fn get_column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Columns that form the primary key, in declaration order.
    pub fn primary_key_columns(&self) -> Vec<&ColumnDescriptor> {
        self.columns.iter().filter(|c| c.primary_key).collect()
    }

    /// Same columns and indices under another name.
    pub fn renamed(&self, name: TableName) -> TableDescriptor {
        TableDescriptor {
            name,
            ..self.clone()
        }
    }

    /// Same table without its indices.
    pub fn without_indices(&self) -> TableDescriptor {
        TableDescriptor {
            indices: Vec::new(),
            ..self.clone()
        }
    }

    fn invalid(&self, message: impl Into<String>) -> CoreError {
        CoreError::InvalidDescriptor {
            table: self.name.to_string(),
            message: message.into(),
        }
    }

    /// Check structural invariants that every dialect relies on.
    pub fn validate(&self) -> CoreResult<()> {
        if self.columns.is_empty() {
            return Err(self.invalid("table has no columns"));
        }

        let mut seen = HashSet::new();
        for column in &self.columns {
            validate_column(&self.name, column)?;
            if !seen.insert(column.name.as_str()) {
                return Err(self.invalid(format!("duplicate column '{}'", column.name)));
            }
        }

        let auto_increment = self.columns.iter().filter(|c| c.auto_increment).count();
        if auto_increment > 1 {
            return Err(self.invalid("at most one auto-increment column is allowed"));
        }
        if auto_increment == 1 && self.primary_key_columns().len() > 1 {
            return Err(self.invalid("auto-increment cannot be part of a composite primary key"));
        }

        let mut index_names = HashSet::new();
        for index in &self.indices {
            validate_index(&self.name, index, |col| self.get_column(col).is_some())?;
            if !index_names.insert(index.name_for(&self.name)) {
                return Err(self.invalid(format!(
                    "duplicate index '{}'",
                    index.name_for(&self.name)
                )));
            }
        }
        Ok(())
    }
}

/// Validate a single column in the context of `table`.
pub fn validate_column(table: &TableName, column: &ColumnDescriptor) -> CoreResult<()> {
    let invalid = |message: String| CoreError::InvalidDescriptor {
        table: table.to_string(),
        message,
    };
    if column.name.trim().is_empty() {
        return Err(invalid("column name is empty".to_string()));
    }
    if column.column_type.length() == Some(0) {
        return Err(invalid(format!(
            "column '{}' needs a length greater than zero",
            column.name
        )));
    }
    if column.auto_increment && !column.column_type.is_integer() {
        return Err(invalid(format!(
            "auto-increment column '{}' must be an integer type",
            column.name
        )));
    }
    if column.auto_increment && !column.primary_key {
        return Err(invalid(format!(
            "auto-increment column '{}' must be the primary key",
            column.name
        )));
    }
    if column.primary_key && column.nullable {
        return Err(invalid(format!(
            "primary key column '{}' cannot be nullable",
            column.name
        )));
    }
    Ok(())
}

/// Validate an index against the columns known to exist on `table`.
pub fn validate_index(
    table: &TableName,
    index: &IndexDescriptor,
    has_column: impl Fn(&str) -> bool,
) -> CoreResult<()> {
    let invalid = |message: String| CoreError::InvalidDescriptor {
        table: table.to_string(),
        message,
    };
    if index.columns.is_empty() {
        return Err(invalid("index has no columns".to_string()));
    }
    if let Some(missing) = index.columns.iter().find(|c| !has_column(c)) {
        return Err(invalid(format!(
            "index references unknown column '{}'",
            missing
        )));
    }
    Ok(())
}

#[cfg(test)]
#[path = "schema_test.rs"]
mod tests;
