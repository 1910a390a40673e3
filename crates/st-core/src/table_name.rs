//! Strongly-typed table name.

use crate::newtype_string::define_name;

define_name! {
    /// Name of a table as it appears in the database.
    ///
    /// Kept distinct from column and migration names so a temporary table
    /// name can never be passed where a ledger key is expected.
    pub struct TableName;
}

impl TableName {
    /// Deterministic name of the staging table used while replacing this
    /// table at `version`.
    pub fn temp_for_version(&self, version: u32) -> TableName {
        TableName(format!("{}_tmp_v{}", self.0, version))
    }
}
