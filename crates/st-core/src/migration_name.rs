//! Strongly-typed migration name.

use crate::newtype_string::define_name;

define_name! {
    /// Stable identity of a migration step and the key stored in the ledger.
    ///
    /// Renaming a step after it has shipped makes the runner treat it as new,
    /// so names are never rewritten once released.
    pub struct MigrationName;
}

#[cfg(test)]
#[path = "migration_name_test.rs"]
mod tests;
