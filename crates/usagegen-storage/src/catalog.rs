//! Catalog - the named tables of an in-memory store
//!
//! A catalog is shared (`Arc<Catalog>`) between the sink that writes into it
//! and whoever inspects the results, so tables outlive the sink's teardown.

use crate::error::{Result, StorageError};
use crate::schema::TableSchema;
use crate::table::{MetricsTable, TableStats};
use parking_lot::RwLock;
use std::collections::HashMap;

/// Set of tables keyed by name
#[derive(Debug, Default)]
pub struct Catalog {
    tables: RwLock<HashMap<String, MetricsTable>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a table; fails if one with the same name exists
    pub fn create_table(&self, schema: TableSchema) -> Result<()> {
        schema.validate()?;

        let mut tables = self.tables.write();
        if tables.contains_key(&schema.name) {
            return Err(StorageError::TableExists(schema.name));
        }
        tables.insert(schema.name.clone(), MetricsTable::new(schema));
        Ok(())
    }

    /// Drop a table if it exists. Returns whether a table was dropped.
    pub fn drop_table(&self, name: &str) -> bool {
        self.tables.write().remove(name).is_some()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tables.read().contains_key(name)
    }

    /// Sorted table names
    pub fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn schema(&self, name: &str) -> Option<TableSchema> {
        self.tables.read().get(name).map(|t| t.schema().clone())
    }

    pub fn stats(&self, name: &str) -> Option<TableStats> {
        self.tables.read().get(name).map(|t| t.stats())
    }

    /// Run `f` against a table under the read lock
    pub fn read<R>(&self, name: &str, f: impl FnOnce(&MetricsTable) -> R) -> Result<R> {
        let tables = self.tables.read();
        let table = tables
            .get(name)
            .ok_or_else(|| StorageError::TableNotFound(name.to_string()))?;
        Ok(f(table))
    }

    /// Run `f` against a table under the write lock
    pub fn write<R>(&self, name: &str, f: impl FnOnce(&mut MetricsTable) -> R) -> Result<R> {
        let mut tables = self.tables.write();
        let table = tables
            .get_mut(name)
            .ok_or_else(|| StorageError::TableNotFound(name.to_string()))?;
        Ok(f(table))
    }
}
