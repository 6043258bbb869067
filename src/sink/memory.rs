//! In-memory [`Sink`] implementation for testing and dry runs.
//!
//! Uses a `HashMap` of tables behind `std::sync::RwLock`.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;

use crate::models::{Table, MATCH_INFO_TABLE};

use super::{validate_table_name, Sink};

/// In-memory sink.
pub struct MemorySink {
    tables: RwLock<HashMap<String, Table>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
        }
    }

    /// Snapshot of a stored table.
    pub fn table(&self, name: &str) -> Result<Option<Table>> {
        let tables = self
            .tables
            .read()
            .map_err(|_| anyhow!("memory sink lock poisoned"))?;
        Ok(tables.get(name).cloned())
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Sink for MemorySink {
    async fn write_tables(&self, batch: &[(&str, &Table)]) -> Result<()> {
        let mut tables = self
            .tables
            .write()
            .map_err(|_| anyhow!("memory sink lock poisoned"))?;

        // Check the whole batch before touching anything.
        let mut schemas: HashMap<&str, &[String]> = tables
            .iter()
            .map(|(name, t)| (name.as_str(), t.columns()))
            .collect();
        for (name, table) in batch {
            validate_table_name(name)?;
            if table.columns().is_empty() {
                continue;
            }
            let expected = *schemas.entry(*name).or_insert(table.columns());
            if expected != table.columns() {
                bail!(
                    "column mismatch writing to '{}': expected {:?}, got {:?}",
                    name,
                    expected,
                    table.columns()
                );
            }
        }
        drop(schemas);

        for (name, table) in batch {
            if table.columns().is_empty() {
                continue;
            }
            let stored = tables
                .entry(name.to_string())
                .or_insert_with(|| Table::new(table.columns().to_vec()));
            for row in table.rows() {
                stored.push_row(row.clone());
            }
        }
        Ok(())
    }

    async fn table_exists(&self, name: &str) -> Result<bool> {
        let tables = self
            .tables
            .read()
            .map_err(|_| anyhow!("memory sink lock poisoned"))?;
        Ok(tables.contains_key(name))
    }

    async fn existing_match_ids(&self) -> Result<HashSet<String>> {
        let tables = self
            .tables
            .read()
            .map_err(|_| anyhow!("memory sink lock poisoned"))?;
        let Some(info) = tables.get(MATCH_INFO_TABLE) else {
            return Ok(HashSet::new());
        };
        let ids = info
            .column("match_id")
            .ok_or_else(|| anyhow!("'{}' has no match_id column", MATCH_INFO_TABLE))?;
        Ok(ids
            .into_iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect())
    }

    async fn drop_table(&self, name: &str) -> Result<()> {
        let mut tables = self
            .tables
            .write()
            .map_err(|_| anyhow!("memory sink lock poisoned"))?;
        tables.remove(name);
        Ok(())
    }
}
