//! Storage abstraction for parsed match tables.
//!
//! The [`Sink`] trait is the only thing the ingest pipeline knows about
//! storage. A sink accepts whole tables by name: on the first write to a
//! table it creates it, inferring the schema from the batch's columns, and
//! on later writes it appends.
//!
//! | Method | Purpose |
//! |--------|---------|
//! | [`write_table`](Sink::write_table) | Create-if-absent, then append rows |
//! | [`write_tables`](Sink::write_tables) | Same, for several tables, all or nothing |
//! | [`table_exists`](Sink::table_exists) | Whether a table has been created |
//! | [`existing_match_ids`](Sink::existing_match_ids) | Match ids already stored |
//! | [`drop_table`](Sink::drop_table) | Remove a table and its rows |
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use std::collections::HashSet;

use anyhow::{bail, Result};
use async_trait::async_trait;

use crate::models::Table;

pub use memory::MemorySink;

/// Abstract storage backend for match tables.
#[async_trait]
pub trait Sink: Send + Sync {
    /// Append `table`'s rows to `name`, creating it from `table`'s columns
    /// if it does not exist yet. A table with no columns is a no-op.
    async fn write_table(&self, name: &str, table: &Table) -> Result<()> {
        self.write_tables(&[(name, table)]).await
    }

    /// Append to several tables atomically: either every table in `batch`
    /// receives its rows or none does. Tables are written in batch order.
    async fn write_tables(&self, batch: &[(&str, &Table)]) -> Result<()>;

    /// Whether `name` has been created.
    async fn table_exists(&self, name: &str) -> Result<bool>;

    /// Match ids whose `match_info` row is already stored.
    ///
    /// Sinks that cannot answer must return an error rather than an empty
    /// set, so callers never re-ingest blindly.
    async fn existing_match_ids(&self) -> Result<HashSet<String>> {
        bail!("this sink cannot list existing match ids")
    }

    /// Drop `name` if it exists.
    async fn drop_table(&self, name: &str) -> Result<()>;
}

/// Reject table names that cannot be used as a bare SQL identifier.
pub fn validate_table_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !name.starts_with(|c: char| c.is_ascii_digit());
    if !valid {
        bail!("invalid table name: '{}'", name);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_table_name() {
        assert!(validate_table_name("ball_by_ball").is_ok());
        assert!(validate_table_name("").is_err());
        assert!(validate_table_name("1table").is_err());
        assert!(validate_table_name("drop table; --").is_err());
    }
}
