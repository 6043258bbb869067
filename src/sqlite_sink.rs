//! SQLite-backed [`Sink`] implementation.
//!
//! Tables are created on first write with column types inferred from the
//! first row of the batch:
//!
//! | JSON value | SQLite type |
//! |------------|-------------|
//! | integer / boolean | `INTEGER` |
//! | float | `REAL` |
//! | anything else (string, list, null) | `TEXT` |
//!
//! Lists (dates, lineups, fielders) are stored as JSON text. A
//! [`write_tables`](Sink::write_tables) batch runs in one transaction, so
//! a match's deliveries, players and info row land together or not at all.

use std::collections::HashSet;
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::query::Query;
use sqlx::sqlite::{
    Sqlite, SqliteArguments, SqliteConnectOptions, SqliteConnection, SqliteJournalMode,
    SqlitePoolOptions,
};
use sqlx::{Row, SqlitePool};

use crate::config::DbConfig;
use crate::migrate;
use crate::models::{Table, MATCH_INFO_TABLE};
use crate::sink::{validate_table_name, Sink};

/// Open the database pool, creating the file and its directory if needed.
///
/// One connection: match batches are appended strictly one after another.
pub async fn connect(db: &DbConfig) -> Result<SqlitePool> {
    if let Some(parent) = db.path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create database directory: {}", parent.display()))?;
    }

    let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db.path.display()))?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .with_context(|| format!("Failed to open database: {}", db.path.display()))?;
    Ok(pool)
}

/// SQLite implementation of the [`Sink`] trait.
pub struct SqliteSink {
    pool: SqlitePool,
}

impl SqliteSink {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to the configured database and make sure the match tables exist.
    pub async fn open(db: &DbConfig) -> Result<Self> {
        let pool = connect(db).await?;
        migrate::create_schema(&pool).await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(self) {
        self.pool.close().await;
    }

    /// Column names of an existing table, in declaration order.
    pub async fn table_columns(&self, name: &str) -> Result<Vec<String>> {
        let mut conn = self.pool.acquire().await?;
        table_columns(&mut *conn, name).await
    }

    /// Number of rows in `name`, or `None` if the table does not exist.
    pub async fn row_count(&self, name: &str) -> Result<Option<i64>> {
        if !self.table_exists(name).await? {
            return Ok(None);
        }
        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", quote_ident(name)))
            .fetch_one(&self.pool)
            .await?;
        Ok(Some(count))
    }
}

async fn table_exists(conn: &mut SqliteConnection, name: &str) -> Result<bool> {
    let exists: bool = sqlx::query_scalar(
        "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name = ?",
    )
    .bind(name)
    .fetch_one(&mut *conn)
    .await?;
    Ok(exists)
}

async fn table_columns(conn: &mut SqliteConnection, name: &str) -> Result<Vec<String>> {
    validate_table_name(name)?;
    let rows = sqlx::query(&format!("PRAGMA table_info({})", quote_ident(name)))
        .fetch_all(&mut *conn)
        .await?;
    Ok(rows.iter().map(|row| row.get::<String, _>("name")).collect())
}

async fn create_table(
    conn: &mut SqliteConnection,
    name: &str,
    columns: &[(String, &str)],
) -> Result<()> {
    let column_defs: Vec<String> = columns
        .iter()
        .map(|(col, ty)| format!("{} {}", quote_ident(col), ty))
        .collect();
    let sql = format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        quote_ident(name),
        column_defs.join(", ")
    );
    sqlx::query(&sql).execute(&mut *conn).await?;
    Ok(())
}

/// Create-if-absent then append, on whatever connection or transaction
/// the caller holds.
async fn append(conn: &mut SqliteConnection, name: &str, table: &Table) -> Result<()> {
    validate_table_name(name)?;
    if table.columns().is_empty() {
        return Ok(());
    }

    if table_exists(conn, name).await? {
        let existing: HashSet<String> = table_columns(conn, name).await?.into_iter().collect();
        if let Some(missing) = table.columns().iter().find(|c| !existing.contains(*c)) {
            bail!("table '{}' has no column '{}'", name, missing);
        }
    } else {
        create_table(conn, name, &infer_columns(table)).await?;
    }

    let column_list: Vec<String> = table.columns().iter().map(|c| quote_ident(c)).collect();
    let placeholders = vec!["?"; table.columns().len()].join(", ");
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(name),
        column_list.join(", "),
        placeholders
    );

    for row in table.rows() {
        let mut query = sqlx::query(&sql);
        for value in row {
            query = bind_value(query, value);
        }
        query.execute(&mut *conn).await?;
    }
    Ok(())
}

/// SQLite column type for a JSON value.
pub fn sql_type(value: &Value) -> &'static str {
    match value {
        Value::Bool(_) => "INTEGER",
        Value::Number(n) if n.is_i64() || n.is_u64() => "INTEGER",
        Value::Number(_) => "REAL",
        _ => "TEXT",
    }
}

/// Column definitions inferred from a table's first row.
pub fn infer_columns(table: &Table) -> Vec<(String, &'static str)> {
    let first = table.rows().first();
    table
        .columns()
        .iter()
        .enumerate()
        .map(|(i, col)| {
            let ty = first.and_then(|row| row.get(i)).map(sql_type).unwrap_or("TEXT");
            (col.clone(), ty)
        })
        .collect()
}

fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

fn bind_value<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    value: &'q Value,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(b) => query.bind(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => query.bind(i),
            None => query.bind(n.as_f64()),
        },
        Value::String(s) => query.bind(s.as_str()),
        Value::Array(_) | Value::Object(_) => query.bind(value.to_string()),
    }
}

#[async_trait]
impl Sink for SqliteSink {
    async fn write_tables(&self, batch: &[(&str, &Table)]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for (name, table) in batch {
            append(&mut *tx, name, table).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn table_exists(&self, name: &str) -> Result<bool> {
        let mut conn = self.pool.acquire().await?;
        table_exists(&mut *conn, name).await
    }

    async fn existing_match_ids(&self) -> Result<HashSet<String>> {
        if !self.table_exists(MATCH_INFO_TABLE).await? {
            return Ok(HashSet::new());
        }
        let ids: Vec<String> = sqlx::query_scalar(&format!(
            "SELECT DISTINCT match_id FROM {}",
            quote_ident(MATCH_INFO_TABLE)
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(ids.into_iter().collect())
    }

    async fn drop_table(&self, name: &str) -> Result<()> {
        validate_table_name(name)?;
        sqlx::query(&format!("DROP TABLE IF EXISTS {}", quote_ident(name)))
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PlayerIdentity;
    use serde_json::json;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn memory_sink() -> SqliteSink {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        SqliteSink::new(pool)
    }

    fn player_table(rows: &[(&str, &str, &str)]) -> Table {
        let rows: Vec<PlayerIdentity> = rows
            .iter()
            .map(|(player, id, m)| PlayerIdentity {
                player: player.to_string(),
                player_id: id.to_string(),
                match_id: m.to_string(),
            })
            .collect();
        Table::from_rows(&rows)
    }

    #[test]
    fn test_sql_type_inference() {
        assert_eq!(sql_type(&json!(6)), "INTEGER");
        assert_eq!(sql_type(&json!(true)), "INTEGER");
        assert_eq!(sql_type(&json!(1.5)), "REAL");
        assert_eq!(sql_type(&json!("Kenya")), "TEXT");
        assert_eq!(sql_type(&json!(["a"])), "TEXT");
        assert_eq!(sql_type(&Value::Null), "TEXT");
    }

    #[test]
    fn test_quote_ident_escapes() {
        assert_eq!(quote_ident("over"), "\"over\"");
        assert_eq!(quote_ident("a\"b"), "\"a\"\"b\"");
    }

    #[tokio::test]
    async fn test_creates_on_first_write_and_appends() {
        let sink = memory_sink().await;
        assert!(!sink.table_exists("player_ids").await.unwrap());

        sink.write_table("player_ids", &player_table(&[("RR Patel", "id3", "m1")]))
            .await
            .unwrap();
        assert!(sink.table_exists("player_ids").await.unwrap());
        assert_eq!(
            sink.table_columns("player_ids").await.unwrap(),
            vec!["player", "player_id", "match_id"]
        );

        sink.write_table(
            "player_ids",
            &player_table(&[("MA Ouma", "id4", "m1"), ("RR Patel", "id3", "m2")]),
        )
        .await
        .unwrap();
        assert_eq!(sink.row_count("player_ids").await.unwrap(), Some(3));
    }

    #[tokio::test]
    async fn test_lists_stored_as_json_text() {
        let sink = memory_sink().await;
        let mut table = Table::new(vec!["match_id".to_string(), "dates".to_string()]);
        table.push_row(vec![json!("m1"), json!(["2022-01-01", "2022-01-02"])]);
        sink.write_table(MATCH_INFO_TABLE, &table).await.unwrap();

        let dates: String = sqlx::query_scalar("SELECT dates FROM match_info")
            .fetch_one(sink.pool())
            .await
            .unwrap();
        let parsed: Vec<String> = serde_json::from_str(&dates).unwrap();
        assert_eq!(parsed, vec!["2022-01-01", "2022-01-02"]);

        let ids = sink.existing_match_ids().await.unwrap();
        assert_eq!(ids.len(), 1);
        assert!(ids.contains("m1"));
    }

    #[tokio::test]
    async fn test_unknown_column_rejected() {
        let sink = memory_sink().await;
        sink.write_table("player_ids", &player_table(&[("A", "1", "m")]))
            .await
            .unwrap();
        let mut other = Table::new(vec!["nickname".to_string()]);
        other.push_row(vec![json!("x")]);
        assert!(sink.write_table("player_ids", &other).await.is_err());
    }

    #[tokio::test]
    async fn test_failed_batch_rolls_back_every_table() {
        let sink = memory_sink().await;
        sink.write_table("player_ids", &player_table(&[("A", "1", "m0")]))
            .await
            .unwrap();

        let mut deliveries = Table::new(vec!["match_id".to_string(), "over".to_string()]);
        deliveries.push_row(vec![json!("m1"), json!(1)]);
        let mut bad_players = Table::new(vec!["nickname".to_string()]);
        bad_players.push_row(vec![json!("x")]);

        let err = sink
            .write_tables(&[("ball_by_ball", &deliveries), ("player_ids", &bad_players)])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("has no column 'nickname'"));
        assert!(!sink.table_exists("ball_by_ball").await.unwrap());
        assert_eq!(sink.row_count("player_ids").await.unwrap(), Some(1));
    }

    #[tokio::test]
    async fn test_open_creates_file_and_schema() {
        let tmp = tempfile::TempDir::new().unwrap();
        let db = DbConfig {
            path: tmp.path().join("nested/dir/cricsheet.sqlite"),
        };
        let sink = SqliteSink::open(&db).await.unwrap();
        assert!(db.path.exists());
        assert!(sink.table_exists(MATCH_INFO_TABLE).await.unwrap());
        assert!(sink.existing_match_ids().await.unwrap().is_empty());
        sink.close().await;
    }

    #[tokio::test]
    async fn test_drop_table() {
        let sink = memory_sink().await;
        sink.write_table("player_ids", &player_table(&[("A", "1", "m")]))
            .await
            .unwrap();
        sink.drop_table("player_ids").await.unwrap();
        assert!(!sink.table_exists("player_ids").await.unwrap());
        assert_eq!(sink.row_count("player_ids").await.unwrap(), None);
        assert!(sink.existing_match_ids().await.unwrap().is_empty());
    }
}
