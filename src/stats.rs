//! Database statistics.
//!
//! A quick summary of what has been ingested: rows per table and how many
//! distinct matches each table covers. Used by `crick stats` to confirm
//! that syncs are landing.

use anyhow::Result;

use crate::config::Config;
use crate::models::{BALL_BY_BALL_TABLE, MATCH_INFO_TABLE, PLAYER_ID_TABLE};
use crate::sqlite_sink::{self, SqliteSink};

/// Counts for one sink table. `None` when the table has not been created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableStats {
    pub table: &'static str,
    pub rows: Option<i64>,
    pub matches: Option<i64>,
}

pub async fn collect_stats(sink: &SqliteSink) -> Result<Vec<TableStats>> {
    let mut stats = Vec::new();
    for table in [MATCH_INFO_TABLE, BALL_BY_BALL_TABLE, PLAYER_ID_TABLE] {
        let rows = sink.row_count(table).await?;
        let matches = match rows {
            Some(_) => Some(
                sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(DISTINCT match_id) FROM \"{}\"", table))
                    .fetch_one(sink.pool())
                    .await?,
            ),
            None => None,
        };
        stats.push(TableStats {
            table,
            rows,
            matches,
        });
    }
    Ok(stats)
}

/// Run the stats command: query the database and print a summary.
pub async fn run_stats(config: &Config) -> Result<()> {
    let sink = SqliteSink::new(sqlite_sink::connect(&config.db).await?);
    let stats = collect_stats(&sink).await?;

    let db_size = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("Cricsheet Ingest — Database Stats");
    println!("=================================");
    println!();
    println!("  Database:    {}", config.db.path.display());
    println!("  Size:        {}", format_bytes(db_size));
    println!();
    println!("  {:<16} {:>10} {:>10}", "TABLE", "ROWS", "MATCHES");
    println!("  {}", "-".repeat(38));
    for s in &stats {
        let show = |v: Option<i64>| v.map_or("-".to_string(), |n| n.to_string());
        println!(
            "  {:<16} {:>10} {:>10}",
            s.table,
            show(s.rows),
            show(s.matches)
        );
    }
    println!();

    sink.close().await;
    Ok(())
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrate::create_schema;
    use crate::models::{PlayerIdentity, Table};
    use crate::sink::Sink;
    use sqlx::sqlite::SqlitePoolOptions;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MB");
    }

    #[tokio::test]
    async fn test_collect_stats_counts_rows_and_matches() {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let sink = SqliteSink::new(pool.clone());

        let before = collect_stats(&sink).await.unwrap();
        assert!(before.iter().all(|s| s.rows.is_none()));

        create_schema(&pool).await.unwrap();
        let players: Vec<PlayerIdentity> = [("A", "1", "m1"), ("B", "2", "m1"), ("A", "1", "m2")]
            .iter()
            .map(|(p, id, m)| PlayerIdentity {
                player: p.to_string(),
                player_id: id.to_string(),
                match_id: m.to_string(),
            })
            .collect();
        sink.write_table(PLAYER_ID_TABLE, &Table::from_rows(&players))
            .await
            .unwrap();

        let after = collect_stats(&sink).await.unwrap();
        let players = after.iter().find(|s| s.table == PLAYER_ID_TABLE).unwrap();
        assert_eq!(players.rows, Some(3));
        assert_eq!(players.matches, Some(2));
        let info = after.iter().find(|s| s.table == MATCH_INFO_TABLE).unwrap();
        assert_eq!(info.rows, Some(0));
        assert_eq!(info.matches, Some(0));
    }
}
