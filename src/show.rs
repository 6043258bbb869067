//! Parse a single match file and print its tables.
//!
//! Used by `crick show` to inspect what a record would produce without
//! touching the database.

use anyhow::{bail, Context, Result};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

use crate::config::GeocodingConfig;
use crate::error::ParseResult;
use crate::geocode;
use crate::models::Table;
use crate::parser::MatchParser;
use crate::processor::MatchProcessor;

/// Which table `crick show` prints.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShowTable {
    Info,
    Deliveries,
    Players,
}

impl ShowTable {
    pub fn parse(name: &str) -> Result<Self> {
        match name {
            "info" => Ok(ShowTable::Info),
            "deliveries" => Ok(ShowTable::Deliveries),
            "players" => Ok(ShowTable::Players),
            other => bail!(
                "Unknown table: '{}'. Must be info, deliveries, or players.",
                other
            ),
        }
    }
}

/// Render one of the processor's tables.
pub fn render(processor: &MatchProcessor, table: ShowTable) -> ParseResult<Table> {
    Ok(match table {
        ShowTable::Info => Table::from_rows(&[processor.match_info()?]),
        ShowTable::Deliveries => processor.ball_by_ball_table()?.to_table(),
        ShowTable::Players => Table::from_rows(&processor.player_id_table()?),
    })
}

/// Core show function returning JSON records.
///
/// Runs on a blocking thread since geocoding may issue HTTP requests.
pub async fn show_records(
    geocoding: &GeocodingConfig,
    file: &Path,
    table: ShowTable,
    match_id: Option<String>,
) -> Result<Vec<Map<String, Value>>> {
    let geocoding = geocoding.clone();
    let file: PathBuf = file.to_path_buf();
    tokio::task::spawn_blocking(move || -> Result<Vec<Map<String, Value>>> {
        let geocoder = geocode::create_geocoder(&geocoding)?;
        let mut parser = MatchParser::open(&file, geocoder)?;
        if let Some(id) = match_id {
            parser = parser.with_match_id(id);
        }
        let processor = MatchProcessor::new(parser);
        let rendered = render(&processor, table)
            .with_context(|| format!("failed to parse {}", file.display()))?;
        Ok(rendered.records())
    })
    .await?
}

/// CLI entry point: prints the records as a JSON array on stdout.
pub async fn run_show(
    geocoding: &GeocodingConfig,
    file: &Path,
    table: ShowTable,
    match_id: Option<String>,
) -> Result<()> {
    let records = show_records(geocoding, file, table, match_id).await?;
    println!("{}", serde_json::to_string_pretty(&records)?);
    Ok(())
}
