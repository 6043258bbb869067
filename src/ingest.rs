//! Ingestion pipeline orchestration.
//!
//! Coordinates the sync flow: discovery → id diff against the sink →
//! parsing → serialized table writes. Incrementality comes entirely from
//! the sink's [`existing_match_ids`](Sink::existing_match_ids): a match is
//! "existing" once its `match_info` row is stored. Each match's tables go
//! to the sink as one atomic batch with `match_info` last.
//!
//! ```text
//!  spawn_blocking (parse + geocode)            async writer
//!  ┌──────────────────────────────┐  mpsc   ┌──────────────────────────┐
//!  │ for id in new_ids:           │ ──────▶ │ ball_by_ball             │
//!  │   loader(id)?.process()      │ bounded │ player_ids (deduplicated)│
//!  └──────────────────────────────┘         │ match_info               │
//!                                           └──────────────────────────┘
//! ```

use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use tokio::sync::mpsc;

use crate::config::{Config, IngestConfig};
use crate::connector_fs;
use crate::error::{ParseError, ParseResult};
use crate::geocode;
use crate::models::{
    PlayerIdentity, Table, BALL_BY_BALL_TABLE, MATCH_INFO_TABLE, PLAYER_ID_TABLE,
};
use crate::processor::{MatchProcessor, ProcessedMatch};
use crate::progress::{SyncProgressEvent, SyncProgressReporter};
use crate::sink::Sink;
use crate::sqlite_sink::SqliteSink;

/// Knobs for one ingest run.
#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// Process at most this many new matches.
    pub limit: Option<usize>,
    /// Skip matches whose first date is before this day.
    pub since: Option<NaiveDate>,
    /// Skip matches whose first date is after this day.
    pub until: Option<NaiveDate>,
    pub fail_fast: bool,
    pub channel_capacity: usize,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self::from_config(&IngestConfig::default())
    }
}

impl IngestOptions {
    pub fn from_config(config: &IngestConfig) -> Self {
        Self {
            limit: None,
            since: None,
            until: None,
            fail_fast: config.fail_fast,
            channel_capacity: config.channel_capacity,
        }
    }

    fn has_window(&self) -> bool {
        self.since.is_some() || self.until.is_some()
    }

    fn in_window(&self, date: NaiveDate) -> bool {
        self.since.map_or(true, |s| date >= s) && self.until.map_or(true, |u| date <= u)
    }
}

/// Counters for one ingest run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub discovered: usize,
    pub already_present: usize,
    pub ingested: usize,
    pub skipped_by_date: usize,
    pub failed: usize,
    pub deliveries_written: usize,
    pub players_written: usize,
}

/// Ids in `available` that are not in `existing`, sorted.
pub fn new_match_ids<'a, I>(available: I, existing: &HashSet<String>) -> Vec<String>
where
    I: IntoIterator<Item = &'a String>,
{
    let mut ids: Vec<String> = available
        .into_iter()
        .filter(|id| !existing.contains(*id))
        .cloned()
        .collect();
    ids.sort();
    ids.dedup();
    ids
}

/// Drop repeated `(player, match_id)` pairs, keeping the first occurrence.
pub fn dedup_players(players: Vec<PlayerIdentity>) -> Vec<PlayerIdentity> {
    let mut seen = HashSet::new();
    players
        .into_iter()
        .filter(|p| seen.insert((p.player.clone(), p.match_id.clone())))
        .collect()
}

enum Parsed {
    Ready(Box<ProcessedMatch>),
    OutOfWindow(String),
    Failed(String, ParseError),
}

impl Parsed {
    fn match_id(&self) -> &str {
        match self {
            Parsed::Ready(processed) => &processed.match_id,
            Parsed::OutOfWindow(id) | Parsed::Failed(id, _) => id,
        }
    }
}

fn first_date(processor: &MatchProcessor) -> ParseResult<Option<NaiveDate>> {
    let dates = processor.parser().dates()?;
    let Some(first) = dates.first() else {
        return Ok(None);
    };
    NaiveDate::parse_from_str(first, "%Y-%m-%d")
        .map(Some)
        .map_err(|e| ParseError::malformed("info.dates[0]", format!("bad date '{}': {}", first, e)))
}

fn parse_one<L>(loader: &L, id: &str, options: &IngestOptions) -> Parsed
where
    L: Fn(&str) -> ParseResult<MatchProcessor>,
{
    let result = loader(id).and_then(|processor| {
        if options.has_window() {
            if let Some(date) = first_date(&processor)? {
                if !options.in_window(date) {
                    return Ok(None);
                }
            }
        }
        processor.process().map(Some)
    });
    match result {
        Ok(Some(processed)) => Parsed::Ready(Box::new(processed)),
        Ok(None) => Parsed::OutOfWindow(id.to_string()),
        Err(e) => Parsed::Failed(id.to_string(), e),
    }
}

/// Write one match's tables as a single atomic batch. `match_info` goes
/// last so the match only counts as existing once everything else is
/// stored, and a failed batch leaves no partial rows to duplicate on retry.
async fn write_match(sink: &dyn Sink, processed: ProcessedMatch) -> Result<(usize, usize)> {
    let ProcessedMatch {
        match_id,
        info,
        deliveries,
        players,
    } = processed;

    let deliveries = deliveries.to_table();
    let players = Table::from_rows(&dedup_players(players));
    let info = Table::from_rows(&[info]);

    let mut batch: Vec<(&str, &Table)> = Vec::with_capacity(3);
    if !deliveries.is_empty() {
        batch.push((BALL_BY_BALL_TABLE, &deliveries));
    }
    if !players.is_empty() {
        batch.push((PLAYER_ID_TABLE, &players));
    }
    batch.push((MATCH_INFO_TABLE, &info));

    sink.write_tables(&batch)
        .await
        .with_context(|| format!("writing tables for match {}", match_id))?;

    Ok((deliveries.len(), players.len()))
}

/// Ingest every id in `available` that the sink does not have yet.
///
/// `loader` turns a match id into a processor. It runs on a blocking
/// thread together with the parse, so it may capture blocking resources
/// (a geocoder's HTTP client), which are also dropped there.
pub async fn ingest_matches<L>(
    sink: &dyn Sink,
    available: Vec<String>,
    loader: L,
    options: &IngestOptions,
    progress: &dyn SyncProgressReporter,
) -> Result<IngestReport>
where
    L: Fn(&str) -> ParseResult<MatchProcessor> + Send + 'static,
{
    let existing = sink
        .existing_match_ids()
        .await
        .context("cannot determine which matches are already stored")?;

    let mut new_ids = new_match_ids(&available, &existing);
    let mut report = IngestReport {
        discovered: available.len(),
        already_present: available.iter().filter(|id| existing.contains(*id)).count(),
        ..IngestReport::default()
    };

    if let Some(limit) = options.limit {
        new_ids.truncate(limit);
    }
    let total = new_ids.len() as u64;
    if new_ids.is_empty() {
        return Ok(report);
    }

    let (tx, mut rx) = mpsc::channel::<Parsed>(options.channel_capacity.max(1));
    let producer_options = options.clone();
    let producer = tokio::task::spawn_blocking(move || {
        for id in &new_ids {
            let parsed = parse_one(&loader, id, &producer_options);
            let stop = producer_options.fail_fast && matches!(parsed, Parsed::Failed(..));
            // Receiver gone means the writer bailed.
            if tx.blocking_send(parsed).is_err() || stop {
                break;
            }
        }
    });

    let mut n = 0u64;
    while let Some(parsed) = rx.recv().await {
        n += 1;
        let match_id = parsed.match_id().to_string();
        match parsed {
            Parsed::Ready(processed) => {
                let (deliveries, players) = write_match(sink, *processed).await?;
                report.ingested += 1;
                report.deliveries_written += deliveries;
                report.players_written += players;
            }
            Parsed::OutOfWindow(_) => report.skipped_by_date += 1,
            Parsed::Failed(id, err) => {
                if options.fail_fast {
                    return Err(anyhow::Error::new(err).context(format!("failed to parse match {}", id)));
                }
                eprintln!("Warning: skipping match {}: {}", id, err);
                report.failed += 1;
            }
        }
        progress.report(SyncProgressEvent::Ingesting { match_id, n, total });
    }

    producer.await.context("match parser task failed")?;

    Ok(report)
}

fn parse_date_flag(flag: &str, value: Option<&str>) -> Result<Option<NaiveDate>> {
    value
        .map(|s| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .with_context(|| format!("--{} must be YYYY-MM-DD, got '{}'", flag, s))
        })
        .transpose()
}

pub async fn run_sync(
    config: &Config,
    dry_run: bool,
    limit: Option<usize>,
    since: Option<String>,
    until: Option<String>,
    progress: &dyn SyncProgressReporter,
) -> Result<()> {
    let mut options = IngestOptions::from_config(&config.ingest);
    options.limit = limit;
    options.since = parse_date_flag("since", since.as_deref())?;
    options.until = parse_date_flag("until", until.as_deref())?;
    if let (Some(s), Some(u)) = (options.since, options.until) {
        if s > u {
            bail!("--since {} is after --until {}", s, u);
        }
    }

    progress.report(SyncProgressEvent::Discovering {
        source: config.source.root.display().to_string(),
    });
    let files: BTreeMap<String, PathBuf> = connector_fs::scan_matches(&config.source)?;
    let available: Vec<String> = files.keys().cloned().collect();

    let sink = SqliteSink::open(&config.db).await?;

    if dry_run {
        let existing = sink.existing_match_ids().await?;
        let new_ids = new_match_ids(&available, &existing);
        let would_ingest = limit.map_or(new_ids.len(), |lim| new_ids.len().min(lim));
        println!("sync (dry-run)");
        println!("  matches found: {}", available.len());
        println!("  already present: {}", available.len() - new_ids.len());
        println!("  would ingest: {}", would_ingest);
        sink.close().await;
        return Ok(());
    }

    // The provider's HTTP client is created lazily on first lookup, which
    // happens on the blocking parser thread.
    let geocoder = geocode::create_geocoder(&config.geocoding)?;
    let loader = move |id: &str| {
        let path = files.get(id).ok_or_else(|| ParseError::NotFound {
            locator: id.to_string(),
        })?;
        MatchProcessor::open(path, Arc::clone(&geocoder))
    };

    let report = ingest_matches(&sink, available, loader, &options, progress).await?;

    println!("sync {}", config.source.root.display());
    println!("  matches found: {}", report.discovered);
    println!("  already present: {}", report.already_present);
    println!("  ingested: {}", report.ingested);
    if options.has_window() {
        println!("  skipped by date: {}", report.skipped_by_date);
    }
    println!("  failed: {}", report.failed);
    println!("  deliveries written: {}", report.deliveries_written);
    println!("  players written: {}", report.players_written);
    println!("ok");

    sink.close().await;
    Ok(())
}
