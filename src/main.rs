//! # Cricsheet Ingest CLI (`crick`)
//!
//! ## Usage
//!
//! ```bash
//! crick --config ./config/crick.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `crick init` | Create the SQLite database and the match tables |
//! | `crick sync` | Ingest match files not yet in the database |
//! | `crick show <file>` | Parse one match file and print a table as JSON |
//! | `crick stats` | Row and match counts per table |

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use cricsheet_ingest::config::{self, GeocodingConfig};
use cricsheet_ingest::progress::ProgressMode;
use cricsheet_ingest::show::ShowTable;
use cricsheet_ingest::{ingest, migrate, show, stats};

/// Cricsheet Ingest CLI: normalize Cricsheet match JSON into SQLite tables.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/crick.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "crick",
    about = "Normalize Cricsheet match records into match, delivery, and player tables",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/crick.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and the match_info, ball_by_ball,
    /// and player_ids tables. Safe to run more than once.
    Init,

    /// Ingest new match files.
    ///
    /// Scans the source root, skips matches already in the database, and
    /// writes the remaining ones in match id order.
    Sync {
        /// Show counts without parsing or writing anything.
        #[arg(long)]
        dry_run: bool,

        /// Maximum number of new matches to process.
        #[arg(long)]
        limit: Option<usize>,

        /// Only ingest matches starting on or after this date (YYYY-MM-DD).
        #[arg(long)]
        since: Option<String>,

        /// Only ingest matches starting on or before this date (YYYY-MM-DD).
        #[arg(long)]
        until: Option<String>,

        /// Progress output on stderr: `off`, `human`, or `json`.
        /// Defaults to human on a terminal, off otherwise.
        #[arg(long)]
        progress: Option<String>,
    },

    /// Parse one match file and print a table as JSON.
    ///
    /// Does not need a database. Geocoding settings are read from the
    /// config file when it exists.
    Show {
        /// Path to a Cricsheet match JSON file.
        file: PathBuf,

        /// Table to print: `info`, `deliveries`, or `players`.
        #[arg(long, default_value = "info")]
        table: String,

        /// Match id to use instead of the file stem.
        #[arg(long)]
        match_id: Option<String>,
    },

    /// Show row and match counts per table.
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Commands that don't require config
    if let Commands::Show {
        file,
        table,
        match_id,
    } = &cli.command
    {
        let geocoding = if cli.config.exists() {
            config::load_config(&cli.config)?.geocoding
        } else {
            GeocodingConfig::default()
        };
        let table = ShowTable::parse(table)?;
        show::run_show(&geocoding, file, table, match_id.clone()).await?;
        return Ok(());
    }

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Sync {
            dry_run,
            limit,
            since,
            until,
            progress,
        } => {
            let reporter = ProgressMode::from_flag(progress.as_deref())?.reporter();
            ingest::run_sync(&cfg, dry_run, limit, since, until, &*reporter).await?;
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
        Commands::Show { .. } => {
            // Handled above (before config loading)
            unreachable!()
        }
    }

    Ok(())
}
