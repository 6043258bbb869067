//! # Cricsheet Ingest
//!
//! Turns Cricsheet match records (one JSON document per match) into three
//! normalized tables: match information, ball-by-ball deliveries, and
//! player identities, and appends them to a relational sink.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌─────────────┐   ┌──────────────┐   ┌──────────┐
//! │ Match files │──▶│ MatchParser  │──▶│MatchProcessor│──▶│  Sink    │
//! │ (*.json)    │   │ typed fields │   │ info + balls │   │ SQLite / │
//! └─────────────┘   └──────┬──────┘   └──────────────┘   │ memory   │
//!                          │                              └──────────┘
//!                          ▼
//!                     ┌──────────┐
//!                     │ Geocoder │  city → country (best effort)
//!                     └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! crick init                         # create database and tables
//! crick sync                         # ingest new matches
//! crick show data/1082591.json       # print one match's info row
//! crick stats                        # row counts per table
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`error`] | Parse error taxonomy |
//! | [`record`] | Raw JSON record and path-aware navigation |
//! | [`models`] | Row types and tables |
//! | [`parser`] | Typed accessors over one match record |
//! | [`processor`] | Match info row and ball-by-ball table |
//! | [`geocode`] | City → country lookup |
//! | [`sink`] | Storage trait and in-memory sink |
//! | [`sqlite_sink`] | SQLite connection and sink |
//! | [`connector_fs`] | Match file discovery |
//! | [`ingest`] | Incremental ingest pipeline |
//! | [`progress`] | Sync progress reporting |
//! | [`migrate`] | Schema creation |
//! | [`show`] | Single-file inspection |
//! | [`stats`] | Database statistics |

pub mod config;
pub mod connector_fs;
pub mod error;
pub mod geocode;
pub mod ingest;
pub mod migrate;
pub mod models;
pub mod parser;
pub mod processor;
pub mod progress;
pub mod record;
pub mod show;
pub mod sink;
pub mod sqlite_sink;
pub mod stats;
