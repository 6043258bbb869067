//! Typed, read-only view over one Cricsheet match record.
//!
//! [`MatchParser`] loads a record eagerly and exposes every field the
//! processor needs as a pure accessor. Nothing is cached: each call walks
//! the immutable JSON again, so results always reflect the loaded record.
//!
//! # Field paths
//!
//! Required fields fail with [`ParseError::MissingField`] naming the path.
//! Optional fields (match outcome margins, reserve umpire, match referee,
//! per-delivery `extras` and `wickets`) yield `None` when absent.
//!
//! # Innings tables
//!
//! [`MatchParser::innings_data`] flattens one innings into deliveries:
//!
//! ```text
//! innings[i].overs[o].deliveries[d]  ──▶  Delivery { innings: i+1, over: over+1, .. }
//! ```
//!
//! Rows keep strict source order (over-major, delivery-minor). An innings
//! index past the end of the innings list is not an error: it yields an
//! empty table, which callers read as "this innings did not take place".

use std::path::Path;
use std::sync::Arc;

use crate::error::{ParseError, ParseResult};
use crate::geocode::Geocoder;
use crate::models::{Delivery, DeliveryOutcome, DeliveryTable, Dismissal, PlayerIdentity};
use crate::record::{Node, RawMatchRecord};

/// Parser for a single match record.
pub struct MatchParser {
    record: RawMatchRecord,
    match_id: String,
    geocoder: Arc<dyn Geocoder>,
}

impl MatchParser {
    /// Load a record from `path`. The match id is the file stem.
    pub fn open(path: &Path, geocoder: Arc<dyn Geocoder>) -> ParseResult<Self> {
        let record = RawMatchRecord::load(path)?;
        Ok(Self {
            record,
            match_id: match_id_from_path(path),
            geocoder,
        })
    }

    /// Parse a record from JSON text. The match id is the stem of `locator`.
    pub fn from_json_str(
        locator: &str,
        text: &str,
        geocoder: Arc<dyn Geocoder>,
    ) -> ParseResult<Self> {
        let record = RawMatchRecord::from_json_str(locator, text)?;
        Ok(Self {
            record,
            match_id: match_id_from_path(Path::new(locator)),
            geocoder,
        })
    }

    /// Wrap an already-loaded record with an explicit match id.
    pub fn from_record(
        record: RawMatchRecord,
        match_id: impl Into<String>,
        geocoder: Arc<dyn Geocoder>,
    ) -> Self {
        Self {
            record,
            match_id: match_id.into(),
            geocoder,
        }
    }

    /// Override the match id derived from the locator.
    pub fn with_match_id(mut self, match_id: impl Into<String>) -> Self {
        self.match_id = match_id.into();
        self
    }

    pub fn match_id(&self) -> &str {
        &self.match_id
    }

    fn info(&self) -> ParseResult<Node<'_>> {
        self.record.info()
    }

    // ============ Scalar fields ============

    pub fn balls_per_over(&self) -> ParseResult<u32> {
        self.info()?.field("balls_per_over")?.as_u32()
    }

    pub fn dates(&self) -> ParseResult<Vec<String>> {
        self.info()?.field("dates")?.as_string_list()
    }

    pub fn venue(&self) -> ParseResult<String> {
        self.info()?.str_at("venue")
    }

    pub fn city(&self) -> ParseResult<String> {
        self.info()?.str_at("city")
    }

    pub fn gender(&self) -> ParseResult<String> {
        self.info()?.str_at("gender")
    }

    /// Season label. Cricsheet uses both `"2009/10"` and `2010`.
    pub fn season(&self) -> ParseResult<String> {
        self.info()?.field("season")?.as_text()
    }

    pub fn match_type(&self) -> ParseResult<String> {
        self.info()?.str_at("match_type")
    }

    pub fn team_type(&self) -> ParseResult<String> {
        self.info()?.str_at("team_type")
    }

    pub fn team_1(&self) -> ParseResult<String> {
        self.info()?.field("teams")?.index(0)?.to_string_value()
    }

    pub fn team_2(&self) -> ParseResult<String> {
        self.info()?.field("teams")?.index(1)?.to_string_value()
    }

    pub fn toss_winner(&self) -> ParseResult<String> {
        self.info()?.str_at("toss.winner")
    }

    pub fn toss_winner_decision(&self) -> ParseResult<String> {
        self.info()?.str_at("toss.decision")
    }

    /// Winning team; `None` for ties, draws and no-results.
    pub fn winner(&self) -> ParseResult<Option<String>> {
        self.info()?
            .descend_opt("outcome.winner")?
            .map(|n| n.to_string_value())
            .transpose()
    }

    pub fn won_by_runs(&self) -> ParseResult<Option<u32>> {
        self.margin("runs")
    }

    pub fn won_by_wickets(&self) -> ParseResult<Option<u32>> {
        self.margin("wickets")
    }

    /// Victory margin of `kind`. A win is by runs or by wickets, never both.
    fn margin(&self, kind: &str) -> ParseResult<Option<u32>> {
        let Some(by) = self.info()?.descend_opt("outcome.by")? else {
            return Ok(None);
        };
        if by.get("runs")?.is_some() && by.get("wickets")?.is_some() {
            return Err(ParseError::malformed(
                by.path(),
                "outcome has both a runs and a wickets margin",
            ));
        }
        by.get(kind)?.map(|n| n.as_u32()).transpose()
    }

    pub fn umpire_1(&self) -> ParseResult<String> {
        self.umpire(0)
    }

    pub fn umpire_2(&self) -> ParseResult<String> {
        self.umpire(1)
    }

    fn umpire(&self, index: usize) -> ParseResult<String> {
        self.info()?
            .descend("officials.umpires")?
            .index(index)?
            .to_string_value()
    }

    /// First listed reserve umpire.
    pub fn third_umpire(&self) -> ParseResult<Option<String>> {
        self.first_official("reserve_umpires")
    }

    /// First listed match referee.
    pub fn match_referee(&self) -> ParseResult<Option<String>> {
        self.first_official("match_referees")
    }

    // Cricsheet stores these as lists; only the first entry is used.
    // TODO: decide whether additional reserve umpires / referees need their own columns.
    fn first_official(&self, role: &str) -> ParseResult<Option<String>> {
        let Some(officials) = self.info()?.get("officials")? else {
            return Ok(None);
        };
        let Some(list) = officials.get(role)? else {
            return Ok(None);
        };
        list.get_index(0)?
            .map(|n| n.to_string_value())
            .transpose()
    }

    // ============ Derived fields ============

    /// Country of the match city, via the injected geocoder.
    ///
    /// A geocoder miss is `Ok(None)`; only a missing `info.city` is an error.
    pub fn country(&self) -> ParseResult<Option<String>> {
        let city = self.city()?;
        Ok(self.geocoder.country(&city))
    }

    /// The team whose name matches the resolved country, if any.
    pub fn home_team(&self) -> ParseResult<Option<String>> {
        let country = self.country()?;
        Ok(home_team_for(
            country.as_deref(),
            &self.team_1()?,
            &self.team_2()?,
        ))
    }

    /// Registry ids of team 1's lineup, in lineup order.
    pub fn team_1_players(&self) -> ParseResult<Vec<String>> {
        self.lineup_ids(&self.team_1()?)
    }

    /// Registry ids of team 2's lineup, in lineup order.
    pub fn team_2_players(&self) -> ParseResult<Vec<String>> {
        self.lineup_ids(&self.team_2()?)
    }

    fn lineup(&self, team: &str) -> ParseResult<Vec<String>> {
        self.info()?
            .field("players")?
            .field(team)?
            .as_string_list()
    }

    fn registry_id(&self, player: &str) -> ParseResult<String> {
        self.info()?
            .field("registry")?
            .field("people")?
            .field(player)?
            .to_string_value()
    }

    fn lineup_ids(&self, team: &str) -> ParseResult<Vec<String>> {
        self.lineup(team)?
            .iter()
            .map(|name| self.registry_id(name))
            .collect()
    }

    /// Name → registry id rows for both lineups, team 1 first.
    pub fn player_id_table(&self) -> ParseResult<Vec<PlayerIdentity>> {
        let mut names = self.lineup(&self.team_1()?)?;
        names.extend(self.lineup(&self.team_2()?)?);

        names
            .into_iter()
            .map(|player| {
                Ok(PlayerIdentity {
                    player_id: self.registry_id(&player)?,
                    player,
                    match_id: self.match_id.clone(),
                })
            })
            .collect()
    }

    // ============ Innings ============

    /// Number of innings recorded. A record with no `innings` key has none.
    pub fn innings_count(&self) -> ParseResult<usize> {
        match self.record.root().get("innings")? {
            Some(list) => list.len(),
            None => Ok(0),
        }
    }

    /// Ball-by-ball table for the innings at 0-based `index`.
    ///
    /// Returns an empty table when the match has no such innings, either
    /// because the list is shorter or because the slot is `null`.
    pub fn innings_data(&self, index: usize) -> ParseResult<DeliveryTable> {
        let Some(list) = self.record.root().get("innings")? else {
            return Ok(DeliveryTable::empty());
        };
        match list.get_index(index)? {
            Some(innings) if !innings.value().is_null() => {
                flatten_innings(&self.match_id, index, &innings)
            }
            _ => Ok(DeliveryTable::empty()),
        }
    }

    /// First innings. In a test match, the first innings of the side batting first.
    pub fn first_innings_data(&self) -> ParseResult<DeliveryTable> {
        self.innings_data(0)
    }

    /// Second innings. In a test match, the first innings of the side batting second.
    pub fn second_innings_data(&self) -> ParseResult<DeliveryTable> {
        self.innings_data(1)
    }

    /// Third innings. Empty for limited-overs matches.
    pub fn third_innings_data(&self) -> ParseResult<DeliveryTable> {
        self.innings_data(2)
    }

    /// Fourth innings. Empty for limited-overs matches.
    pub fn fourth_innings_data(&self) -> ParseResult<DeliveryTable> {
        self.innings_data(3)
    }
}

/// Derive a match id from a record locator: the file name without extension.
pub fn match_id_from_path(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// Home team given a resolved country. `None` at neutral venues or when the
/// country is unknown.
pub fn home_team_for(country: Option<&str>, team_1: &str, team_2: &str) -> Option<String> {
    let country = country?;
    [team_1, team_2]
        .into_iter()
        .find(|team| *team == country)
        .map(str::to_string)
}

/// Flatten one innings object into delivery rows.
///
/// `index` is the 0-based innings position; rows carry it 1-based. Over
/// numbers in the source are 0-based and are likewise shifted. A forfeited
/// innings (no `overs` key) produces no rows.
pub fn flatten_innings(match_id: &str, index: usize, innings: &Node<'_>) -> ParseResult<DeliveryTable> {
    let innings_no = u32::try_from(index + 1)
        .map_err(|_| ParseError::malformed(innings.path(), "innings index out of range"))?;
    let batting_team = innings.str_at("team")?;

    let Some(overs) = innings.get("overs")? else {
        return Ok(DeliveryTable::empty());
    };

    let mut rows = Vec::new();
    for over in overs.items()? {
        let over_no = over.field("over")?.as_u32()? + 1;
        for delivery in over.field("deliveries")?.items()? {
            rows.push(Delivery {
                match_id: match_id.to_string(),
                innings: innings_no,
                over: over_no,
                batting_team: batting_team.clone(),
                outcome: flatten_delivery(&delivery)?,
            });
        }
    }

    Ok(DeliveryTable::new(rows))
}

/// Flatten a single delivery object.
///
/// Only the first entry of `wickets` is modelled; a second dismissal on the
/// same ball is not represented.
pub fn flatten_delivery(delivery: &Node<'_>) -> ParseResult<DeliveryOutcome> {
    let runs = delivery.field("runs")?;

    let extras_type = match delivery.get("extras")? {
        Some(extras) => extras.keys()?.first().map(|k| k.to_string()),
        None => None,
    };

    let dismissal = match delivery.get("wickets")? {
        Some(wickets) => {
            let first = wickets.index(0)?;
            let fielders = match first.get("fielders")? {
                Some(list) => list
                    .items()?
                    .iter()
                    .map(|f| f.str_at("name"))
                    .collect::<ParseResult<Vec<_>>>()?,
                None => Vec::new(),
            };
            Some(Dismissal {
                dismissed_batsman: first.str_at("player_out")?,
                dismissal_type: first.str_at("kind")?,
                fielders,
            })
        }
        None => None,
    };

    Ok(DeliveryOutcome {
        batsman: delivery.str_at("batter")?,
        bowler: delivery.str_at("bowler")?,
        non_striker: delivery.str_at("non_striker")?,
        runs_by_batsman: runs.field("batter")?.as_u32()?,
        extras_type,
        runs_from_extras: runs.field("extras")?.as_u32()?,
        dismissal,
    })
}
