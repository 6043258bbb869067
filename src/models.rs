//! Core data models produced by the parser.
//!
//! These types are the normalized rows that flow from a raw match record to
//! a storage sink: one [`MatchInfo`] per match, one [`Delivery`] per ball,
//! and one [`PlayerIdentity`] per player in either lineup. Every row type
//! implements [`TableRow`] so it can be rendered into a column-ordered
//! [`Table`].

use serde::Serialize;
use serde_json::{json, Map, Value};

/// Sink table holding one row per match.
pub const MATCH_INFO_TABLE: &str = "match_info";
/// Sink table holding one row per delivery.
pub const BALL_BY_BALL_TABLE: &str = "ball_by_ball";
/// Sink table holding the name → registry id mapping per match.
pub const PLAYER_ID_TABLE: &str = "player_ids";

/// A row type with a fixed, ordered column set.
pub trait TableRow {
    /// Column names, in output order.
    const COLUMNS: &'static [&'static str];

    /// Cell values, aligned with [`COLUMNS`](TableRow::COLUMNS).
    fn values(&self) -> Vec<Value>;
}

/// Column-ordered, row-major table of JSON values.
///
/// A table with no columns and no rows is the "did not occur" marker used
/// for absent innings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Build a table from typed rows. The column set is always present,
    /// even when `rows` is empty.
    pub fn from_rows<R: TableRow>(rows: &[R]) -> Self {
        Self {
            columns: R::COLUMNS.iter().map(|c| c.to_string()).collect(),
            rows: rows.iter().map(TableRow::values).collect(),
        }
    }

    /// Append a row. Panics in debug builds if the width does not match.
    pub fn push_row(&mut self, row: Vec<Value>) {
        debug_assert_eq!(row.len(), self.columns.len());
        self.rows.push(row);
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// All values of one column, or `None` if the column does not exist.
    pub fn column(&self, name: &str) -> Option<Vec<&Value>> {
        let idx = self.columns.iter().position(|c| c == name)?;
        Some(self.rows.iter().map(|row| &row[idx]).collect())
    }

    /// Rows as JSON objects keyed by column name.
    pub fn records(&self) -> Vec<Map<String, Value>> {
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .cloned()
                    .zip(row.iter().cloned())
                    .collect::<Map<String, Value>>()
            })
            .collect()
    }
}

/// One row of match-level information.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchInfo {
    pub match_id: String,
    pub balls_per_over: u32,
    pub dates: Vec<String>,
    pub venue: String,
    pub city: String,
    pub country: Option<String>,
    pub team_1: String,
    /// Registry ids, in lineup order.
    pub team_1_players: Vec<String>,
    pub team_2: String,
    pub team_2_players: Vec<String>,
    pub home_team: Option<String>,
    pub gender: String,
    pub season: String,
    pub team_type: String,
    pub toss_winner: String,
    pub toss_winner_decision: String,
    pub match_type: String,
    pub winner: Option<String>,
    pub won_by_runs: Option<u32>,
    pub won_by_wickets: Option<u32>,
    pub umpire_1: String,
    pub umpire_2: String,
    pub third_umpire: Option<String>,
    pub match_referee: Option<String>,
}

impl TableRow for MatchInfo {
    const COLUMNS: &'static [&'static str] = &[
        "match_id",
        "balls_per_over",
        "dates",
        "venue",
        "city",
        "country",
        "team_1",
        "team_1_players",
        "team_2",
        "team_2_players",
        "home_team",
        "gender",
        "season",
        "team_type",
        "toss_winner",
        "toss_winner_decision",
        "match_type",
        "winner",
        "won_by_runs",
        "won_by_wickets",
        "umpire_1",
        "umpire_2",
        "third_umpire",
        "match_referee",
    ];

    fn values(&self) -> Vec<Value> {
        vec![
            json!(self.match_id),
            json!(self.balls_per_over),
            json!(self.dates),
            json!(self.venue),
            json!(self.city),
            json!(self.country),
            json!(self.team_1),
            json!(self.team_1_players),
            json!(self.team_2),
            json!(self.team_2_players),
            json!(self.home_team),
            json!(self.gender),
            json!(self.season),
            json!(self.team_type),
            json!(self.toss_winner),
            json!(self.toss_winner_decision),
            json!(self.match_type),
            json!(self.winner),
            json!(self.won_by_runs),
            json!(self.won_by_wickets),
            json!(self.umpire_1),
            json!(self.umpire_2),
            json!(self.third_umpire),
            json!(self.match_referee),
        ]
    }
}

/// The first recorded wicket on a delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dismissal {
    pub dismissed_batsman: String,
    pub dismissal_type: String,
    /// Fielder names in source order. Empty for bowled, lbw, etc.
    pub fielders: Vec<String>,
}

/// Per-ball fields that come from the delivery object itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryOutcome {
    pub batsman: String,
    pub bowler: String,
    pub non_striker: String,
    pub runs_by_batsman: u32,
    pub extras_type: Option<String>,
    pub runs_from_extras: u32,
    pub dismissal: Option<Dismissal>,
}

/// One ball bowled, with its position in the match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub match_id: String,
    /// 1-indexed innings number.
    pub innings: u32,
    /// 1-indexed over number.
    pub over: u32,
    pub batting_team: String,
    pub outcome: DeliveryOutcome,
}

impl TableRow for Delivery {
    const COLUMNS: &'static [&'static str] = &[
        "match_id",
        "innings",
        "over",
        "batting_team",
        "batsman",
        "bowler",
        "non_striker",
        "runs_by_batsman",
        "extras_type",
        "runs_from_extras",
        "dismissed_batsman",
        "dismissal_type",
        "fielders_in_dismissal",
    ];

    fn values(&self) -> Vec<Value> {
        let o = &self.outcome;
        let (dismissed, kind, fielders) = match &o.dismissal {
            Some(d) => (
                json!(d.dismissed_batsman),
                json!(d.dismissal_type),
                json!(d.fielders),
            ),
            None => (Value::Null, Value::Null, Value::Null),
        };
        vec![
            json!(self.match_id),
            json!(self.innings),
            json!(self.over),
            json!(self.batting_team),
            json!(o.batsman),
            json!(o.bowler),
            json!(o.non_striker),
            json!(o.runs_by_batsman),
            json!(o.extras_type),
            json!(o.runs_from_extras),
            dismissed,
            kind,
            fielders,
        ]
    }
}

/// Ordered deliveries of one or more innings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryTable {
    rows: Vec<Delivery>,
}

impl DeliveryTable {
    pub fn new(rows: Vec<Delivery>) -> Self {
        Self { rows }
    }

    /// The table for an innings that did not take place.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Concatenate tables in order. Empty tables contribute nothing.
    pub fn concat<I>(tables: I) -> Self
    where
        I: IntoIterator<Item = DeliveryTable>,
    {
        Self {
            rows: tables.into_iter().flat_map(|t| t.rows).collect(),
        }
    }

    pub fn rows(&self) -> &[Delivery] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Column names: the delivery columns, or none at all when empty.
    pub fn columns(&self) -> &'static [&'static str] {
        if self.rows.is_empty() {
            &[]
        } else {
            Delivery::COLUMNS
        }
    }

    /// Render as a [`Table`]. An empty delivery table becomes a table with
    /// zero rows and zero columns.
    pub fn to_table(&self) -> Table {
        if self.rows.is_empty() {
            Table::default()
        } else {
            Table::from_rows(&self.rows)
        }
    }
}

/// A player's in-match display name mapped to their registry id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct PlayerIdentity {
    pub player: String,
    pub player_id: String,
    pub match_id: String,
}

impl TableRow for PlayerIdentity {
    const COLUMNS: &'static [&'static str] = &["player", "player_id", "match_id"];

    fn values(&self) -> Vec<Value> {
        vec![
            json!(self.player),
            json!(self.player_id),
            json!(self.match_id),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delivery(innings: u32, dismissal: Option<Dismissal>) -> Delivery {
        Delivery {
            match_id: "m1".to_string(),
            innings,
            over: 1,
            batting_team: "Kenya".to_string(),
            outcome: DeliveryOutcome {
                batsman: "E Otieno".to_string(),
                bowler: "B Zuiderent".to_string(),
                non_striker: "NN Odhiambo".to_string(),
                runs_by_batsman: 0,
                extras_type: None,
                runs_from_extras: 0,
                dismissal,
            },
        }
    }

    #[test]
    fn test_empty_delivery_table_has_no_columns() {
        let table = DeliveryTable::empty();
        assert!(table.columns().is_empty());
        let rendered = table.to_table();
        assert!(rendered.columns().is_empty());
        assert!(rendered.is_empty());
    }

    #[test]
    fn test_concat_skips_empty_tables() {
        let a = DeliveryTable::new(vec![delivery(1, None)]);
        let b = DeliveryTable::empty();
        let c = DeliveryTable::new(vec![delivery(4, None)]);
        let all = DeliveryTable::concat([a, b, c]);
        let innings: Vec<u32> = all.rows().iter().map(|d| d.innings).collect();
        assert_eq!(innings, vec![1, 4]);
        assert_eq!(all.columns(), Delivery::COLUMNS);
    }

    #[test]
    fn test_dismissal_columns_are_null_together() {
        let row = delivery(2, None).values();
        assert!(row[10].is_null() && row[11].is_null() && row[12].is_null());

        let row = delivery(
            2,
            Some(Dismissal {
                dismissed_batsman: "E Otieno".to_string(),
                dismissal_type: "bowled".to_string(),
                fielders: vec![],
            }),
        )
        .values();
        assert_eq!(row[10], json!("E Otieno"));
        assert_eq!(row[11], json!("bowled"));
        assert_eq!(row[12], json!([]));
    }

    #[test]
    fn test_row_width_matches_columns() {
        assert_eq!(delivery(1, None).values().len(), Delivery::COLUMNS.len());
        let p = PlayerIdentity {
            player: "RR Patel".to_string(),
            player_id: "id3".to_string(),
            match_id: "m1".to_string(),
        };
        assert_eq!(p.values().len(), PlayerIdentity::COLUMNS.len());
    }

    #[test]
    fn test_table_records_and_column_access() {
        let table = Table::from_rows(&[PlayerIdentity {
            player: "MA Ouma".to_string(),
            player_id: "id4".to_string(),
            match_id: "m1".to_string(),
        }]);
        assert_eq!(table.column("player_id").unwrap(), vec![&json!("id4")]);
        assert!(table.column("nope").is_none());
        let records = table.records();
        assert_eq!(records[0]["player"], json!("MA Ouma"));
    }
}
