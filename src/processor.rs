//! Assembly of the per-match outputs handed to storage.
//!
//! [`MatchProcessor`] composes a [`MatchParser`] into the two tables the
//! sink consumes: one [`MatchInfo`] row and the ball-by-ball table spanning
//! all innings. Any accessor failure fails the whole call; there are no
//! partial rows.

use std::path::Path;
use std::sync::Arc;

use crate::error::ParseResult;
use crate::geocode::Geocoder;
use crate::models::{DeliveryTable, MatchInfo, PlayerIdentity};
use crate::parser::{home_team_for, MatchParser};

/// Every table derived from one match.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedMatch {
    pub match_id: String,
    pub info: MatchInfo,
    pub deliveries: DeliveryTable,
    pub players: Vec<PlayerIdentity>,
}

pub struct MatchProcessor {
    parser: MatchParser,
}

impl MatchProcessor {
    pub fn new(parser: MatchParser) -> Self {
        Self { parser }
    }

    /// Load the record at `path` and wrap it.
    pub fn open(path: &Path, geocoder: Arc<dyn Geocoder>) -> ParseResult<Self> {
        Ok(Self::new(MatchParser::open(path, geocoder)?))
    }

    pub fn parser(&self) -> &MatchParser {
        &self.parser
    }

    pub fn match_id(&self) -> &str {
        self.parser.match_id()
    }

    /// One row of match information.
    ///
    /// The city is geocoded once per call and the home team is derived from
    /// that single answer.
    pub fn match_info(&self) -> ParseResult<MatchInfo> {
        let p = &self.parser;
        let team_1 = p.team_1()?;
        let team_2 = p.team_2()?;
        let country = p.country()?;
        let home_team = home_team_for(country.as_deref(), &team_1, &team_2);

        Ok(MatchInfo {
            match_id: p.match_id().to_string(),
            balls_per_over: p.balls_per_over()?,
            dates: p.dates()?,
            venue: p.venue()?,
            city: p.city()?,
            country,
            team_1_players: p.team_1_players()?,
            team_2_players: p.team_2_players()?,
            team_1,
            team_2,
            home_team,
            gender: p.gender()?,
            season: p.season()?,
            team_type: p.team_type()?,
            toss_winner: p.toss_winner()?,
            toss_winner_decision: p.toss_winner_decision()?,
            match_type: p.match_type()?,
            winner: p.winner()?,
            won_by_runs: p.won_by_runs()?,
            won_by_wickets: p.won_by_wickets()?,
            umpire_1: p.umpire_1()?,
            umpire_2: p.umpire_2()?,
            third_umpire: p.third_umpire()?,
            match_referee: p.match_referee()?,
        })
    }

    /// Deliveries of innings 1 through 4, in innings order. Innings that did
    /// not take place contribute no rows.
    pub fn ball_by_ball_table(&self) -> ParseResult<DeliveryTable> {
        let p = &self.parser;
        Ok(DeliveryTable::concat([
            p.first_innings_data()?,
            p.second_innings_data()?,
            p.third_innings_data()?,
            p.fourth_innings_data()?,
        ]))
    }

    pub fn player_id_table(&self) -> ParseResult<Vec<PlayerIdentity>> {
        self.parser.player_id_table()
    }

    /// Build every table for this match.
    pub fn process(&self) -> ParseResult<ProcessedMatch> {
        Ok(ProcessedMatch {
            match_id: self.match_id().to_string(),
            info: self.match_info()?,
            deliveries: self.ball_by_ball_table()?,
            players: self.player_id_table()?,
        })
    }
}
