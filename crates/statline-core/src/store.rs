// Data-access seam for the analytics modules.
//
// The bullpen analyzer and park-factor normalizer only ever read through
// `StatsStore`; `db::Database` is the SQLite-backed implementation and the
// unit tests substitute in-memory fakes.

use std::collections::HashMap;

use anyhow::Result;
use chrono::NaiveDate;
use serde::Serialize;

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// Cumulative pitching counting stats. Used both for a single season row and
/// for the summed bullpen aggregate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PitchingLine {
    pub games: u32,
    pub games_finished: u32,
    pub saves: u32,
    /// Fractional innings (e.g. 62.1 stored as 62.333).
    pub innings_pitched: f64,
    pub hits: u32,
    pub runs: u32,
    pub earned_runs: u32,
    pub home_runs: u32,
    pub walks: u32,
    pub intentional_walks: u32,
    pub strikeouts: u32,
    pub hit_by_pitch: u32,
    pub batters_faced: u32,
}

impl PitchingLine {
    /// Add another line's counting stats into this one. Counts saturate at
    /// `u32::MAX` rather than wrapping.
    pub fn accumulate(&mut self, other: &PitchingLine) {
        self.games = self.games.saturating_add(other.games);
        self.games_finished = self.games_finished.saturating_add(other.games_finished);
        self.saves = self.saves.saturating_add(other.saves);
        self.innings_pitched += other.innings_pitched;
        self.hits = self.hits.saturating_add(other.hits);
        self.runs = self.runs.saturating_add(other.runs);
        self.earned_runs = self.earned_runs.saturating_add(other.earned_runs);
        self.home_runs = self.home_runs.saturating_add(other.home_runs);
        self.walks = self.walks.saturating_add(other.walks);
        self.intentional_walks = self.intentional_walks.saturating_add(other.intentional_walks);
        self.strikeouts = self.strikeouts.saturating_add(other.strikeouts);
        self.hit_by_pitch = self.hit_by_pitch.saturating_add(other.hit_by_pitch);
        self.batters_faced = self.batters_faced.saturating_add(other.batters_faced);
    }
}

/// One pitcher's season with one team.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PitcherSeasonRecord {
    pub player_id: i64,
    pub name: String,
    pub team: String,
    pub season: i32,
    pub games_started: u32,
    pub line: PitchingLine,
}

impl PitcherSeasonRecord {
    pub fn is_starter(&self) -> bool {
        self.games_started >= 1
    }
}

/// A single relief appearance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BullpenUsageRecord {
    pub player_id: i64,
    pub team: String,
    pub season: i32,
    pub date_pitched: NaiveDate,
    pub days_of_rest: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HitterRecord {
    pub player_id: i64,
    pub name: String,
    /// Team abbreviation (e.g. `BOS`).
    pub team: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParkFactorRecord {
    /// Full club name (e.g. `Boston Red Sox`).
    pub team: String,
    pub rating: f64,
}

// ---------------------------------------------------------------------------
// Repository trait
// ---------------------------------------------------------------------------

/// Read-only lookups the analytics modules need from the relational store.
pub trait StatsStore {
    /// Pitcher season rows for `team`/`season` with zero games started.
    fn find_reliever_pitchers(&self, team: &str, season: i32) -> Result<Vec<PitcherSeasonRecord>>;

    /// Usage rows for `team`/`season` whose appearance date equals `date`.
    fn find_usage_by_date(
        &self,
        team: &str,
        season: i32,
        date: NaiveDate,
    ) -> Result<Vec<BullpenUsageRecord>>;

    /// Whether the player has at least one appearance on zero days of rest
    /// for `team`/`season`.
    fn has_zero_rest_appearance(&self, player_id: i64, team: &str, season: i32) -> Result<bool>;

    fn find_hitter(&self, player_id: i64) -> Result<Option<HitterRecord>>;

    /// Rating for one club, keyed by full name.
    fn find_park_factor(&self, team_name: &str) -> Result<Option<f64>>;

    /// Ratings for several clubs at once. Clubs without a stored rating are
    /// absent from the returned map.
    fn find_park_factors(&self, team_names: &[String]) -> Result<HashMap<String, f64>>;
}
