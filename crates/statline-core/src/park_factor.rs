// Park-factor normalization for hitters.
//
// Blends a hitter's home park rating with the average rating of the parks
// they visit, weighted by games played at each, and scales arbitrary values
// by a club's rating (100 = neutral).

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::debug;

use crate::error::{Result, StatsError};
use crate::store::StatsStore;
use crate::teams::TeamDirectory;

/// Neutral park rating.
const NEUTRAL_RATING: f64 = 100.0;

/// Weighted park-factor blend for one hitter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NormalizeResult {
    /// Mean rating over the opponent list; 0.0 when there are no opponents.
    pub avg_away_park_factor: f64,
    pub home_park_factor: f64,
    pub total_park_factor: f64,
    pub home_weight: f64,
    pub away_weight: f64,
}

/// A stored rating of exactly zero is indistinguishable from "no rating"
/// and is treated as missing.
pub fn is_missing_rating(rating: f64) -> bool {
    rating == 0.0
}

/// Resolve an abbreviation, failing with `UnmappedTeam`.
fn resolve<'t>(teams: &'t TeamDirectory, abbrev: &str) -> Result<&'t str> {
    teams
        .full_name(abbrev)
        .ok_or_else(|| StatsError::unmapped(abbrev))
}

/// Fetch one club's rating, failing with `MissingParkFactor` when the store
/// has none or holds zero.
fn rating_for<S: StatsStore + ?Sized>(store: &S, team_name: &str) -> Result<f64> {
    match store.find_park_factor(team_name)? {
        Some(rating) if !is_missing_rating(rating) => Ok(rating),
        _ => Err(StatsError::missing_park_factor(team_name)),
    }
}

/// Average rating across the opponent list. Each entry is one away game, so
/// a repeated opponent is weighted by its number of appearances.
fn average_away_rating<S: StatsStore + ?Sized>(
    store: &S,
    teams: &TeamDirectory,
    opponents: &[String],
) -> Result<f64> {
    let mut unmapped: Vec<String> = Vec::new();
    let mut resolved: Vec<&str> = Vec::with_capacity(opponents.len());
    for abbrev in opponents {
        match teams.full_name(abbrev) {
            Some(name) => resolved.push(name),
            None => {
                if !unmapped.contains(abbrev) {
                    unmapped.push(abbrev.clone());
                }
            }
        }
    }
    if !unmapped.is_empty() {
        return Err(StatsError::UnmappedTeam { abbrevs: unmapped });
    }

    let distinct: Vec<String> = resolved
        .iter()
        .copied()
        .collect::<BTreeSet<&str>>()
        .into_iter()
        .map(str::to_string)
        .collect();
    let ratings = store.find_park_factors(&distinct)?;

    let mut sum = 0.0;
    for name in &resolved {
        match ratings.get(*name) {
            Some(&rating) if !is_missing_rating(rating) => sum += rating,
            _ => return Err(StatsError::missing_park_factor(*name)),
        }
    }
    Ok(sum / resolved.len() as f64)
}

/// Blend the hitter's home park factor with the average of the opponents'
/// park factors, weighted by `home_games` versus `opponents.len()`.
///
/// Fails with `NotFound` for an unknown hitter, `UnmappedTeam` for any
/// abbreviation without a full-name mapping, `MissingParkFactor` for a club
/// with no (or a zero) rating, and `InvalidInput` when there are no games at
/// all.
pub fn normalize_park_factors<S: StatsStore + ?Sized>(
    store: &S,
    teams: &TeamDirectory,
    hitter_id: i64,
    opponents: &[String],
    home_games: u32,
) -> Result<NormalizeResult> {
    let hitter = store
        .find_hitter(hitter_id)?
        .ok_or(StatsError::NotFound { hitter_id })?;

    let home_team = resolve(teams, &hitter.team)?;
    let home_park_factor = rating_for(store, home_team)?;

    let avg_away_park_factor = if opponents.is_empty() {
        0.0
    } else {
        average_away_rating(store, teams, opponents)?
    };

    let away_games = opponents.len() as f64;
    let total_games = f64::from(home_games) + away_games;
    if total_games == 0.0 {
        return Err(StatsError::InvalidInput(
            "home games and opponent list are both empty".into(),
        ));
    }
    let home_weight = f64::from(home_games) / total_games;
    let away_weight = away_games / total_games;
    let total_park_factor = home_weight * home_park_factor + away_weight * avg_away_park_factor;

    debug!(
        hitter_id,
        home_team,
        home_park_factor,
        avg_away_park_factor,
        total_park_factor,
        "park factors normalized"
    );

    Ok(NormalizeResult {
        avg_away_park_factor,
        home_park_factor,
        total_park_factor,
        home_weight,
        away_weight,
    })
}

/// Scale `value` by the club's park factor (`value * rating / 100`).
pub fn adjust_by_park_factor<S: StatsStore + ?Sized>(
    store: &S,
    teams: &TeamDirectory,
    value: f64,
    team_abbrev: &str,
) -> Result<f64> {
    let team_name = resolve(teams, team_abbrev)?;
    let rating = rating_for(store, team_name)?;
    let adjusted = value * (rating / NEUTRAL_RATING);
    debug!(team = team_name, rating, value, adjusted, "park factor adjustment");
    Ok(adjusted)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
