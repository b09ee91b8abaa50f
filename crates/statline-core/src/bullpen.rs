// Bullpen availability and aggregate rate stats.
//
// Given a team, season, and date, drop relievers who pitched the day before
// and have never shown they can pitch on zero rest, then sum the remaining
// relievers' counting stats into opponent rate stats (BA/OBP/SLG/OPS).

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

use crate::error::{Result, StatsError};
use crate::store::{PitcherSeasonRecord, PitchingLine, StatsStore};
use crate::teams::normalize_abbrev;

/// Share of non-HR hits estimated as singles, doubles, and triples.
const SINGLE_SHARE: f64 = 0.70;
const DOUBLE_SHARE: f64 = 0.20;
const TRIPLE_SHARE: f64 = 0.02;

/// OBP multiplier for the inflated OPS variant.
const INFLATED_OBP_WEIGHT: f64 = 1.6;

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// Opponent rate stats against a group of pitchers.
///
/// Zero denominators are not guarded: an empty or degenerate aggregate yields
/// NaN or infinite values. Use [`RateStats::is_finite`] to detect that.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RateStats {
    pub ba: f64,
    pub obp: f64,
    pub slg: f64,
    pub ops: f64,
    /// `1.6 * OBP + SLG`.
    pub inflated_ops: f64,
}

impl RateStats {
    pub fn is_finite(&self) -> bool {
        [self.ba, self.obp, self.slg, self.ops, self.inflated_ops]
            .iter()
            .all(|v| v.is_finite())
    }
}

/// Estimated hit-type split for a hit total. Each share is rounded
/// independently, so the parts need not add back up to the hit count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HitBreakdown {
    pub singles: i64,
    pub doubles: i64,
    pub triples: i64,
    pub home_runs: i64,
}

impl HitBreakdown {
    pub fn total_bases(&self) -> i64 {
        self.singles + 2 * self.doubles + 3 * self.triples + 4 * self.home_runs
    }
}

/// Aggregate for the relievers available on a given date.
#[derive(Debug, Clone, Serialize)]
pub struct BullpenStats {
    pub team: String,
    pub season: i32,
    pub as_of: NaiveDate,
    pub available_pitchers: usize,
    /// Relievers used the previous day without a zero-rest history, sorted.
    pub unavailable_pitchers: Vec<i64>,
    pub totals: PitchingLine,
    pub at_bats: i64,
    pub hits_breakdown: HitBreakdown,
    pub rates: RateStats,
}

// ---------------------------------------------------------------------------
// Derivations
// ---------------------------------------------------------------------------

/// Every rate stat division goes through here. Zero denominators propagate
/// as non-finite values rather than erroring.
fn rate(numerator: f64, denominator: f64) -> f64 {
    numerator / denominator
}

/// At-bats against: batters faced less walks and hit batters. Signed so a
/// malformed row cannot wrap.
pub fn at_bats(line: &PitchingLine) -> i64 {
    i64::from(line.batters_faced) - i64::from(line.walks) - i64::from(line.hit_by_pitch)
}

/// Split non-HR hits 70/20/2 into singles/doubles/triples. Rounding is
/// `f64::round` (half away from zero).
pub fn estimate_hit_breakdown(hits: u32, home_runs: u32) -> HitBreakdown {
    let non_hr = (i64::from(hits) - i64::from(home_runs)) as f64;
    HitBreakdown {
        singles: (SINGLE_SHARE * non_hr).round() as i64,
        doubles: (DOUBLE_SHARE * non_hr).round() as i64,
        triples: (TRIPLE_SHARE * non_hr).round() as i64,
        home_runs: i64::from(home_runs),
    }
}

/// Derive BA, OBP, SLG, OPS, and inflated OPS from summed counting stats.
pub fn derive_rates(line: &PitchingLine) -> RateStats {
    let ab = at_bats(line) as f64;
    let hits = f64::from(line.hits);
    let on_base = f64::from(line.hits) + f64::from(line.walks) + f64::from(line.hit_by_pitch);
    let total_bases = estimate_hit_breakdown(line.hits, line.home_runs).total_bases() as f64;

    let ba = rate(hits, ab);
    let obp = rate(on_base, f64::from(line.batters_faced));
    let slg = rate(total_bases, ab);

    RateStats {
        ba,
        obp,
        slg,
        ops: obp + slg,
        inflated_ops: INFLATED_OBP_WEIGHT * obp + slg,
    }
}

/// Sum the counting stats of a set of pitcher seasons.
pub fn sum_lines<'a>(pitchers: impl IntoIterator<Item = &'a PitcherSeasonRecord>) -> PitchingLine {
    pitchers
        .into_iter()
        .fold(PitchingLine::default(), |mut acc, p| {
            acc.accumulate(&p.line);
            acc
        })
}

// ---------------------------------------------------------------------------
// Availability
// ---------------------------------------------------------------------------

/// Relievers who pitched on the day before `as_of` and have no zero-rest
/// appearance on record for `team`/`season`.
///
/// This is a historical capability check: a reliever who has never pitched
/// on zero rest is always held out the day after pitching.
pub fn unavailable_pitchers<S: StatsStore + ?Sized>(
    store: &S,
    team: &str,
    season: i32,
    as_of: NaiveDate,
) -> Result<BTreeSet<i64>> {
    let team = normalize_abbrev(team);
    let previous_day = as_of
        .pred_opt()
        .ok_or_else(|| StatsError::InvalidInput(format!("no day precedes {as_of}")))?;

    let recently_used: BTreeSet<i64> = store
        .find_usage_by_date(&team, season, previous_day)?
        .into_iter()
        .map(|u| u.player_id)
        .collect();

    let mut unavailable = BTreeSet::new();
    for player_id in recently_used {
        if !store.has_zero_rest_appearance(player_id, &team, season)? {
            unavailable.insert(player_id);
        }
    }
    Ok(unavailable)
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Aggregate the bullpen available to `team` on `as_of`.
///
/// The abbreviation is matched like everywhere else in the crate, ignoring
/// case and surrounding whitespace. A team with no reliever rows yields zero
/// totals and NaN rates, not an error.
pub fn analyze<S: StatsStore + ?Sized>(
    store: &S,
    season: i32,
    team: &str,
    as_of: NaiveDate,
) -> Result<BullpenStats> {
    let team = normalize_abbrev(team);
    let relievers = store.find_reliever_pitchers(&team, season)?;
    let unavailable = unavailable_pitchers(store, &team, season, as_of)?;

    let available: Vec<&PitcherSeasonRecord> = relievers
        .iter()
        .filter(|p| !unavailable.contains(&p.player_id))
        .collect();

    let totals = sum_lines(available.iter().copied());
    let rates = derive_rates(&totals);

    debug!(
        team = %team,
        season,
        %as_of,
        relievers = relievers.len(),
        available = available.len(),
        unavailable = ?unavailable,
        ops = rates.ops,
        "bullpen aggregate computed"
    );

    Ok(BullpenStats {
        team,
        season,
        as_of,
        available_pitchers: available.len(),
        unavailable_pitchers: unavailable.into_iter().collect(),
        totals,
        at_bats: at_bats(&totals),
        hits_breakdown: estimate_hit_breakdown(totals.hits, totals.home_runs),
        rates,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{BullpenUsageRecord, HitterRecord};
    use std::collections::HashMap;

    /// In-memory store holding just the bullpen tables.
    #[derive(Default)]
    struct FakeStore {
        pitchers: Vec<PitcherSeasonRecord>,
        usage: Vec<BullpenUsageRecord>,
    }

    impl StatsStore for FakeStore {
        fn find_reliever_pitchers(
            &self,
            team: &str,
            season: i32,
        ) -> anyhow::Result<Vec<PitcherSeasonRecord>> {
            Ok(self
                .pitchers
                .iter()
                .filter(|p| p.team == team && p.season == season && !p.is_starter())
                .cloned()
                .collect())
        }

        fn find_usage_by_date(
            &self,
            team: &str,
            season: i32,
            date: NaiveDate,
        ) -> anyhow::Result<Vec<BullpenUsageRecord>> {
            Ok(self
                .usage
                .iter()
                .filter(|u| u.team == team && u.season == season && u.date_pitched == date)
                .cloned()
                .collect())
        }

        fn has_zero_rest_appearance(
            &self,
            player_id: i64,
            team: &str,
            season: i32,
        ) -> anyhow::Result<bool> {
            Ok(self.usage.iter().any(|u| {
                u.player_id == player_id && u.team == team && u.season == season && u.days_of_rest == 0
            }))
        }

        fn find_hitter(&self, _player_id: i64) -> anyhow::Result<Option<HitterRecord>> {
            Ok(None)
        }

        fn find_park_factor(&self, _team_name: &str) -> anyhow::Result<Option<f64>> {
            Ok(None)
        }

        fn find_park_factors(&self, _team_names: &[String]) -> anyhow::Result<HashMap<String, f64>> {
            Ok(HashMap::new())
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn reliever(player_id: i64, hits: u32, home_runs: u32, walks: u32, batters_faced: u32) -> PitcherSeasonRecord {
        PitcherSeasonRecord {
            player_id,
            name: format!("Reliever {player_id}"),
            team: "BOS".into(),
            season: 2024,
            games_started: 0,
            line: PitchingLine {
                games: 30,
                innings_pitched: 30.0,
                hits,
                home_runs,
                walks,
                hit_by_pitch: 1,
                batters_faced,
                strikeouts: 30,
                ..Default::default()
            },
        }
    }

    fn usage(player_id: i64, date_pitched: NaiveDate, days_of_rest: u32) -> BullpenUsageRecord {
        BullpenUsageRecord {
            player_id,
            team: "BOS".into(),
            season: 2024,
            date_pitched,
            days_of_rest,
        }
    }

    // -- Rate derivations --

    #[test]
    fn derive_rates_matches_formulas() {
        let line = PitchingLine {
            hits: 50,
            home_runs: 10,
            walks: 20,
            hit_by_pitch: 5,
            batters_faced: 225,
            ..Default::default()
        };
        let rates = derive_rates(&line);

        // AB = 225 - 20 - 5 = 200; nonHR = 40 -> 28/8/1 (0.8 rounds to 1).
        let tb = (28 + 2 * 8 + 3 + 4 * 10) as f64;
        assert_eq!(rates.ba, 50.0 / 200.0);
        assert_eq!(rates.obp, 75.0 / 225.0);
        assert_eq!(rates.slg, tb / 200.0);
        assert_eq!(rates.ops, rates.obp + rates.slg);
        assert_eq!(rates.inflated_ops, 1.6 * rates.obp + rates.slg);
        assert!(rates.is_finite());
    }

    #[test]
    fn hit_breakdown_uses_independent_rounding() {
        // nonHR = 9: 6.3 -> 6, 1.8 -> 2, 0.18 -> 0. Parts undershoot the 9 hits.
        let b = estimate_hit_breakdown(13, 4);
        assert_eq!(b, HitBreakdown { singles: 6, doubles: 2, triples: 0, home_runs: 4 });
        assert_eq!(b.singles + b.doubles + b.triples, 8);
        assert_eq!(b.total_bases(), 6 + 2 * 2 + 4 * 4);

        // nonHR = 38: 26.6 -> 27, 7.6 -> 8, 0.76 -> 1.
        let b = estimate_hit_breakdown(42, 4);
        assert_eq!(b, HitBreakdown { singles: 27, doubles: 8, triples: 1, home_runs: 4 });
        assert_eq!(b.total_bases(), 27 + 2 * 8 + 3 + 4 * 4);
    }

    #[test]
    fn zero_denominators_propagate_non_finite() {
        let rates = derive_rates(&PitchingLine::default());
        assert!(rates.ba.is_nan());
        assert!(rates.obp.is_nan());
        assert!(rates.slg.is_nan());
        assert!(!rates.is_finite());

        // Hits with no at-bats: infinite BA rather than NaN.
        let line = PitchingLine {
            hits: 1,
            walks: 2,
            batters_faced: 2,
            ..Default::default()
        };
        let rates = derive_rates(&line);
        assert!(rates.ba.is_infinite());
        assert!(rates.obp.is_finite());
    }

    #[test]
    fn at_bats_does_not_wrap_on_bad_rows() {
        let line = PitchingLine {
            walks: 3,
            batters_faced: 1,
            ..Default::default()
        };
        assert_eq!(at_bats(&line), -2);
    }

    // -- Availability --

    #[test]
    fn previous_day_pitcher_without_zero_rest_history_is_excluded() {
        let today = date(2024, 6, 15);
        let store = FakeStore {
            pitchers: vec![reliever(1, 20, 2, 8, 100), reliever(2, 25, 3, 10, 120)],
            usage: vec![usage(1, date(2024, 6, 14), 2)],
        };

        let stats = analyze(&store, 2024, "BOS", today).unwrap();
        assert_eq!(stats.available_pitchers, 1);
        assert_eq!(stats.unavailable_pitchers, vec![1]);
        assert_eq!(stats.totals.hits, 25);
    }

    #[test]
    fn previous_day_pitcher_with_zero_rest_history_is_included() {
        let today = date(2024, 6, 15);
        let store = FakeStore {
            pitchers: vec![reliever(1, 20, 2, 8, 100), reliever(2, 25, 3, 10, 120)],
            usage: vec![
                usage(1, date(2024, 5, 2), 0),
                usage(1, date(2024, 6, 14), 3),
            ],
        };

        let stats = analyze(&store, 2024, "BOS", today).unwrap();
        assert_eq!(stats.available_pitchers, 2);
        assert!(stats.unavailable_pitchers.is_empty());
        assert_eq!(stats.totals.hits, 45);
    }

    #[test]
    fn pitcher_not_used_yesterday_is_always_included() {
        let today = date(2024, 6, 15);
        let store = FakeStore {
            pitchers: vec![reliever(1, 20, 2, 8, 100)],
            // Pitched two days ago with no zero-rest history.
            usage: vec![usage(1, date(2024, 6, 13), 4)],
        };

        let stats = analyze(&store, 2024, "BOS", today).unwrap();
        assert_eq!(stats.available_pitchers, 1);
    }

    #[test]
    fn duplicate_usage_rows_count_once() {
        let yesterday = date(2024, 6, 14);
        let store = FakeStore {
            pitchers: vec![reliever(1, 20, 2, 8, 100)],
            usage: vec![usage(1, yesterday, 1), usage(1, yesterday, 1)],
        };

        let unavailable = unavailable_pitchers(&store, "BOS", 2024, date(2024, 6, 15)).unwrap();
        assert_eq!(unavailable.into_iter().collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn starters_never_enter_the_aggregate() {
        let mut starter = reliever(9, 90, 20, 30, 500);
        starter.games_started = 28;
        let store = FakeStore {
            pitchers: vec![starter, reliever(1, 20, 2, 8, 100)],
            usage: vec![],
        };

        let stats = analyze(&store, 2024, "BOS", date(2024, 6, 15)).unwrap();
        assert_eq!(stats.available_pitchers, 1);
        assert_eq!(stats.totals.hits, 20);
    }

    #[test]
    fn team_match_ignores_case_and_whitespace() {
        let store = FakeStore {
            pitchers: vec![reliever(1, 20, 2, 8, 100), reliever(2, 25, 3, 10, 120)],
            usage: vec![usage(1, date(2024, 6, 14), 2)],
        };

        let upper = analyze(&store, 2024, "BOS", date(2024, 6, 15)).unwrap();
        let lower = analyze(&store, 2024, " bos ", date(2024, 6, 15)).unwrap();
        assert_eq!(lower.team, "BOS");
        assert_eq!(lower.available_pitchers, upper.available_pitchers);
        assert_eq!(lower.unavailable_pitchers, vec![1]);
        assert_eq!(lower.totals, upper.totals);
    }

    // -- Aggregate --

    #[test]
    fn aggregate_rates_are_consistent() {
        let store = FakeStore {
            pitchers: vec![reliever(1, 20, 2, 8, 100), reliever(2, 25, 3, 10, 120)],
            usage: vec![],
        };

        let stats = analyze(&store, 2024, "BOS", date(2024, 6, 15)).unwrap();
        // BF 220, BB 18, HBP 2 -> AB 200.
        assert_eq!(stats.at_bats, 200);
        assert_eq!(stats.rates.ba, 45.0 / 200.0);
        assert_eq!(stats.rates.obp, 65.0 / 220.0);
        assert_eq!(stats.rates.ops, stats.rates.obp + stats.rates.slg);
        assert_eq!(stats.rates, derive_rates(&stats.totals));
        assert!(stats.rates.is_finite());
    }

    #[test]
    fn oversized_counts_saturate_instead_of_overflowing() {
        let store = FakeStore {
            pitchers: vec![
                reliever(1, 20, 2, 8, 3_000_000_000),
                reliever(2, 25, 3, 10, 3_000_000_000),
            ],
            usage: vec![],
        };

        let stats = analyze(&store, 2024, "BOS", date(2024, 6, 15)).unwrap();
        assert_eq!(stats.totals.batters_faced, u32::MAX);
        assert_eq!(stats.totals.hits, 45);
    }

    #[test]
    fn empty_bullpen_is_not_an_error() {
        let store = FakeStore::default();
        let stats = analyze(&store, 2024, "BOS", date(2024, 6, 15)).unwrap();
        assert_eq!(stats.available_pitchers, 0);
        assert_eq!(stats.totals, PitchingLine::default());
        assert!(stats.rates.ops.is_nan());
    }

    #[test]
    fn earliest_representable_date_is_invalid_input() {
        let store = FakeStore::default();
        let err = analyze(&store, 2024, "BOS", NaiveDate::MIN).unwrap_err();
        assert!(matches!(err, StatsError::InvalidInput(_)));
    }
}
