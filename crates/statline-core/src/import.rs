// Reference-data CSV loading.
//
// Four header-based CSV files feed the store: pitcher season lines, bullpen
// appearances, hitters, and park factors. Malformed rows are skipped with a
// warning rather than failing the whole import.

use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use serde::Deserialize;
use tracing::warn;

use crate::config::DataPaths;
use crate::store::{
    BullpenUsageRecord, HitterRecord, ParkFactorRecord, PitcherSeasonRecord, PitchingLine,
};
use crate::teams::normalize_abbrev;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Everything loaded from one set of CSV files, ready for
/// `Database::import_reference_data`.
#[derive(Debug, Clone, Default)]
pub struct ReferenceData {
    pub pitchers: Vec<PitcherSeasonRecord>,
    pub usage: Vec<BullpenUsageRecord>,
    pub hitters: Vec<HitterRecord>,
    pub park_factors: Vec<ParkFactorRecord>,
}

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("failed to read file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv { path: String, source: csv::Error },
}

// ---------------------------------------------------------------------------
// Raw CSV serde structs (private)
// ---------------------------------------------------------------------------

/// Season pitching line. Column names follow the usual stat abbreviations;
/// optional columns default to zero.
#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct RawPitcherSeason {
    #[serde(alias = "player_id")]
    PlayerID: i64,
    Name: String,
    Team: String,
    Season: i32,
    G: u32,
    #[serde(default)]
    GS: u32,
    #[serde(default)]
    GF: u32,
    #[serde(default)]
    SV: u32,
    IP: f64,
    H: u32,
    #[serde(default)]
    R: u32,
    #[serde(default)]
    ER: u32,
    HR: u32,
    BB: u32,
    #[serde(default)]
    IBB: u32,
    #[serde(alias = "K")]
    SO: u32,
    #[serde(default)]
    HBP: u32,
    #[serde(alias = "TBF")]
    BF: u32,
}

#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct RawUsage {
    #[serde(alias = "player_id")]
    PlayerID: i64,
    Team: String,
    Season: i32,
    Date: NaiveDate,
    #[serde(alias = "DaysOfRest")]
    DaysRest: u32,
}

#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct RawHitter {
    #[serde(alias = "player_id")]
    PlayerID: i64,
    Name: String,
    Team: String,
}

#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct RawParkFactor {
    Team: String,
    #[serde(alias = "PF")]
    Rating: f64,
}

// ---------------------------------------------------------------------------
// Reader-based loaders (private, enable testing without temp files)
// ---------------------------------------------------------------------------

fn load_pitchers_from_reader<R: Read>(rdr: R) -> Result<Vec<PitcherSeasonRecord>, csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);
    let mut pitchers = Vec::new();
    for result in reader.deserialize::<RawPitcherSeason>() {
        match result {
            Ok(raw) => {
                if !raw.IP.is_finite() || raw.IP < 0.0 {
                    warn!("skipping pitcher '{}': invalid IP value", raw.Name.trim());
                    continue;
                }
                pitchers.push(PitcherSeasonRecord {
                    player_id: raw.PlayerID,
                    name: raw.Name.trim().to_string(),
                    team: normalize_abbrev(&raw.Team),
                    season: raw.Season,
                    games_started: raw.GS,
                    line: PitchingLine {
                        games: raw.G,
                        games_finished: raw.GF,
                        saves: raw.SV,
                        innings_pitched: raw.IP,
                        hits: raw.H,
                        runs: raw.R,
                        earned_runs: raw.ER,
                        home_runs: raw.HR,
                        walks: raw.BB,
                        intentional_walks: raw.IBB,
                        strikeouts: raw.SO,
                        hit_by_pitch: raw.HBP,
                        batters_faced: raw.BF,
                    },
                });
            }
            Err(e) => {
                warn!("skipping malformed pitcher row: {}", e);
            }
        }
    }
    Ok(pitchers)
}

fn load_usage_from_reader<R: Read>(rdr: R) -> Result<Vec<BullpenUsageRecord>, csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);
    let mut usage = Vec::new();
    for result in reader.deserialize::<RawUsage>() {
        match result {
            Ok(raw) => usage.push(BullpenUsageRecord {
                player_id: raw.PlayerID,
                team: normalize_abbrev(&raw.Team),
                season: raw.Season,
                date_pitched: raw.Date,
                days_of_rest: raw.DaysRest,
            }),
            Err(e) => {
                warn!("skipping malformed bullpen usage row: {}", e);
            }
        }
    }
    Ok(usage)
}

fn load_hitters_from_reader<R: Read>(rdr: R) -> Result<Vec<HitterRecord>, csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);
    let mut hitters = Vec::new();
    for result in reader.deserialize::<RawHitter>() {
        match result {
            Ok(raw) => hitters.push(HitterRecord {
                player_id: raw.PlayerID,
                name: raw.Name.trim().to_string(),
                team: normalize_abbrev(&raw.Team),
            }),
            Err(e) => {
                warn!("skipping malformed hitter row: {}", e);
            }
        }
    }
    Ok(hitters)
}

fn load_park_factors_from_reader<R: Read>(rdr: R) -> Result<Vec<ParkFactorRecord>, csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);
    let mut parks: Vec<ParkFactorRecord> = Vec::new();
    for result in reader.deserialize::<RawParkFactor>() {
        match result {
            Ok(raw) => {
                let team = raw.Team.trim().to_string();
                if !raw.Rating.is_finite() {
                    warn!("skipping park factor for '{}': non-finite rating", team);
                    continue;
                }
                if let Some(existing) = parks.iter_mut().find(|p| p.team == team) {
                    warn!("duplicate park factor for '{}', using latest value", team);
                    existing.rating = raw.Rating;
                } else {
                    parks.push(ParkFactorRecord {
                        team,
                        rating: raw.Rating,
                    });
                }
            }
            Err(e) => {
                warn!("skipping malformed park factor row: {}", e);
            }
        }
    }
    Ok(parks)
}

// ---------------------------------------------------------------------------
// Public path-based loaders
// ---------------------------------------------------------------------------

fn open(path: &Path) -> Result<std::fs::File, ImportError> {
    std::fs::File::open(path).map_err(|e| ImportError::Io {
        path: path.display().to_string(),
        source: e,
    })
}

fn csv_error(path: &Path) -> impl FnOnce(csv::Error) -> ImportError + '_ {
    move |e| ImportError::Csv {
        path: path.display().to_string(),
        source: e,
    }
}

/// Load pitcher season lines from a CSV file.
pub fn load_pitchers(path: &Path) -> Result<Vec<PitcherSeasonRecord>, ImportError> {
    load_pitchers_from_reader(open(path)?).map_err(csv_error(path))
}

/// Load bullpen appearances from a CSV file.
pub fn load_usage(path: &Path) -> Result<Vec<BullpenUsageRecord>, ImportError> {
    load_usage_from_reader(open(path)?).map_err(csv_error(path))
}

pub fn load_hitters(path: &Path) -> Result<Vec<HitterRecord>, ImportError> {
    load_hitters_from_reader(open(path)?).map_err(csv_error(path))
}

/// Load park factors keyed by full club name. Later duplicates win.
pub fn load_park_factors(path: &Path) -> Result<Vec<ParkFactorRecord>, ImportError> {
    load_park_factors_from_reader(open(path)?).map_err(csv_error(path))
}

/// Load all four reference files from the configured paths.
pub fn load_all_from_paths(paths: &DataPaths) -> Result<ReferenceData, ImportError> {
    let data = ReferenceData {
        pitchers: load_pitchers(Path::new(&paths.pitchers))?,
        usage: load_usage(Path::new(&paths.bullpen_usage))?,
        hitters: load_hitters(Path::new(&paths.hitters))?,
        park_factors: load_park_factors(Path::new(&paths.park_factors))?,
    };

    if data.park_factors.is_empty() {
        warn!("park factor CSV {} produced zero valid rows", paths.park_factors);
    }

    Ok(data)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
