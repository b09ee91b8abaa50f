// SQLite store for pitcher seasons, bullpen usage, hitters, and park factors.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::types::Type;
use rusqlite::{params, params_from_iter, Connection, Row};

use crate::import::ReferenceData;
use crate::store::{
    BullpenUsageRecord, HitterRecord, ParkFactorRecord, PitcherSeasonRecord, PitchingLine,
    StatsStore,
};

/// Dates are stored as ISO `YYYY-MM-DD` text.
const DATE_FORMAT: &str = "%Y-%m-%d";

const PITCHER_COLUMNS: &str = "player_id, name, team, season, games_started, games, games_finished,
     saves, innings_pitched, hits, runs, earned_runs, home_runs, walks, intentional_walks,
     strikeouts, hit_by_pitch, batters_faced";

/// SQLite-backed implementation of [`StatsStore`], plus the write paths used
/// to load reference data.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) a SQLite database at `path` and ensure all tables
    /// exist. Pass `":memory:"` for an ephemeral in-memory database (useful
    /// for tests).
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {path}"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;
             PRAGMA foreign_keys = ON;",
        )
        .context("failed to set database pragmas")?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS pitcher_seasons (
                player_id         INTEGER NOT NULL,
                name              TEXT NOT NULL,
                team              TEXT NOT NULL,
                season            INTEGER NOT NULL,
                games_started     INTEGER NOT NULL DEFAULT 0,
                games             INTEGER NOT NULL DEFAULT 0,
                games_finished    INTEGER NOT NULL DEFAULT 0,
                saves             INTEGER NOT NULL DEFAULT 0,
                innings_pitched   REAL NOT NULL DEFAULT 0,
                hits              INTEGER NOT NULL DEFAULT 0,
                runs              INTEGER NOT NULL DEFAULT 0,
                earned_runs       INTEGER NOT NULL DEFAULT 0,
                home_runs         INTEGER NOT NULL DEFAULT 0,
                walks             INTEGER NOT NULL DEFAULT 0,
                intentional_walks INTEGER NOT NULL DEFAULT 0,
                strikeouts        INTEGER NOT NULL DEFAULT 0,
                hit_by_pitch      INTEGER NOT NULL DEFAULT 0,
                batters_faced     INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (player_id, team, season)
            );

            CREATE TABLE IF NOT EXISTS bullpen_usage (
                player_id    INTEGER NOT NULL,
                team         TEXT NOT NULL,
                season       INTEGER NOT NULL,
                date_pitched TEXT NOT NULL,
                days_of_rest INTEGER NOT NULL,
                PRIMARY KEY (player_id, team, season, date_pitched)
            );

            CREATE TABLE IF NOT EXISTS hitters (
                player_id INTEGER PRIMARY KEY,
                name      TEXT NOT NULL,
                team      TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS park_factors (
                team   TEXT PRIMARY KEY,
                rating REAL NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_pitcher_seasons_team_season
                ON pitcher_seasons(team, season);
            CREATE INDEX IF NOT EXISTS idx_bullpen_usage_team_date
                ON bullpen_usage(team, season, date_pitched);
            ",
        )
        .context("failed to create database schema")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Acquire the database connection.
    ///
    /// Panics if the mutex is poisoned (another thread panicked while
    /// holding the lock). This should never happen in normal operation.
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("database mutex poisoned")
    }

    // ------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------

    /// Insert or replace a pitcher's season line for one team.
    pub fn upsert_pitcher_season(&self, record: &PitcherSeasonRecord) -> Result<()> {
        let conn = self.conn();
        insert_pitcher_season(&conn, record).context("failed to upsert pitcher season")?;
        Ok(())
    }

    /// Record a relief appearance. Re-recording the same player/date replaces
    /// the earlier row.
    pub fn record_usage(&self, usage: &BullpenUsageRecord) -> Result<()> {
        let conn = self.conn();
        insert_usage(&conn, usage).context("failed to record bullpen usage")?;
        Ok(())
    }

    pub fn upsert_hitter(&self, hitter: &HitterRecord) -> Result<()> {
        let conn = self.conn();
        insert_hitter(&conn, hitter).context("failed to upsert hitter")?;
        Ok(())
    }

    pub fn upsert_park_factor(&self, park: &ParkFactorRecord) -> Result<()> {
        let conn = self.conn();
        insert_park_factor(&conn, park).context("failed to upsert park factor")?;
        Ok(())
    }

    /// Load a full reference-data bundle in a single transaction. Either every
    /// row lands or none do.
    pub fn import_reference_data(&self, data: &ReferenceData) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction().context("failed to begin import transaction")?;

        for record in &data.pitchers {
            insert_pitcher_season(&tx, record).context("failed to import pitcher season")?;
        }
        for usage in &data.usage {
            insert_usage(&tx, usage).context("failed to import bullpen usage")?;
        }
        for hitter in &data.hitters {
            insert_hitter(&tx, hitter).context("failed to import hitter")?;
        }
        for park in &data.park_factors {
            insert_park_factor(&tx, park).context("failed to import park factor")?;
        }

        tx.commit().context("failed to commit import")?;
        Ok(())
    }

    /// Row counts per table, in (table, count) pairs.
    pub fn table_counts(&self) -> Result<Vec<(&'static str, usize)>> {
        let conn = self.conn();
        let mut counts = Vec::new();
        for table in ["pitcher_seasons", "bullpen_usage", "hitters", "park_factors"] {
            let count: i64 = conn
                .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
                .with_context(|| format!("failed to count rows in {table}"))?;
            counts.push((table, count as usize));
        }
        Ok(counts)
    }
}

// ----------------------------------------------------------------------
// Row helpers (shared by single writes and the import transaction)
// ----------------------------------------------------------------------

fn insert_pitcher_season(conn: &Connection, r: &PitcherSeasonRecord) -> rusqlite::Result<usize> {
    let l = &r.line;
    conn.execute(
        &format!(
            "INSERT OR REPLACE INTO pitcher_seasons ({PITCHER_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)"
        ),
        params![
            r.player_id,
            r.name,
            r.team,
            r.season,
            r.games_started,
            l.games,
            l.games_finished,
            l.saves,
            l.innings_pitched,
            l.hits,
            l.runs,
            l.earned_runs,
            l.home_runs,
            l.walks,
            l.intentional_walks,
            l.strikeouts,
            l.hit_by_pitch,
            l.batters_faced,
        ],
    )
}

fn insert_usage(conn: &Connection, u: &BullpenUsageRecord) -> rusqlite::Result<usize> {
    conn.execute(
        "INSERT OR REPLACE INTO bullpen_usage (player_id, team, season, date_pitched, days_of_rest)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            u.player_id,
            u.team,
            u.season,
            u.date_pitched.format(DATE_FORMAT).to_string(),
            u.days_of_rest,
        ],
    )
}

fn insert_hitter(conn: &Connection, h: &HitterRecord) -> rusqlite::Result<usize> {
    conn.execute(
        "INSERT INTO hitters (player_id, name, team) VALUES (?1, ?2, ?3)
         ON CONFLICT(player_id) DO UPDATE SET name = excluded.name, team = excluded.team",
        params![h.player_id, h.name, h.team],
    )
}

fn insert_park_factor(conn: &Connection, p: &ParkFactorRecord) -> rusqlite::Result<usize> {
    conn.execute(
        "INSERT OR REPLACE INTO park_factors (team, rating) VALUES (?1, ?2)",
        params![p.team, p.rating],
    )
}

fn pitcher_from_row(row: &Row<'_>) -> rusqlite::Result<PitcherSeasonRecord> {
    Ok(PitcherSeasonRecord {
        player_id: row.get(0)?,
        name: row.get(1)?,
        team: row.get(2)?,
        season: row.get(3)?,
        games_started: row.get(4)?,
        line: PitchingLine {
            games: row.get(5)?,
            games_finished: row.get(6)?,
            saves: row.get(7)?,
            innings_pitched: row.get(8)?,
            hits: row.get(9)?,
            runs: row.get(10)?,
            earned_runs: row.get(11)?,
            home_runs: row.get(12)?,
            walks: row.get(13)?,
            intentional_walks: row.get(14)?,
            strikeouts: row.get(15)?,
            hit_by_pitch: row.get(16)?,
            batters_faced: row.get(17)?,
        },
    })
}

fn date_from_row(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDate> {
    let text: String = row.get(idx)?;
    NaiveDate::parse_from_str(&text, DATE_FORMAT)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

// ----------------------------------------------------------------------
// Reads
// ----------------------------------------------------------------------

impl StatsStore for Database {
    fn find_reliever_pitchers(&self, team: &str, season: i32) -> Result<Vec<PitcherSeasonRecord>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {PITCHER_COLUMNS} FROM pitcher_seasons
                 WHERE team = ?1 AND season = ?2 AND games_started < 1
                 ORDER BY player_id"
            ))
            .context("failed to prepare reliever query")?;

        let relievers = stmt
            .query_map(params![team, season], pitcher_from_row)
            .context("failed to query relievers")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map reliever rows")?;

        Ok(relievers)
    }

    fn find_usage_by_date(
        &self,
        team: &str,
        season: i32,
        date: NaiveDate,
    ) -> Result<Vec<BullpenUsageRecord>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT player_id, team, season, date_pitched, days_of_rest
                 FROM bullpen_usage
                 WHERE team = ?1 AND season = ?2 AND date_pitched = ?3
                 ORDER BY player_id",
            )
            .context("failed to prepare usage query")?;

        let usage = stmt
            .query_map(
                params![team, season, date.format(DATE_FORMAT).to_string()],
                |row| {
                    Ok(BullpenUsageRecord {
                        player_id: row.get(0)?,
                        team: row.get(1)?,
                        season: row.get(2)?,
                        date_pitched: date_from_row(row, 3)?,
                        days_of_rest: row.get(4)?,
                    })
                },
            )
            .context("failed to query bullpen usage")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map bullpen usage rows")?;

        Ok(usage)
    }

    fn has_zero_rest_appearance(&self, player_id: i64, team: &str, season: i32) -> Result<bool> {
        let conn = self.conn();
        let exists: bool = conn
            .query_row(
                "SELECT EXISTS(
                    SELECT 1 FROM bullpen_usage
                    WHERE player_id = ?1 AND team = ?2 AND season = ?3 AND days_of_rest = 0
                 )",
                params![player_id, team, season],
                |row| row.get(0),
            )
            .context("failed to check zero-rest appearances")?;
        Ok(exists)
    }

    fn find_hitter(&self, player_id: i64) -> Result<Option<HitterRecord>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare("SELECT player_id, name, team FROM hitters WHERE player_id = ?1")
            .context("failed to prepare hitter query")?;

        let mut rows = stmt
            .query_map(params![player_id], |row| {
                Ok(HitterRecord {
                    player_id: row.get(0)?,
                    name: row.get(1)?,
                    team: row.get(2)?,
                })
            })
            .context("failed to query hitter")?;

        match rows.next() {
            Some(row_result) => Ok(Some(row_result.context("failed to read hitter row")?)),
            None => Ok(None),
        }
    }

    fn find_park_factor(&self, team_name: &str) -> Result<Option<f64>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare("SELECT rating FROM park_factors WHERE team = ?1")
            .context("failed to prepare park factor query")?;

        let mut rows = stmt
            .query_map(params![team_name], |row| row.get::<_, f64>(0))
            .context("failed to query park factor")?;

        match rows.next() {
            Some(row_result) => Ok(Some(row_result.context("failed to read park factor row")?)),
            None => Ok(None),
        }
    }

    fn find_park_factors(&self, team_names: &[String]) -> Result<HashMap<String, f64>> {
        if team_names.is_empty() {
            return Ok(HashMap::new());
        }

        let placeholders = (1..=team_names.len())
            .map(|i| format!("?{i}"))
            .collect::<Vec<_>>()
            .join(", ");

        let conn = self.conn();
        let mut stmt = conn
            .prepare(&format!(
                "SELECT team, rating FROM park_factors WHERE team IN ({placeholders})"
            ))
            .context("failed to prepare batch park factor query")?;

        let ratings = stmt
            .query_map(params_from_iter(team_names.iter()), |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
            })
            .context("failed to query park factors")?
            .collect::<std::result::Result<HashMap<_, _>, _>>()
            .context("failed to map park factor rows")?;

        Ok(ratings)
    }
}
