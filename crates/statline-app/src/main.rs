// statline entry point.
//
// Startup sequence:
// 1. Parse command-line arguments
// 2. Load config (copying defaults/ into config/ on first run)
// 3. Initialize tracing (stderr, so stdout carries only JSON)
// 4. Open database
// 5. Run the requested command and print its result as JSON

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use statline_core::bullpen;
use statline_core::config;
use statline_core::db::Database;
use statline_core::import;
use statline_core::park_factor;
use statline_core::teams::TeamDirectory;

#[derive(Parser)]
#[command(name = "statline")]
#[command(about = "Bullpen availability and park-factor analytics")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the reference CSVs named in config/statline.toml into the database
    Import,

    /// Aggregate the relievers available to a team on a given date
    Bullpen {
        /// Team abbreviation (e.g. BOS)
        #[arg(short, long)]
        team: String,

        #[arg(short, long)]
        season: i32,

        /// Game date, YYYY-MM-DD
        #[arg(short, long)]
        date: NaiveDate,
    },

    /// Blend a hitter's home and road park factors
    ParkFactor {
        #[arg(long)]
        hitter: i64,

        #[arg(long)]
        home_games: u32,

        /// Opponent abbreviation, once per road game
        #[arg(long = "opponent")]
        opponents: Vec<String>,
    },

    /// Scale a value by a team's park factor
    Adjust {
        /// Team abbreviation (e.g. BOS)
        #[arg(short, long)]
        team: String,

        #[arg(short, long, allow_negative_numbers = true)]
        value: f64,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = config::load_config().context("failed to load configuration")?;
    init_tracing(&config.log_filter)?;
    info!("Config loaded: database={}", config.db_path);

    let db = Database::open(&config.db_path).context("failed to open database")?;
    let teams = TeamDirectory::mlb();

    match cli.command {
        Commands::Import => {
            let data = import::load_all_from_paths(&config.data_paths)
                .context("failed to load reference CSVs")?;
            info!(
                "Loaded {} pitcher seasons, {} appearances, {} hitters, {} park factors",
                data.pitchers.len(),
                data.usage.len(),
                data.hitters.len(),
                data.park_factors.len()
            );
            db.import_reference_data(&data)
                .context("failed to import reference data")?;

            let counts: serde_json::Map<String, serde_json::Value> = db
                .table_counts()?
                .into_iter()
                .map(|(table, count)| (table.to_string(), count.into()))
                .collect();
            print_json(&counts)?;
        }
        Commands::Bullpen { team, season, date } => {
            let stats = bullpen::analyze(&db, season, &team, date)
                .with_context(|| format!("bullpen analysis failed for {team} on {date}"))?;
            if !stats.rates.is_finite() {
                info!("{team} has no usable bullpen sample on {date}; rates are undefined");
            }
            print_json(&stats)?;
        }
        Commands::ParkFactor {
            hitter,
            home_games,
            opponents,
        } => {
            let result =
                park_factor::normalize_park_factors(&db, &teams, hitter, &opponents, home_games)
                    .with_context(|| format!("park factor normalization failed for hitter {hitter}"))?;
            print_json(&result)?;
        }
        Commands::Adjust { team, value } => {
            let adjusted = park_factor::adjust_by_park_factor(&db, &teams, value, &team)
                .with_context(|| format!("park factor adjustment failed for {team}"))?;
            print_json(&serde_json::json!({
                "team": team,
                "value": value,
                "adjusted": adjusted,
            }))?;
        }
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let text = serde_json::to_string_pretty(value).context("failed to serialize output")?;
    println!("{text}");
    Ok(())
}

/// Initialize tracing to stderr. `RUST_LOG` takes precedence over the
/// configured filter.
fn init_tracing(default_filter: &str) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
