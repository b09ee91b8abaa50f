// Configuration loading and parsing (config/statline.toml).

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

const CONFIG_FILE: &str = "statline.toml";

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no config at {path}; run from the project root so defaults/ can seed it")]
    Missing { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    Unreadable {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("malformed TOML in {path}: {source}")]
    Malformed {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("`{field}` {problem}")]
    Invalid { field: &'static str, problem: String },

    #[error("could not seed {path} from defaults: {source}")]
    Seed {
        path: PathBuf,
        source: std::io::Error,
    },
}

// ---------------------------------------------------------------------------
// Assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: String,
    pub data_paths: DataPaths,
    /// Default `tracing` filter directive; `RUST_LOG` overrides it.
    pub log_filter: String,
}

/// Reference-data CSV locations used by `statline import`.
#[derive(Debug, Clone, Deserialize)]
pub struct DataPaths {
    pub pitchers: String,
    pub bullpen_usage: String,
    pub hitters: String,
    pub park_factors: String,
}

// ---------------------------------------------------------------------------
// statline.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire statline.toml file.
#[derive(Debug, Clone, Deserialize)]
struct ConfigFile {
    database: DatabaseSection,
    data_paths: DataPaths,
    #[serde(default)]
    logging: LoggingSection,
}

#[derive(Debug, Clone, Deserialize)]
struct DatabaseSection {
    path: String,
}

#[derive(Debug, Clone, Deserialize)]
struct LoggingSection {
    filter: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            filter: "statline=info,warn".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

fn config_path(base_dir: &Path) -> PathBuf {
    base_dir.join("config").join(CONFIG_FILE)
}

/// Parse and validate `config/statline.toml` under `base_dir`. Does not seed
/// from defaults; `load_config` does that first.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let path = config_path(base_dir);
    let text = fs::read_to_string(&path).map_err(|source| match source.kind() {
        ErrorKind::NotFound => ConfigError::Missing { path: path.clone() },
        _ => ConfigError::Unreadable {
            path: path.clone(),
            source,
        },
    })?;
    let file: ConfigFile =
        toml::from_str(&text).map_err(|source| ConfigError::Malformed { path, source })?;

    let config = Config {
        db_path: file.database.path,
        data_paths: file.data_paths,
        log_filter: file.logging.filter,
    };
    validate(&config)?;
    Ok(config)
}

/// Copy `defaults/statline.toml` to `config/statline.toml` when the latter
/// does not exist yet. Returns whether a copy was made. An existing config is
/// never overwritten, and a missing defaults file is left for
/// `load_config_from` to report.
pub fn seed_config(base_dir: &Path) -> Result<bool, ConfigError> {
    let target = config_path(base_dir);
    let defaults_file = base_dir.join("defaults").join(CONFIG_FILE);
    if target.exists() || !defaults_file.is_file() {
        return Ok(false);
    }

    let seed_err = |source: std::io::Error| ConfigError::Seed {
        path: target.clone(),
        source,
    };
    fs::create_dir_all(base_dir.join("config")).map_err(seed_err)?;
    let defaults = fs::read(&defaults_file).map_err(seed_err)?;

    // create_new so a config written concurrently is not clobbered.
    match OpenOptions::new().write(true).create_new(true).open(&target) {
        Ok(mut dest) => {
            dest.write_all(&defaults).map_err(seed_err)?;
            Ok(true)
        }
        Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(seed_err(e)),
    }
}

/// Seed and load the config relative to the current working directory.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|source| ConfigError::Unreadable {
        path: PathBuf::from("."),
        source,
    })?;
    seed_config(&cwd)?;
    load_config_from(&cwd)
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    let paths = &config.data_paths;
    let required = [
        ("database.path", &config.db_path),
        ("data_paths.pitchers", &paths.pitchers),
        ("data_paths.bullpen_usage", &paths.bullpen_usage),
        ("data_paths.hitters", &paths.hitters),
        ("data_paths.park_factors", &paths.park_factors),
    ];
    match required.iter().find(|(_, val)| val.trim().is_empty()) {
        Some(&(field, _)) => Err(ConfigError::Invalid {
            field,
            problem: "must not be empty".into(),
        }),
        None => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    /// Workspace root, where `defaults/` lives.
    fn project_root() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("../..")
    }

    /// Fresh temp directory with `config/statline.toml` holding `contents`.
    fn temp_config(name: &str, contents: &str) -> PathBuf {
        let tmp = std::env::temp_dir().join(name);
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("config")).unwrap();
        fs::write(tmp.join("config").join(CONFIG_FILE), contents).unwrap();
        tmp
    }

    fn default_toml() -> String {
        fs::read_to_string(project_root().join("defaults").join(CONFIG_FILE)).unwrap()
    }

    #[test]
    fn load_valid_config_from_defaults() {
        let tmp = temp_config("statline_config_defaults", &default_toml());

        let config = load_config_from(&tmp).expect("should load valid config");
        assert_eq!(config.db_path, "statline.db");
        assert_eq!(config.data_paths.pitchers, "data/pitchers.csv");
        assert_eq!(config.data_paths.bullpen_usage, "data/bullpen_usage.csv");
        assert_eq!(config.data_paths.hitters, "data/hitters.csv");
        assert_eq!(config.data_paths.park_factors, "data/park_factors.csv");
        assert_eq!(config.log_filter, "statline=info,warn");

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn logging_section_is_optional() {
        let toml = r#"
[database]
path = "test.db"

[data_paths]
pitchers = "p.csv"
bullpen_usage = "u.csv"
hitters = "h.csv"
park_factors = "pf.csv"
"#;
        let tmp = temp_config("statline_config_no_logging", toml);

        let config = load_config_from(&tmp).expect("should load without [logging]");
        assert_eq!(config.db_path, "test.db");
        assert_eq!(config.log_filter, "statline=info,warn");

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_empty_database_path() {
        let modified = default_toml().replace("path = \"statline.db\"", "path = \"\"");
        let tmp = temp_config("statline_config_empty_db", &modified);

        let err = load_config_from(&tmp).unwrap_err();
        match &err {
            ConfigError::Invalid { field, .. } => assert_eq!(*field, "database.path"),
            other => panic!("expected Invalid, got: {other}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_blank_data_path() {
        let modified = default_toml().replace("\"data/hitters.csv\"", "\"  \"");
        let tmp = temp_config("statline_config_blank_hitters", &modified);

        let err = load_config_from(&tmp).unwrap_err();
        match &err {
            ConfigError::Invalid { field, .. } => assert_eq!(*field, "data_paths.hitters"),
            other => panic!("expected Invalid, got: {other}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn missing_config_file() {
        let tmp = std::env::temp_dir().join("statline_config_missing");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("config")).unwrap();

        let err = load_config_from(&tmp).unwrap_err();
        match &err {
            ConfigError::Missing { path } => assert!(path.ends_with(CONFIG_FILE)),
            other => panic!("expected Missing, got: {other}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn malformed_toml_is_rejected() {
        let tmp = temp_config("statline_config_invalid_toml", "this is not valid [[[ toml");

        let err = load_config_from(&tmp).unwrap_err();
        match &err {
            ConfigError::Malformed { path, .. } => assert!(path.ends_with(CONFIG_FILE)),
            other => panic!("expected Malformed, got: {other}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn missing_section_is_malformed() {
        let tmp = temp_config("statline_config_missing_section", "[database]\npath = \"x.db\"\n");

        let err = load_config_from(&tmp).unwrap_err();
        assert!(matches!(err, ConfigError::Malformed { .. }));

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn seed_config_copies_defaults_once() {
        let tmp = std::env::temp_dir().join("statline_config_seed_copies");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("defaults")).unwrap();
        fs::write(tmp.join("defaults").join(CONFIG_FILE), default_toml()).unwrap();

        assert!(seed_config(&tmp).unwrap());
        assert!(config_path(&tmp).exists());
        assert!(!seed_config(&tmp).unwrap());

        let config = load_config_from(&tmp).unwrap();
        assert_eq!(config.db_path, "statline.db");

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn seed_config_keeps_existing_file() {
        let tmp = temp_config("statline_config_seed_keeps", "# custom\n");
        fs::create_dir_all(tmp.join("defaults")).unwrap();
        fs::write(tmp.join("defaults").join(CONFIG_FILE), default_toml()).unwrap();

        assert!(!seed_config(&tmp).unwrap());
        assert_eq!(fs::read_to_string(config_path(&tmp)).unwrap(), "# custom\n");

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn missing_defaults_surface_as_missing_config() {
        let tmp = std::env::temp_dir().join("statline_config_no_defaults");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(&tmp).unwrap();

        assert!(!seed_config(&tmp).unwrap());
        let err = load_config_from(&tmp).unwrap_err();
        assert!(matches!(err, ConfigError::Missing { .. }));
        assert!(err.to_string().contains("defaults/"));

        let _ = fs::remove_dir_all(&tmp);
    }
}
