// Configuration loading and validation (league.toml, engine.toml).

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use gaffer_core::formation::Formation;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub league: LeagueConfig,
    pub simulation: SimulationConfig,
    pub ws_port: u16,
    pub db_path: String,
    pub data_paths: DataPaths,
}

impl Config {
    /// Parse the configured formation shapes. Validation guarantees these
    /// parse, so any failure here is reported rather than skipped.
    pub fn formations(&self) -> Result<Vec<Formation>, ConfigError> {
        self.league
            .formations
            .iter()
            .map(|shape| {
                Formation::parse(shape).map_err(|e| ConfigError::ValidationError {
                    field: "league.formations".into(),
                    message: e.to_string(),
                })
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// league.toml
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
struct LeagueFile {
    league: LeagueConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LeagueConfig {
    pub name: String,
    /// Budget every manager starts with, in the smallest currency unit.
    pub starting_budget: u64,
    /// Outfield shapes such as "4-4-2"; the goalkeeper is implied.
    pub formations: Vec<String>,
}

// ---------------------------------------------------------------------------
// engine.toml
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
struct EngineFile {
    simulation: SimulationConfig,
    websocket: WebsocketSection,
    database: DatabaseSection,
    data_paths: DataPaths,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SimulationConfig {
    /// Base seed for simulated gameweeks. Each manager's generator is
    /// derived from this, the gameweek, and the manager id.
    pub seed: u64,
}

#[derive(Debug, Clone, Deserialize)]
struct WebsocketSection {
    port: u16,
}

#[derive(Debug, Clone, Deserialize)]
struct DatabaseSection {
    path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataPaths {
    pub players: String,
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Load and validate `config/league.toml` and `config/engine.toml` under
/// `base_dir`. Does not copy defaults; see [`load_config`].
pub(crate) fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let config_dir = base_dir.join("config");

    let league_path = config_dir.join("league.toml");
    let league_file: LeagueFile = parse_file(&league_path)?;

    let engine_path = config_dir.join("engine.toml");
    let engine_file: EngineFile = parse_file(&engine_path)?;

    let config = Config {
        league: league_file.league,
        simulation: engine_file.simulation,
        ws_port: engine_file.websocket.port,
        db_path: engine_file.database.path,
        data_paths: engine_file.data_paths,
    };

    validate(&config)?;

    Ok(config)
}

/// Copy any file in `defaults/` that is missing from `config/`. Existing
/// files are never overwritten and `.example` templates are skipped.
/// Returns the paths that were created.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    if !defaults_dir.exists() {
        if !config_dir.exists() {
            return Err(ConfigError::DefaultsCopyError {
                message: format!(
                    "neither defaults/ nor config/ directory found in {}",
                    base_dir.display()
                ),
            });
        }
        return Ok(vec![]);
    }

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create config directory: {e}"),
    })?;

    let entries = std::fs::read_dir(&defaults_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to read defaults directory: {e}"),
    })?;

    let mut copied = Vec::new();
    for entry in entries {
        let path = entry
            .map_err(|e| ConfigError::DefaultsCopyError {
                message: format!("failed to read defaults entry: {e}"),
            })?
            .path();

        let Some(file_name) = path.file_name().filter(|_| path.is_file()) else {
            continue;
        };
        if file_name.to_str().is_some_and(|n| n.ends_with(".example")) {
            continue;
        }

        let target = config_dir.join(file_name);
        if target.exists() {
            continue;
        }
        std::fs::copy(&path, &target).map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to copy {} to {}: {e}", path.display(), target.display()),
        })?;
        copied.push(target);
    }

    Ok(copied)
}

/// Load config relative to the current working directory, copying defaults
/// first.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_files(&cwd)?;
    load_config_from(&cwd)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_file<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })?;
    toml::from_str(&text).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })
}

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.league.starting_budget == 0 {
        return Err(ConfigError::ValidationError {
            field: "league.starting_budget".into(),
            message: "must be greater than 0".into(),
        });
    }

    if config.league.formations.is_empty() {
        return Err(ConfigError::ValidationError {
            field: "league.formations".into(),
            message: "at least one formation is required".into(),
        });
    }
    config.formations()?;

    if config.ws_port == 0 {
        return Err(ConfigError::ValidationError {
            field: "websocket.port".into(),
            message: "must be greater than 0".into(),
        });
    }

    if config.data_paths.players.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "data_paths.players".into(),
            message: "must not be empty".into(),
        });
    }

    Ok(())
}
