use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::constants::{
    APPEARANCE_TYPE_FILE, DEFAULT_DATABASE, GAME_LOG_FILE, PARK_CODES_FILE, PERSON_CODES_FILE,
    TEAM_CODES_FILE,
};
use crate::error::{BuildError, Result};
use crate::loader::SourcePaths;

/// How foreign keys are treated while the normalized tables are written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum IntegrityMode {
    /// Enforced at commit; any violation rolls the whole build back
    #[default]
    Strict,
    /// Not enforced; violations are checked after commit and reported
    Advisory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: PathBuf,
    pub sources: SourcesConfig,
    pub build: BuildConfig,
    pub logging: LoggingConfig,
    pub metrics: MetricsConfig,
}

/// Source extract locations. Individual files default to their standard
/// names under `dir`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    pub dir: PathBuf,
    pub game_log: Option<PathBuf>,
    pub park_codes: Option<PathBuf>,
    pub person_codes: Option<PathBuf>,
    pub team_codes: Option<PathBuf>,
    pub appearance_type: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    pub integrity: IntegrityMode,
    /// Remove staging tables an earlier build left in the store
    pub drop_staging: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub dir: PathBuf,
    pub file_name: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Prometheus textfile written at the end of a build
    pub textfile: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: PathBuf::from(DEFAULT_DATABASE),
            sources: SourcesConfig::default(),
            build: BuildConfig::default(),
            logging: LoggingConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            game_log: None,
            park_codes: None,
            person_codes: None,
            team_codes: None,
            appearance_type: None,
        }
    }
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            integrity: IntegrityMode::Strict,
            drop_staging: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("logs"),
            file_name: "baseball_db.log".to_string(),
        }
    }
}

impl SourcesConfig {
    pub fn paths(&self) -> SourcePaths {
        let resolve = |file: &Option<PathBuf>, default: &str| match file {
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => self.dir.join(path),
            None => self.dir.join(default),
        };
        SourcePaths {
            game_log: resolve(&self.game_log, GAME_LOG_FILE),
            parks: resolve(&self.park_codes, PARK_CODES_FILE),
            persons: resolve(&self.person_codes, PERSON_CODES_FILE),
            teams: resolve(&self.team_codes, TEAM_CODES_FILE),
            appearance_types: resolve(&self.appearance_type, APPEARANCE_TYPE_FILE),
        }
    }
}

impl Config {
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            BuildError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;
        Self::from_toml(&content)
    }

    /// Load `explicit` if given (it must exist), else `fallback` if it
    /// exists, else defaults.
    pub fn resolve(explicit: Option<&Path>, fallback: &Path) -> Result<Self> {
        match explicit {
            Some(path) => Self::load(path),
            None if fallback.exists() => Self::load(fallback),
            None => Ok(Self::default()),
        }
    }
}
