//! Configuration loading and settings resolution
//!
//! Every setting resolves in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. OS-dependent compiled default (fallback)

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const ENV_CONFIG: &str = "LINEAGE_CONFIG";
pub const ENV_DATABASE: &str = "LINEAGE_DATABASE";
pub const ENV_CROSSWALK: &str = "LINEAGE_CROSSWALK";
pub const ENV_EMBEDDING_URL: &str = "LINEAGE_EMBEDDING_URL";

const DEFAULT_EMBEDDING_URL: &str = "http://127.0.0.1:11434/api/embed";
const DEFAULT_EMBEDDING_MODEL: &str = "all-minilm";

/// Raw TOML config file contents; every field is optional
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub database_path: Option<PathBuf>,
    pub crosswalk: CrosswalkToml,
    pub embedding: EmbeddingToml,
    pub thresholds: ThresholdsToml,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CrosswalkToml {
    pub path: Option<PathBuf>,
    pub delimiter: Option<char>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EmbeddingToml {
    pub url: Option<String>,
    pub model: Option<String>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ThresholdsToml {
    pub title_distance: Option<f64>,
    pub semantic: Option<f64>,
    pub graduate_code_boundary: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default tracing filter when RUST_LOG is unset (e.g. "info")
    pub level: Option<String>,
}

/// Decision thresholds used by the link oracle
#[derive(Debug, Clone, PartialEq)]
pub struct Thresholds {
    /// A title pair is a title match when its distance ratio is strictly above this
    pub title_distance: f64,
    /// Title and description semantic similarity must both be strictly above this
    pub semantic: f64,
    /// Course numbers comparing (as strings) below this are undergraduate tier
    pub graduate_code_boundary: String,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            title_distance: 0.8,
            semantic: 0.6,
            graduate_code_boundary: "5000".to_string(),
        }
    }
}

/// Embedding service connection settings
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingSettings {
    pub url: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            url: DEFAULT_EMBEDDING_URL.to_string(),
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
            timeout_secs: 30,
        }
    }
}

/// Fully resolved settings for one merge run
#[derive(Debug, Clone)]
pub struct MergeSettings {
    pub database_path: PathBuf,
    pub crosswalk_path: Option<PathBuf>,
    pub crosswalk_delimiter: u8,
    pub embedding: EmbeddingSettings,
    pub thresholds: Thresholds,
    pub log_level: String,
}

/// Values supplied on the command line
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub config_path: Option<PathBuf>,
    pub database_path: Option<PathBuf>,
    pub crosswalk_path: Option<PathBuf>,
    pub embedding_url: Option<String>,
}

/// Resolves [`MergeSettings`] from CLI, environment, TOML and compiled defaults
pub struct SettingsResolver {
    overrides: CliOverrides,
}

impl SettingsResolver {
    pub fn new(overrides: CliOverrides) -> Self {
        Self { overrides }
    }

    pub fn resolve(&self) -> Result<MergeSettings> {
        let toml = self.load_toml()?.unwrap_or_default();

        let database_path = self
            .overrides
            .database_path
            .clone()
            .or_else(|| env_path(ENV_DATABASE))
            .or_else(|| toml.database_path.clone())
            .unwrap_or_else(default_database_path);

        let crosswalk_path = self
            .overrides
            .crosswalk_path
            .clone()
            .or_else(|| env_path(ENV_CROSSWALK))
            .or_else(|| toml.crosswalk.path.clone());

        let delimiter = toml.crosswalk.delimiter.unwrap_or('|');
        if !delimiter.is_ascii() {
            return Err(Error::Config(format!(
                "Crosswalk delimiter must be a single ASCII character, got {:?}",
                delimiter
            )));
        }

        let embedding_defaults = EmbeddingSettings::default();
        let embedding = EmbeddingSettings {
            url: self
                .overrides
                .embedding_url
                .clone()
                .or_else(|| env_string(ENV_EMBEDDING_URL))
                .or_else(|| toml.embedding.url.clone())
                .unwrap_or(embedding_defaults.url),
            model: toml.embedding.model.clone().unwrap_or(embedding_defaults.model),
            timeout_secs: toml
                .embedding
                .timeout_secs
                .unwrap_or(embedding_defaults.timeout_secs),
        };

        let threshold_defaults = Thresholds::default();
        let thresholds = Thresholds {
            title_distance: toml
                .thresholds
                .title_distance
                .unwrap_or(threshold_defaults.title_distance),
            semantic: toml.thresholds.semantic.unwrap_or(threshold_defaults.semantic),
            graduate_code_boundary: toml
                .thresholds
                .graduate_code_boundary
                .clone()
                .unwrap_or(threshold_defaults.graduate_code_boundary),
        };

        Ok(MergeSettings {
            database_path,
            crosswalk_path,
            crosswalk_delimiter: delimiter as u8,
            embedding,
            thresholds,
            log_level: toml.logging.level.clone().unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Load the TOML file, if any
    ///
    /// An explicitly named file (CLI or ENV) must exist; the platform default
    /// location is optional and silently skipped when absent.
    fn load_toml(&self) -> Result<Option<TomlConfig>> {
        if let Some(path) = self
            .overrides
            .config_path
            .clone()
            .or_else(|| env_path(ENV_CONFIG))
        {
            return parse_toml_file(&path).map(Some);
        }

        match default_config_path() {
            Some(path) if path.exists() => parse_toml_file(&path).map(Some),
            Some(path) => {
                debug!("No config file at {}, using defaults", path.display());
                Ok(None)
            }
            None => {
                warn!("Could not determine config directory, using defaults");
                Ok(None)
            }
        }
    }
}

/// Parse a TOML config file
pub fn parse_toml_file(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// `<config_dir>/lineage/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("lineage").join("config.toml"))
}

/// OS-dependent default database location
pub fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("lineage"))
        .unwrap_or_else(|| PathBuf::from("./lineage_data"))
        .join("lineage.db")
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_path(name: &str) -> Option<PathBuf> {
    env_string(name).map(PathBuf::from)
}
