//! ProgressDash configuration types and loading

use eyre::{Context, Result};
use groupstore::{ColumnMap, CsvStore, DEFAULT_DELIMITER, RecordStore, SqliteStore};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::engine::ProgressBasis;

/// Project-local config file name
pub const LOCAL_CONFIG: &str = ".progressdash.yml";

/// Main ProgressDash configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[serde(rename = "log-level", skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,

    /// Progress computation
    pub progress: ProgressConfig,

    /// Backing store
    pub store: StoreConfig,

    /// Terminal dashboard
    pub tui: TuiConfig,
}

impl Config {
    /// Validate configuration before use
    pub fn validate(&self) -> Result<()> {
        if self.store.path.as_os_str().is_empty() {
            return Err(eyre::eyre!("store.path must not be empty"));
        }
        if self.store.kind == StoreKind::Csv {
            self.store.delimiter_byte()?;
        }
        if self.tui.tick_ms == 0 {
            return Err(eyre::eyre!("tui.tick-ms must be greater than 0"));
        }
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .progressdash.yml
        let local_config = PathBuf::from(LOCAL_CONFIG);
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/progressdash/progressdash.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("progressdash").join("progressdash.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Read just the log level, before logging is set up
    ///
    /// Errors are swallowed: the full load reports them once logging works.
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        let candidates = match config_path {
            Some(path) => vec![path.clone()],
            None => {
                let mut paths = vec![PathBuf::from(LOCAL_CONFIG)];
                if let Some(dir) = dirs::config_dir() {
                    paths.push(dir.join("progressdash").join("progressdash.yml"));
                }
                paths
            }
        };

        candidates
            .iter()
            .find(|p| p.exists())
            .and_then(|p| fs::read_to_string(p).ok())
            .and_then(|content| serde_yaml::from_str::<Config>(&content).ok())
            .and_then(|config| config.log_level)
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Save config to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        fs::write(path, content).context(format!("Failed to write config to {}", path.display()))?;
        Ok(())
    }
}

/// Progress computation settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressConfig {
    /// Which field pair progress is measured on
    pub basis: ProgressBasis,
}

/// Backing store kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    #[default]
    Csv,
    Sqlite,
}

impl StoreKind {
    /// Guess the kind from a file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "csv" | "txt" => Some(Self::Csv),
            "db" | "sqlite" | "sqlite3" => Some(Self::Sqlite),
            _ => None,
        }
    }
}

/// Backing store settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Store kind
    pub kind: StoreKind,

    /// Path to the CSV file or SQLite database
    pub path: PathBuf,

    /// CSV field delimiter (single byte)
    pub delimiter: String,

    /// Header names for each record field
    pub columns: ColumnMap,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            kind: StoreKind::Csv,
            path: PathBuf::from("cleaned_data.csv"),
            delimiter: char::from(DEFAULT_DELIMITER).to_string(),
            columns: ColumnMap::default(),
        }
    }
}

impl StoreConfig {
    /// Point the store at another path, switching kind when the extension says so
    pub fn override_path(&mut self, path: &Path) {
        if let Some(kind) = StoreKind::from_path(path) {
            self.kind = kind;
        }
        self.path = path.to_path_buf();
    }

    /// The delimiter as a single byte
    pub fn delimiter_byte(&self) -> Result<u8> {
        match self.delimiter.as_bytes() {
            [b] => Ok(*b),
            _ => Err(eyre::eyre!(
                "store.delimiter must be a single byte, got {:?}",
                self.delimiter
            )),
        }
    }

    /// Construct the configured store
    pub fn open(&self) -> Result<Box<dyn RecordStore>> {
        tracing::debug!(kind = ?self.kind, path = ?self.path, "StoreConfig::open: called");
        match self.kind {
            StoreKind::Csv => Ok(Box::new(CsvStore::new(
                &self.path,
                self.delimiter_byte()?,
                self.columns.clone(),
            ))),
            StoreKind::Sqlite => {
                let store = SqliteStore::open(&self.path)
                    .context(format!("Failed to open SQLite store {}", self.path.display()))?;
                Ok(Box::new(store))
            }
        }
    }
}

/// Terminal dashboard settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TuiConfig {
    /// Input poll interval in milliseconds
    #[serde(rename = "tick-ms")]
    pub tick_ms: u64,
}

impl Default for TuiConfig {
    fn default() -> Self {
        Self { tick_ms: 100 }
    }
}
