//! Run configuration.
//!
//! Read from `config.json` (the historical format) or a TOML file:
//!
//! ```toml
//! csv_filename = "schedule.csv"
//! term_start_date = "2024-01-08"
//! term_end_date = "2024-04-26"
//! timezone = "America/Toronto"
//! calendar_id = "primary"
//!
//! [retry]
//! max_attempts = 3
//! base_delay_ms = 500
//! ```
//!
//! Relative paths resolve against the directory holding the config file.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::calendar::RetryPolicy;
use crate::error::{ConfigError, CoreError};
use crate::recurrence::TermRange;

pub const CONFIG_DIR_NAME: &str = "classcal";

/// Configuration as written in the file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_csv_filename")]
    pub csv_filename: PathBuf,
    #[serde(default)]
    pub term_start_date: Option<String>,
    #[serde(default)]
    pub term_end_date: Option<String>,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default = "default_calendar_id")]
    pub calendar_id: String,
    #[serde(default = "default_credentials_file")]
    pub credentials_file: PathBuf,
    #[serde(default)]
    pub retry: RetryPolicy,
    /// Directory of the file this was loaded from.
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

fn default_csv_filename() -> PathBuf {
    PathBuf::from("schedule.csv")
}
fn default_timezone() -> String {
    "America/Toronto".to_string()
}
fn default_calendar_id() -> String {
    "primary".to_string()
}
fn default_credentials_file() -> PathBuf {
    PathBuf::from("credentials.json")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            csv_filename: default_csv_filename(),
            term_start_date: None,
            term_end_date: None,
            timezone: default_timezone(),
            calendar_id: default_calendar_id(),
            credentials_file: default_credentials_file(),
            retry: RetryPolicy::default(),
            base_dir: None,
        }
    }
}

/// Validated configuration used for a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedConfig {
    pub csv_path: PathBuf,
    pub term: TermRange,
    pub timezone: Tz,
    pub calendar_id: String,
    pub credentials_file: PathBuf,
    pub retry: RetryPolicy,
}

impl Config {
    /// Load from `path`; `.json` files are JSON, anything else TOML.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::LoadFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        let mut config = if is_json {
            Self::from_json(&content)?
        } else {
            Self::from_toml(&content)?
        };
        config.base_dir = path.parent().map(Path::to_path_buf);
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(content).map_err(|e| ConfigError::ParseFailed(e.to_string()))
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ParseFailed(e.to_string()))
    }

    /// Places searched when no path is given, in order.
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("config.json"), PathBuf::from("config.toml")];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join(CONFIG_DIR_NAME).join("config.toml"));
        }
        paths
    }

    /// Load the first configuration file found in [`Config::search_paths`].
    pub fn discover() -> Result<Self, ConfigError> {
        let searched = Self::search_paths();
        match searched.iter().find(|p| p.is_file()) {
            Some(path) => Self::load(path),
            None => Err(ConfigError::NotFound { searched }),
        }
    }

    /// Load `path` when given, otherwise discover.
    pub fn load_or_discover(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Self::discover(),
        }
    }

    /// Validate every value. Fails before any remote work can start.
    pub fn resolve(&self) -> Result<ResolvedConfig, CoreError> {
        let start = parse_date("term_start_date", self.term_start_date.as_deref())?;
        let end = parse_date("term_end_date", self.term_end_date.as_deref())?;
        let term = TermRange::new(start, end)?;

        let timezone: Tz = self
            .timezone
            .parse()
            .map_err(|_| ConfigError::InvalidValue {
                key: "timezone".into(),
                message: format!("unknown IANA timezone '{}'", self.timezone),
            })?;

        if self.calendar_id.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "calendar_id".into(),
                message: "must not be empty".into(),
            }
            .into());
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                key: "retry.max_attempts".into(),
                message: "must be at least 1".into(),
            }
            .into());
        }

        Ok(ResolvedConfig {
            csv_path: self.relative_to_base(&self.csv_filename),
            term,
            timezone,
            calendar_id: self.calendar_id.trim().to_string(),
            credentials_file: self.credentials_path(),
            retry: self.retry,
        })
    }

    /// Client secrets location, without validating the rest of the file.
    pub fn credentials_path(&self) -> PathBuf {
        self.relative_to_base(&self.credentials_file)
    }

    fn relative_to_base(&self, path: &Path) -> PathBuf {
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }
}

fn parse_date(key: &str, value: Option<&str>) -> Result<NaiveDate, ConfigError> {
    let value = value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ConfigError::MissingKey(key.to_string()))?;
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|e| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("'{value}' is not a YYYY-MM-DD date: {e}"),
    })
}
