//! Core error types for classcal-core.
//!
//! Errors are split by scope. Row-scoped errors ([`MalformedRowError`],
//! [`RemoteError`]) are recorded per row by the sync driver and never abort
//! a run. Configuration, term range, schedule and authentication errors
//! abort before any remote call.

use std::fmt;
use std::path::PathBuf;

use chrono::{NaiveDate, Weekday};
use thiserror::Error;

/// Core error type for classcal-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Term boundaries cannot produce a schedule
    #[error("Invalid term range: {0}")]
    TermRange(#[from] InvalidTermRangeError),

    /// Schedule file errors
    #[error("Schedule error: {0}")]
    Schedule(#[from] ScheduleError),

    /// OAuth-related errors
    #[error("Authentication error: {0}")]
    OAuth(#[from] OAuthError),

    /// Calendar service errors
    #[error("Calendar error: {0}")]
    Remote(#[from] RemoteError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Column of a schedule row that failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RowField {
    Course,
    SessionType,
    Day,
    StartTime,
    EndTime,
    Location,
    Section,
    /// The record as a whole (undecodable CSV line).
    Record,
}

impl fmt::Display for RowField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RowField::Course => "course",
            RowField::SessionType => "session type",
            RowField::Day => "day",
            RowField::StartTime => "start time",
            RowField::EndTime => "end time",
            RowField::Location => "location",
            RowField::Section => "section",
            RowField::Record => "record",
        };
        f.write_str(name)
    }
}

/// A schedule row that could not be turned into a session.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("row {row}: invalid {field}: {message}")]
pub struct MalformedRowError {
    /// 1-based data row number (header excluded).
    pub row: usize,
    pub field: RowField,
    pub message: String,
}

impl MalformedRowError {
    pub fn new(row: usize, field: RowField, message: impl Into<String>) -> Self {
        Self {
            row,
            field,
            message: message.into(),
        }
    }
}

/// Term boundaries that cannot produce any occurrence.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidTermRangeError {
    #[error("term end date {end} is before term start date {start}")]
    EndBeforeStart { start: NaiveDate, end: NaiveDate },

    #[error("no {weekday} falls within the term (first would be {first}, term ends {end})")]
    WeekdayOutsideTerm {
        weekday: Weekday,
        first: NaiveDate,
        end: NaiveDate,
    },

    #[error("date {0} is out of the supported calendar range")]
    OutOfRange(NaiveDate),
}

/// Why a single record could not be planned.
///
/// `Malformed` stays with its row. `TermRange` means the term itself cannot
/// hold the session and aborts the run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    #[error(transparent)]
    Malformed(#[from] MalformedRowError),

    #[error(transparent)]
    TermRange(#[from] InvalidTermRangeError),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Missing required configuration key
    #[error("Missing required configuration key: {0}")]
    MissingKey(String),

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),

    /// No configuration file in any of the searched locations
    #[error("No configuration file found (searched: {})", .searched.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().join(", "))]
    NotFound { searched: Vec<PathBuf> },
}

/// Schedule file errors that abort a run.
#[derive(Error, Debug)]
pub enum ScheduleError {
    #[error("CSV file '{0}' not found")]
    NotFound(PathBuf),

    #[error("CSV is missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<&'static str>),

    #[error("Failed to read CSV: {0}")]
    Csv(#[from] csv::Error),
}

/// OAuth-specific errors.
#[derive(Error, Debug)]
pub enum OAuthError {
    /// Authorization failed
    #[error("Authorization failed: {0}")]
    AuthorizationFailed(String),

    /// Token exchange failed
    #[error("Token exchange failed: {0}")]
    TokenExchangeFailed(String),

    /// Token refresh failed
    #[error("Token refresh failed: {0}")]
    TokenRefreshFailed(String),

    /// Callback timeout
    #[error("OAuth callback timeout: no callback received within {timeout_secs} seconds")]
    CallbackTimeout { timeout_secs: u64 },

    /// Invalid callback
    #[error("Invalid OAuth callback: {0}")]
    InvalidCallback(String),

    /// Not authenticated
    #[error("Not authenticated with {service}")]
    NotAuthenticated { service: String },

    /// Client secrets missing or unusable
    #[error("OAuth credentials not configured: {0}")]
    CredentialsNotConfigured(String),

    /// Token storage failed
    #[error("Credential store error: {0}")]
    Keyring(String),
}

impl From<tokio::time::error::Elapsed> for OAuthError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        OAuthError::CallbackTimeout {
            timeout_secs: crate::auth::CALLBACK_TIMEOUT_SECS,
        }
    }
}

impl From<keyring::Error> for OAuthError {
    fn from(err: keyring::Error) -> Self {
        OAuthError::Keyring(err.to_string())
    }
}

/// Errors returned by a calendar service.
#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Calendar API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The event id is already taken (possibly by a cancelled event).
    #[error("Event already exists: {0}")]
    Conflict(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Access token rejected")]
    Unauthorized,

    #[error("Authentication error: {0}")]
    Auth(#[from] OAuthError),

    #[error("Unexpected response: {0}")]
    Decode(String),
}

impl RemoteError {
    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            RemoteError::Network(e) => e.is_timeout() || e.is_connect(),
            RemoteError::RateLimited => true,
            RemoteError::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
