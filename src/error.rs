use std::time::Duration;
use thiserror::Error;

/// Application-level error types
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// A collected value broke the snapshot invariants
    #[error("Validation error: {0}")]
    Validation(String),

    /// A refresh was requested while another cycle is in flight
    #[error("Refresh already in progress")]
    RefreshInProgress,

    /// WebSocket transport errors
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic error with message
    #[error("{0}")]
    Message(String),
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Check if the error only means "try again later"
    pub fn is_busy(&self) -> bool {
        matches!(self, AppError::RefreshInProgress)
    }
}

/// Transport failures: timeouts, bad statuses, unusable payloads
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    #[error("request to {url} timed out after {}ms", .after.as_millis())]
    Timeout { url: String, after: Duration },

    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("network error: {0}")]
    Network(String),

    #[error("payload too short ({len} chars)")]
    PayloadTooShort { len: usize },

    #[error("invalid JSON payload: {0}")]
    InvalidJson(String),

    #[error("all relay routes failed - {indicator}: {reasons}")]
    AllRoutesFailed { indicator: String, reasons: String },
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        FetchError::Network(err.to_string())
    }
}

/// Parse failures on an otherwise delivered payload
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExtractError {
    #[error("no {0} value found in payload")]
    PatternNotFound(&'static str),

    #[error("{indicator} value {value} outside [{min}, {max}]")]
    OutOfDomain {
        indicator: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("unexpected payload shape: {0}")]
    Shape(String),
}

/// Outcome of a single failed indicator collection
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CollectorError {
    #[error(transparent)]
    Transport(#[from] FetchError),

    #[error(transparent)]
    Parse(#[from] ExtractError),

    /// Companion service answered but reported a failure
    #[error("service reported failure: {0}")]
    Service(String),

    /// Both tiers of a two-tier collector failed
    #[error("{indicator} collection failed - primary: {primary}, fallback: {fallback}")]
    Fallback {
        indicator: &'static str,
        primary: String,
        fallback: String,
    },

    /// Indicator has no working source in this pipeline
    #[error("{0} has no available source")]
    Unavailable(&'static str),
}

impl From<serde_json::Error> for CollectorError {
    fn from(err: serde_json::Error) -> Self {
        CollectorError::Transport(FetchError::InvalidJson(err.to_string()))
    }
}
