//! Error types for synckit
//!
//! This module defines the error hierarchy for the entire crate.
//! All public APIs return `Result<T, Error>` where Error is defined here.

use thiserror::Error;

/// The main error type for synckit
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Missing required config key: {key}")]
    MissingConfigKey { key: String },

    #[error("Invalid config value for '{key}': {message}")]
    InvalidConfigValue { key: String, message: String },

    #[error("Unknown config key: {key}")]
    UnknownConfigKey { key: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    // ============================================================================
    // Authentication Errors
    // ============================================================================
    #[error("Authentication failed (HTTP {status}): {message}")]
    Auth { status: u16, message: String },

    // ============================================================================
    // Transport / HTTP Errors
    // ============================================================================
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Rate limited, retry after {retry_after_seconds}s")]
    RateLimited { retry_after_seconds: u64 },

    #[error("Request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Retries exhausted after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ============================================================================
    // Data Errors
    // ============================================================================
    #[error("Failed to extract records from path '{path}': {message}")]
    RecordExtraction { path: String, message: String },

    #[error("Record for table '{table}' is missing primary key column '{column}'")]
    MissingPrimaryKey { table: String, column: String },

    // ============================================================================
    // State Errors
    // ============================================================================
    #[error("State error: {message}")]
    State { message: String },

    // ============================================================================
    // Driver / Sink Errors
    // ============================================================================
    #[error("Table '{table}' not found in sync definition")]
    TableNotFound { table: String },

    #[error("Sink error: {message}")]
    Sink { message: String },

    // ============================================================================
    // I/O Errors
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

/// Coarse error classification for user-facing reporting
///
/// Distinguishes problems the operator must fix (configuration,
/// credentials) from problems that self-resolve on the next run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Bad or missing configuration; fix before retrying
    Configuration,
    /// Credentials rejected by the source; fix credentials
    Authentication,
    /// Transient network/server failure; will self-resolve
    Transient,
    /// Source is throttling; will self-resolve
    RateLimit,
    /// A record could not be processed
    Data,
    /// Checkpoint state could not be read or written
    State,
    /// Anything else
    Other,
}

impl ErrorCategory {
    /// Remediation hint shown alongside fatal errors
    pub fn remediation(&self) -> &'static str {
        match self {
            Self::Configuration => "fix the configuration before retrying",
            Self::Authentication => "fix the credentials before retrying",
            Self::Transient | Self::RateLimit => {
                "transient; will self-resolve on the next scheduled run"
            }
            Self::Data => "inspect the logged record key",
            Self::State => "inspect or remove the state file",
            Self::Other => "see the error message",
        }
    }
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a missing config key error
    pub fn missing_key(key: impl Into<String>) -> Self {
        Self::MissingConfigKey { key: key.into() }
    }

    /// Create an auth error
    pub fn auth(status: u16, message: impl Into<String>) -> Self {
        Self::Auth {
            status,
            message: message.into(),
        }
    }

    /// Create an HTTP status error
    pub fn http_status(status: u16, body: impl Into<String>) -> Self {
        Self::HttpStatus {
            status,
            body: body.into(),
        }
    }

    /// Create a state error
    pub fn state(message: impl Into<String>) -> Self {
        Self::State {
            message: message.into(),
        }
    }

    /// Create a sink error
    pub fn sink(message: impl Into<String>) -> Self {
        Self::Sink {
            message: message.into(),
        }
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Transport(_) | Error::RateLimited { .. } | Error::Timeout { .. } => true,
            Error::HttpStatus { status, .. } => is_retryable_status(*status),
            _ => false,
        }
    }

    /// Classify this error for user-facing reporting
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Config { .. }
            | Error::MissingConfigKey { .. }
            | Error::InvalidConfigValue { .. }
            | Error::UnknownConfigKey { .. }
            | Error::YamlParse(_)
            | Error::InvalidUrl(_)
            | Error::TableNotFound { .. } => ErrorCategory::Configuration,
            Error::Auth { .. } => ErrorCategory::Authentication,
            Error::HttpStatus { status, .. } if matches!(*status, 401 | 403) => {
                ErrorCategory::Authentication
            }
            Error::RateLimited { .. } => ErrorCategory::RateLimit,
            Error::Transport(_)
            | Error::Timeout { .. }
            | Error::RetriesExhausted { .. }
            | Error::HttpStatus { .. } => ErrorCategory::Transient,
            Error::RecordExtraction { .. }
            | Error::MissingPrimaryKey { .. }
            | Error::JsonParse(_) => ErrorCategory::Data,
            Error::State { .. } => ErrorCategory::State,
            _ => ErrorCategory::Other,
        }
    }
}

/// Check if an HTTP status code is retryable
fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

/// Result type alias for synckit
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", message.into(), inner))
        })
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", f(), inner))
        })
    }
}
