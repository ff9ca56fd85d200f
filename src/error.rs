//! Error types for Oppsum.

use thiserror::Error;

/// Library-level error type for Oppsum operations.
#[derive(Error, Debug)]
pub enum OppsumError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unsupported input: {0}")]
    UnsupportedInput(String),

    #[error("Transcript unavailable: {0}")]
    Transcript(String),

    #[error("Generation backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("Task '{action}' failed: {message}")]
    TaskFailed { action: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Fault classes for a generation backend call.
///
/// The retry/fallback policy switches on these variants: rate limits are
/// retried with backoff on the same model, everything else aborts the
/// invocation immediately.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Rate limited by '{model}': {message}")]
    RateLimited { model: String, message: String },

    #[error("Transient backend failure from '{model}': {message}")]
    Transient { model: String, message: String },

    #[error("Backend rejected request to '{model}': {message}")]
    Permanent { model: String, message: String },
}

impl BackendError {
    /// Whether this fault should be retried against the same model.
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, BackendError::RateLimited { .. })
    }
}

/// Result type alias for Oppsum operations.
pub type Result<T> = std::result::Result<T, OppsumError>;
