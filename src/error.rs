//! Error types for tolk.

use thiserror::Error;

/// Library-level error type for tolk operations.
#[derive(Error, Debug)]
pub enum TolkError {
    #[error("Configuration error: {0}")]
    Config(String),

    /// A value failed contract validation. `path` locates the offending
    /// field, e.g. `exercise[2].options[1]`.
    #[error("Schema violation at {path}: {message}")]
    SchemaViolation { path: String, message: String },

    /// An AI endpoint exhausted its attempt budget or returned something
    /// unusable after all repair passes.
    #[error("Upstream failure: {0}")]
    Upstream(String),

    /// A media tool subprocess failed. Carries the tail of its stderr.
    #[error("{tool} failed: {detail}")]
    MediaTool { tool: String, detail: String },

    #[error("External tool not found: {0}. Please install it and ensure it's in your PATH.")]
    ToolNotFound(String),

    #[error("Object store error: {0}")]
    Storage(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Transcription failed: {0}")]
    Transcription(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl TolkError {
    /// Construct a schema violation for `path`.
    pub fn violation(path: impl Into<String>, message: impl Into<String>) -> Self {
        TolkError::SchemaViolation {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Result type alias for tolk operations.
pub type Result<T> = std::result::Result<T, TolkError>;
