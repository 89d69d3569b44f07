//! services/api/src/error.rs
//!
//! Errors that stop the chat service from starting or keep it from serving.

use crate::config::ConfigError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Connecting to Postgres or running the migrations failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The HTTP client for the Ollama backend could not be built.
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("OPENAI_API_KEY is required when COMPLETION_BACKEND=openai")]
    MissingApiKey,

    #[error("Invalid ALLOWED_ORIGIN '{origin}': {reason}")]
    InvalidOrigin { origin: String, reason: String },

    /// Binding the listener or serving connections failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
