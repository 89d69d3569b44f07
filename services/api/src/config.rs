//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use ai_chat_core::{ContextSize, GenerationProfile};
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Which completion backend the service talks to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CompletionBackend {
    /// An Ollama server's native `/api/chat` endpoint.
    Ollama,
    /// Any OpenAI-compatible chat completions endpoint.
    OpenAi,
}

impl FromStr for CompletionBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "openai" => Ok(Self::OpenAi),
            other => Err(format!("'{}' is not a supported backend (ollama, openai)", other)),
        }
    }
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,
    pub allowed_origin: String,
    pub completion_backend: CompletionBackend,
    pub ollama_base_url: String,
    pub chat_model: String,
    pub openai_api_key: Option<String>,
    pub backend_timeout: Duration,
    /// The profile used for unknown modes and as the starting point of every session.
    pub default_profile: GenerationProfile,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        // --- Load Server and Database Settings ---
        let bind_address = parse_var("BIND_ADDRESS", "0.0.0.0:3000")?;

        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| ConfigError::MissingVar("DATABASE_URL".to_string()))?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let allowed_origin = std::env::var("ALLOWED_ORIGIN")
            .unwrap_or_else(|_| "http://localhost:3000".to_string());

        // --- Load Completion Backend Settings ---
        let completion_backend = parse_var("COMPLETION_BACKEND", "ollama")?;
        let ollama_base_url = std::env::var("OLLAMA_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:11434".to_string());
        let chat_model = std::env::var("CHAT_MODEL").unwrap_or_else(|_| "llama3".to_string());
        let openai_api_key = std::env::var("OPENAI_API_KEY").ok();
        let backend_timeout = Duration::from_secs(parse_var("BACKEND_TIMEOUT_SECS", "60")?);

        // --- Load Default Generation Settings ---
        let mut default_profile = GenerationProfile::default();
        default_profile.set_temperature(parse_var("DEFAULT_TEMPERATURE", "0.5")?);
        default_profile.set_max_length(parse_var("DEFAULT_MAX_LENGTH", "100")?);
        default_profile.set_top_k(parse_var("DEFAULT_TOP_K", "40")?);
        default_profile.set_top_p(parse_var("DEFAULT_TOP_P", "0.85")?);
        default_profile.set_context_size(ContextSize::from_raw(parse_var(
            "DEFAULT_CONTEXT_SIZE",
            "5",
        )?));

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            allowed_origin,
            completion_backend,
            ollama_base_url,
            chat_model,
            openai_api_key,
            backend_timeout,
            default_profile,
        })
    }
}

/// Reads `name`, falling back to `default`, and parses it.
fn parse_var<T>(name: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = std::env::var(name).unwrap_or_else(|_| default.to_string());
    raw.parse::<T>()
        .map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string()))
}
