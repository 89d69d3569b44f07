//! services/api/src/bin/api.rs

use ai_chat_core::ports::CompletionService;
use api_lib::{
    adapters::{DbAdapter, InMemorySessionStore, OllamaChatAdapter, OpenAiChatAdapter},
    config::{CompletionBackend, Config},
    error::ApiError,
    web::{self, state::AppState},
};
use async_openai::{config::OpenAIConfig, Client};
use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let db_adapter = Arc::new(DbAdapter::new(db_pool));
    info!("Running database migrations...");
    db_adapter.run_migrations().await?;
    info!("Database migrations complete.");

    // --- 3. Initialize the Completion Backend ---
    let completion: Arc<dyn CompletionService> = match config.completion_backend {
        CompletionBackend::Ollama => {
            info!(
                "Using Ollama at {} with model {}",
                config.ollama_base_url, config.chat_model
            );
            Arc::new(OllamaChatAdapter::new(
                &config.ollama_base_url,
                config.chat_model.clone(),
                config.backend_timeout,
            )?)
        }
        CompletionBackend::OpenAi => {
            let openai_config = OpenAIConfig::new().with_api_key(
                config
                    .openai_api_key
                    .as_ref()
                    .ok_or(ApiError::MissingApiKey)?,
            );
            info!("Using OpenAI-compatible backend with model {}", config.chat_model);
            Arc::new(OpenAiChatAdapter::new(
                Client::with_config(openai_config),
                config.chat_model.clone(),
            ))
        }
    };

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState::new(
        completion,
        db_adapter,
        Arc::new(InMemorySessionStore::new()),
        config.default_profile.clone(),
        config.backend_timeout,
    ));

    // --- 5. Create the Web Router ---
    let allowed_origin = config
        .allowed_origin
        .parse::<HeaderValue>()
        .map_err(|e| ApiError::InvalidOrigin {
            origin: config.allowed_origin.clone(),
            reason: e.to_string(),
        })?;
    let app = web::router(app_state)
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(web::cors_layer(allowed_origin));

    // --- 6. Start the Server ---
    let shutdown = CancellationToken::new();
    let on_signal = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {:?}", e);
        }
        info!("Shutdown signal received.");
        on_signal.cancel();
    });

    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await?;

    info!("Server stopped.");
    Ok(())
}
