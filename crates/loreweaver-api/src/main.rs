//! Loreweaver API server entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use sqlx::sqlite::SqlitePoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use loreweaver_api::error::AppError;
use loreweaver_api::routes;
use loreweaver_api::state::AppState;
use loreweaver_core::clock::SystemClock;
use loreweaver_engine::turn::{EngineConfig, TurnEngine};
use loreweaver_provider::OllamaProvider;
use loreweaver_store::SqliteStore;

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(name: &str, default: &str) -> Result<T, AppError>
where
    T::Err: std::fmt::Display,
{
    env_or(name, default)
        .parse()
        .map_err(|e| AppError::Config(format!("{name} is invalid: {e}")))
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Initialize tracing subscriber.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting Loreweaver API server");

    // Read configuration from environment.
    let database_url = env_or("DATABASE_URL", "sqlite://loreweaver.db?mode=rwc");
    let host = env_or("HOST", "0.0.0.0");
    let port: u16 = env_parse("PORT", "3000")?;
    let ollama_base_url = env_or("OLLAMA_BASE_URL", "http://localhost:11434");
    let ollama_model = env_or("OLLAMA_MODEL", "llama3");
    let config = EngineConfig {
        history_window: env_parse("HISTORY_WINDOW", "10")?,
        summary_threshold: env_parse("SUMMARY_THRESHOLD", "10")?,
    };

    // Create database connection pool and apply the schema.
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await?;
    let store = Arc::new(SqliteStore::new(pool));
    store.migrate().await?;

    // Build application state.
    let provider = Arc::new(OllamaProvider::new(ollama_base_url, ollama_model));
    let clock = Arc::new(SystemClock);
    let engine = Arc::new(TurnEngine::new(
        store.clone(),
        provider,
        clock.clone(),
        config,
    ));
    let app_state = AppState::new(store, engine, clock);

    // Build router.
    // TODO: Replace CorsLayer::permissive() with restricted origins for production.
    let app = Router::new()
        .merge(routes::health::router())
        .nest(
            "/api/v1/sessions",
            routes::session::router().merge(routes::game::router()),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    // Start server.
    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .map_err(|e| AppError::Config(format!("invalid HOST:PORT combination: {e}")))?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app).await?;

    Ok(())
}
