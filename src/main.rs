//! Prototype Studio Backend
//!
//! Stores generated artifacts with an append-only version history, forward-only
//! reverts and chat-message undo, persisted in SQLite.

mod api;
mod auth;
mod config;
mod db;
mod errors;
mod events;
mod history;
mod models;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::{Config, LogFormat};
use db::Repository;
use events::EventBus;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub events: Arc<EventBus>,
    pub config: Arc<Config>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let registry = tracing_subscriber::registry().with(env_filter);
    match config.log_format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }

    tracing::info!("Starting Prototype Studio Backend");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Bind address: {}", config.bind_addr);

    if config.api_psk.is_none() {
        tracing::warn!("No API PSK configured (STUDIO_API_PSK). Authentication is disabled!");
    }

    let pool = db::init_database(&config.db_path).await?;
    let repo = Arc::new(Repository::new(pool));

    // A crash between append and pointer update leaves the pointer behind
    let repaired = repo.reconcile_pointers().await?;
    if repaired > 0 {
        tracing::warn!("Reconciled current version of {} artifacts", repaired);
    }

    let state = AppState {
        repo,
        events: Arc::new(EventBus::new(config.event_capacity)),
        config: Arc::new(config.clone()),
    };

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let psk = state.config.api_psk.clone();

    let api_routes = Router::new()
        // Artifacts
        .route(
            "/artifacts",
            get(api::list_artifacts).post(api::create_artifact),
        )
        .route(
            "/artifacts/{id}",
            get(api::get_artifact)
                .put(api::update_artifact)
                .delete(api::delete_artifact),
        )
        // Version history
        .route(
            "/artifacts/{id}/versions",
            get(api::list_versions).post(api::append_version),
        )
        .route("/artifacts/{id}/versions/{number}", get(api::get_version))
        .route("/artifacts/{id}/revert", post(api::revert_version))
        // Conversation
        .route(
            "/artifacts/{id}/messages",
            get(api::list_messages).post(api::add_message),
        )
        .route(
            "/artifacts/{id}/messages/{message_id}/revert",
            post(api::revert_to_message),
        )
        .route("/artifacts/{id}/events", get(api::artifact_events))
        .layer(middleware::from_fn(move |req, next| {
            auth::require_api_key(psk.clone(), req, next)
        }));

    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}
