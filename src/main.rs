//! Key-Gate Service - Main Application Entry Point
//!
//! HTTP service that issues short-lived access keys, binds them to client
//! hardware ids, and gates issuance behind a 3-step verification flow. The
//! display widgets that poll these endpoints are external; this binary owns
//! the key lifecycle, the step-gating rules, the audit log, and the admin
//! surface.
//!
//! # Architecture
//!
//! - **Web Framework**: Axum (async HTTP server)
//! - **Database**: PostgreSQL with sqlx (async queries, one shared pool)
//! - **Admin auth**: shared secret from configuration, digest comparison
//! - **Format**: JSON requests/responses, permissive CORS for the widgets
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment variables
//! 2. Create database connection pool
//! 3. Run database migrations
//! 4. Build HTTP router with routes and middleware
//! 5. Start server on configured port

mod config;
mod db;
mod error;
mod handlers;
mod keygen;
mod models;
mod services;
mod validation;

use tracing_subscriber::EnvFilter;

use axum::{
    Router,
    http::{Method, header},
    routing::{get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Shared application state injected into every handler.
///
/// Cloning is cheap: the pool is a handle and the config is small. No other
/// in-process mutable state exists, so the service replicates horizontally.
#[derive(Clone)]
pub struct AppState {
    pub pool: db::DbPool,
    pub config: config::Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging with tracing subscriber. Reads RUST_LOG environment variable (defaults to "info" level)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    // Load configuration
    let config = config::Config::from_env()?;
    tracing::info!("Configuration loaded");

    // Create database pool
    let pool = db::create_pool(&config.database_url).await?;
    tracing::info!("Database pool created");

    // Run migrations
    db::run_migrations(&pool).await?;
    tracing::info!("Database migrations complete");

    let server_port = config.server_port;
    let state = AppState { pool, config };

    // The widgets are served from other origins and preflight with OPTIONS;
    // these headers go out on every response.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    let app = Router::new()
        // Public routes
        .route("/health", get(handlers::health::health_check))
        // Key lifecycle
        .route("/key/{name}", get(handlers::keys::get_or_bind))
        .route("/create-key", post(handlers::keys::create_key))
        .route("/check-key/{name}", get(handlers::keys::check_key))
        // Step-gating flow
        .route("/step1", post(handlers::steps::step1))
        .route("/step2", post(handlers::steps::step2))
        .route("/step3", post(handlers::steps::step3))
        .route("/user-status/{hwid}", get(handlers::steps::user_status))
        // Admin surface (shared secret checked in the handlers)
        .route(
            "/create-default-key",
            post(handlers::admin::create_default_key),
        )
        .route("/admin/keys", get(handlers::admin::list_keys))
        .route("/admin/stats", get(handlers::admin::stats))
        // Unmatched routes answer with a JSON 404
        .fallback(handlers::not_found)
        // Add distributed tracing middleware for observability
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        // Share pool and config with all handlers via State extraction
        .with_state(state);

    // Bind to network address and start server
    let addr = format!("0.0.0.0:{}", server_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    // Start serving HTTP requests
    // This blocks forever, handling requests concurrently with tokio
    axum::serve(listener, app).await?;

    Ok(())
}
