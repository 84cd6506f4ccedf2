//! API Server Entry Point
//!
//! Application entry point and server initialization.
//! Uses `anyhow` for startup errors, but application-level
//! errors should use `kernel::error::AppError`.

mod config;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use auth::{
    GoogleIdentityProvider, JwtTokenIssuer, MailTransport, PgAuthRepository, auth_router,
};
use axum::extract::State;
use axum::routing::get;
use axum::{
    Json, Router, http,
    http::{Method, header},
};
use platform::rate_limit::{InMemoryRateLimitStore, RateLimitConfig, now_ms};
use serde_json::json;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kernel::error::app_error::AppResult;

use crate::config::ApiConfig;

const CLEANUP_INTERVAL: Duration = Duration::from_secs(3600);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "api=info,auth=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ApiConfig::from_env()?;
    tracing::info!(production = config.production, "Configuration loaded");

    // Database connection
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&config.database_url)
        .await?;

    tracing::info!("Connected to database");

    // Run migrations
    sqlx::migrate!("../../../database/migrations")
        .run(&pool)
        .await?;

    tracing::info!("Migrations completed");

    // Startup cleanup: remove expired sessions and refresh tokens
    // Errors here should not prevent server startup
    let repo = PgAuthRepository::new(pool.clone());
    if let Err(e) = repo.purge_expired().await {
        tracing::warn!(error = %e, "Auth cleanup failed, continuing anyway");
    }

    let limits = Arc::new(InMemoryRateLimitStore::new());
    spawn_cleanup(
        PgAuthRepository::new(pool.clone()),
        limits.clone(),
        longest_window(&[
            config.auth.login_rate_limit.clone(),
            config.auth.session_rate_limit.clone(),
        ]),
    );

    // Adapters, built once and shared by every request
    let mailer = MailTransport::from_settings(config.smtp.as_ref(), &config.auth.mail_from)?;
    if matches!(mailer, MailTransport::Log(_)) {
        tracing::warn!("SMTP not configured; emails will only be logged");
    }
    let identity = GoogleIdentityProvider::new(config.google.clone())?;
    let tokens = Arc::new(JwtTokenIssuer::new(
        config.jwt_access_secret.as_bytes(),
        config.jwt_refresh_secret.as_bytes(),
        chrono::Duration::from_std(config.auth.refresh_ttl)?,
    ));

    // CORS configuration
    let allowed_origins: Vec<http::HeaderValue> = config
        .frontend_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods(AllowMethods::list([
            Method::GET,
            Method::POST,
            Method::OPTIONS,
        ]))
        .allow_headers(AllowHeaders::list([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
        ]))
        .allow_credentials(true);

    // Build router
    let health_routes = Router::new()
        .route("/health", get(health))
        .with_state(pool.clone());

    let app = Router::new()
        .merge(auth_router(
            repo,
            mailer,
            identity,
            tokens,
            config.auth,
            limits,
        ))
        .merge(health_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    // Start server
    tracing::info!("Listening on {}", config.bind_addr);

    let listener = TcpListener::bind(config.bind_addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    pool.close().await;
    tracing::info!("Database pool closed");

    Ok(())
}

/// GET /health
///
/// Pool or IO failures surface as 503 through the kernel's sqlx conversion.
async fn health(State(pool): State<PgPool>) -> AppResult<Json<serde_json::Value>> {
    sqlx::query("SELECT 1").execute(&pool).await?;
    Ok(Json(json!({"status": "ok"})))
}

fn longest_window(configs: &[RateLimitConfig]) -> RateLimitConfig {
    configs
        .iter()
        .max_by_key(|c| c.window_ms())
        .cloned()
        .unwrap_or_else(|| RateLimitConfig::new(1, 3600))
}

/// Hourly purge of expired sessions, refresh tokens and rate-limit windows
fn spawn_cleanup(
    repo: PgAuthRepository,
    limits: Arc<InMemoryRateLimitStore>,
    window: RateLimitConfig,
) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(CLEANUP_INTERVAL);
        // The first tick completes immediately; startup already cleaned.
        interval.tick().await;

        loop {
            interval.tick().await;

            if let Err(e) = repo.purge_expired().await {
                tracing::warn!(error = %e, "Periodic auth cleanup failed");
            }

            let purged = limits.purge_expired(&window, now_ms());
            tracing::debug!(purged, "Rate limit windows purged");
        }
    });
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, draining connections");
}
