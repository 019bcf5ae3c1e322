//! Patient Registry server
//! Serves the JSON API over HTTP backed by a single SQLite file

use anyhow::{Context, Result};
use clap::Parser;
use dotenv::dotenv;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use tokio::{net::TcpListener, time::interval};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use patient_registry::{
    api::create_router,
    auth::{JwtHandler, UserStore},
    config::AppConfig,
    db::Database,
    middleware::RateLimitLayer,
    state::AppState,
};

#[tokio::main]
async fn main() -> Result<()> {
    load_env();
    init_tracing();

    let config = AppConfig::parse();

    info!("Patient registry starting");

    let db = Database::open(&config.database_path)?;
    info!("Database initialized at: {}", config.database_path);

    let users = UserStore::new(db.clone()).with_bcrypt_cost(config.bcrypt_cost);
    let jwt_handler =
        JwtHandler::new(config.jwt_secret()).with_expiration_hours(config.jwt_expiration_hours);
    let state = AppState::new(db, users, jwt_handler);

    let auth_limiter = RateLimitLayer::new(config.rate_limit());
    spawn_rate_limit_cleanup(auth_limiter.clone());

    let app = create_router(state, auth_limiter);

    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    info!("API server listening on {}", config.bind_addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("Server error")?;

    Ok(())
}

fn spawn_rate_limit_cleanup(limiter: RateLimitLayer) {
    tokio::spawn(async move {
        let mut ticker = interval(Duration::from_secs(60));
        loop {
            ticker.tick().await;
            limiter.cleanup();
        }
    });
}

/// Initialize tracing; RUST_LOG overrides the default filter
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "patient_registry=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn load_env() {
    // Standard dotenv search (cwd + parents)
    let _ = dotenv();

    // Also try the crate's own .env when started from elsewhere
    let manifest_env = Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
    if manifest_env.exists() {
        let _ = dotenv::from_path(&manifest_env);
    }
}
