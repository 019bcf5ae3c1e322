//! Server configuration
//!
//! Every option can be passed as a flag or through the environment
//! (a `.env` file is loaded before parsing).

use crate::auth::jwt::DEFAULT_EXPIRATION_HOURS;
use crate::middleware::RateLimitConfig;
use clap::Parser;
use std::net::SocketAddr;
use std::time::Duration;
use tracing::warn;

/// One year
const MAX_EXPIRATION_HOURS: i64 = 8760;

const DEV_JWT_SECRET: &str = "dev-secret-change-in-production-minimum-32-characters";

#[derive(Parser, Debug, Clone)]
#[command(name = "patient-registry")]
#[command(about = "Patient, doctor and assignment records over a JSON API")]
pub struct AppConfig {
    /// Address the HTTP server binds to
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:3000")]
    pub bind_addr: SocketAddr,

    /// Path to the SQLite database file
    #[arg(long, env = "DATABASE_PATH", default_value = "patient_registry.db")]
    pub database_path: String,

    /// HS256 signing secret for access tokens
    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: Option<String>,

    /// Access token lifetime in hours
    #[arg(
        long,
        env = "JWT_EXPIRATION_HOURS",
        default_value_t = DEFAULT_EXPIRATION_HOURS,
        value_parser = clap::value_parser!(i64).range(1..=MAX_EXPIRATION_HOURS)
    )]
    pub jwt_expiration_hours: i64,

    /// bcrypt work factor for password hashes
    #[arg(
        long,
        env = "BCRYPT_COST",
        default_value_t = bcrypt::DEFAULT_COST,
        value_parser = clap::value_parser!(u32).range(4..=31)
    )]
    pub bcrypt_cost: u32,

    /// Requests per minute allowed on /register and /login, per client IP
    #[arg(long, env = "AUTH_RATE_LIMIT_PER_MINUTE", default_value_t = 20)]
    pub auth_rate_limit_per_minute: u32,

    /// Extra requests tolerated above the per-minute limit
    #[arg(long, env = "AUTH_RATE_LIMIT_BURST", default_value_t = 5)]
    pub auth_rate_limit_burst: u32,
}

impl AppConfig {
    /// Falls back to a fixed development secret when none is configured
    pub fn jwt_secret(&self) -> String {
        match &self.jwt_secret {
            Some(secret) if !secret.trim().is_empty() => secret.clone(),
            _ => {
                warn!("JWT_SECRET not set, using the development secret");
                DEV_JWT_SECRET.to_string()
            }
        }
    }

    pub fn rate_limit(&self) -> RateLimitConfig {
        RateLimitConfig {
            max_requests: self.auth_rate_limit_per_minute,
            window: Duration::from_secs(60),
            burst: self.auth_rate_limit_burst,
        }
    }
}
