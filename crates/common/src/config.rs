use std::net::SocketAddr;

use serde::Deserialize;

/// Upper bound for `JWT_EXPIRY_HOURS`: one year.
pub const MAX_JWT_EXPIRY_HOURS: u64 = 24 * 365;

/// Global application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// PostgreSQL connection string
    pub database_url: String,

    /// Redis connection string (session revocation store)
    pub redis_url: String,

    /// JWT secret for API authentication
    pub jwt_secret: String,

    /// JWT token expiry in hours
    pub jwt_expiry_hours: u64,

    /// Maximum number of PostgreSQL connections in the pool (default: 20)
    pub db_max_connections: u32,

    /// Address the API server binds to
    pub bind_addr: SocketAddr,

    /// Mark the auth cookie `Secure` (only sent over HTTPS)
    pub cookie_secure: bool,

    /// Seconds between expired-notification sweeps; 0 disables the sweep
    pub notification_purge_interval_secs: u64,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let or_default =
            |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        Ok(Self {
            database_url: lookup("DATABASE_URL")
                .ok_or_else(|| anyhow::anyhow!("DATABASE_URL environment variable is required"))?,
            redis_url: or_default("REDIS_URL", "redis://localhost:6379"),
            jwt_secret: lookup("JWT_SECRET")
                .ok_or_else(|| anyhow::anyhow!("JWT_SECRET environment variable is required"))?,
            jwt_expiry_hours: parse_expiry_hours(&or_default("JWT_EXPIRY_HOURS", "24"))?,
            db_max_connections: or_default("DB_MAX_CONNECTIONS", "20")
                .parse()
                .map_err(|_| anyhow::anyhow!("DB_MAX_CONNECTIONS must be a valid u32"))?,
            bind_addr: or_default("API_BIND_ADDR", "0.0.0.0:3000")
                .parse()
                .map_err(|_| anyhow::anyhow!("API_BIND_ADDR must be a socket address"))?,
            cookie_secure: parse_bool(&or_default("AUTH_COOKIE_SECURE", "false"))
                .ok_or_else(|| anyhow::anyhow!("AUTH_COOKIE_SECURE must be true or false"))?,
            notification_purge_interval_secs: or_default(
                "NOTIFICATION_PURGE_INTERVAL_SECS",
                "3600",
            )
            .parse()
            .map_err(|_| anyhow::anyhow!("NOTIFICATION_PURGE_INTERVAL_SECS must be a valid u64"))?,
        })
    }
}

fn parse_expiry_hours(raw: &str) -> anyhow::Result<u64> {
    let hours: u64 = raw
        .trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("JWT_EXPIRY_HOURS must be a valid u64"))?;
    if !(1..=MAX_JWT_EXPIRY_HOURS).contains(&hours) {
        anyhow::bail!(
            "JWT_EXPIRY_HOURS must be between 1 and {}, got {}",
            MAX_JWT_EXPIRY_HOURS,
            hours
        );
    }
    Ok(hours)
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
