//! Configuration Module
//!
//! Handles loading and managing service configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Result};

use crate::auth::Credentials;
use crate::cache::{CacheTier, TierSettings, DEFAULT_TIER_CAPACITY};

/// Deployment mode; production hides upstream error details from clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("production") {
            Environment::Production
        } else {
            Environment::Development
        }
    }
}

/// Service configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP port of the administrative surface
    pub server_port: u16,
    pub environment: Environment,
    /// Upstream login endpoint
    pub auth_url: String,
    /// Upstream SQL execution endpoint
    pub sql_url: String,
    pub credentials: Credentials,
    /// Local token lifetime in seconds
    pub token_ttl: u64,
    /// Seconds trimmed from an advertised token lifetime
    pub token_safety_margin: u64,
    /// Remote SQL timeout in seconds
    pub query_timeout: u64,
    /// Login timeout in seconds
    pub auth_timeout: u64,
    /// Maximum rows accepted from a single query
    pub max_fetch_rows: usize,
    /// Per-tier (ttl seconds, capacity), indexed by [`CacheTier::index`]
    pub tiers: [(u64, usize); 4],
    /// Background expiry sweep interval in seconds, 0 disables it
    pub cleanup_interval: u64,
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn env_string(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn tier_env_prefix(tier: CacheTier) -> &'static str {
    match tier {
        CacheTier::Summary => "SUMMARY",
        CacheTier::Detail => "DETAIL",
        CacheTier::Export => "EXPORT",
        CacheTier::Analytics => "ANALYTICS",
    }
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - Admin HTTP port (default: 13456)
    /// - `APP_ENV` - `production` or anything else (default: development)
    /// - `AUTH_URL`, `SQL_URL` - Upstream endpoints (required)
    /// - `AUTH_USERNAME`, `AUTH_PASSWORD`, `AUTH_GRANT_TYPE`, `AUTH_CLIENT_ID`,
    ///   `AUTH_CLIENT_SECRET` - Login body
    /// - `TOKEN_TTL` - Local token lifetime in seconds (default: 3000)
    /// - `TOKEN_SAFETY_MARGIN` - Seconds trimmed from `expires_in` (default: 60)
    /// - `QUERY_TIMEOUT` - SQL timeout in seconds (default: 120)
    /// - `AUTH_TIMEOUT` - Login timeout in seconds (default: 30)
    /// - `MAX_FETCH_ROWS` - Row cap per query (default: 50000)
    /// - `<TIER>_TTL`, `<TIER>_CAPACITY` - Per tier, `<TIER>` one of
    ///   `SUMMARY`, `DETAIL`, `EXPORT`, `ANALYTICS`
    /// - `CLEANUP_INTERVAL` - Sweep frequency in seconds (default: 60)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let mut tiers = defaults.tiers;
        for tier in CacheTier::ALL {
            let prefix = tier_env_prefix(tier);
            let (ttl, capacity) = tiers[tier.index()];
            tiers[tier.index()] = (
                env_or(&format!("{}_TTL", prefix), ttl),
                env_or(&format!("{}_CAPACITY", prefix), capacity),
            );
        }

        Self {
            server_port: env_or("SERVER_PORT", defaults.server_port),
            environment: env::var("APP_ENV")
                .map(|v| Environment::parse(&v))
                .unwrap_or(defaults.environment),
            auth_url: env_string("AUTH_URL", &defaults.auth_url),
            sql_url: env_string("SQL_URL", &defaults.sql_url),
            credentials: Credentials {
                username: env_string("AUTH_USERNAME", &defaults.credentials.username),
                password: env_string("AUTH_PASSWORD", &defaults.credentials.password),
                grant_type: env_string("AUTH_GRANT_TYPE", &defaults.credentials.grant_type),
                client_id: env_string("AUTH_CLIENT_ID", &defaults.credentials.client_id),
                client_secret: env_string("AUTH_CLIENT_SECRET", &defaults.credentials.client_secret),
            },
            token_ttl: env_or("TOKEN_TTL", defaults.token_ttl),
            token_safety_margin: env_or("TOKEN_SAFETY_MARGIN", defaults.token_safety_margin),
            query_timeout: env_or("QUERY_TIMEOUT", defaults.query_timeout),
            auth_timeout: env_or("AUTH_TIMEOUT", defaults.auth_timeout),
            max_fetch_rows: env_or("MAX_FETCH_ROWS", defaults.max_fetch_rows),
            tiers,
            cleanup_interval: env_or("CLEANUP_INTERVAL", defaults.cleanup_interval),
        }
    }

    /// Rejects configurations the service cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.auth_url.trim().is_empty() {
            bail!("AUTH_URL must be set");
        }
        if self.sql_url.trim().is_empty() {
            bail!("SQL_URL must be set");
        }
        if self.token_ttl == 0 {
            bail!("TOKEN_TTL must be greater than zero");
        }
        if self.query_timeout == 0 {
            bail!("QUERY_TIMEOUT must be greater than zero");
        }
        if self.max_fetch_rows == 0 {
            bail!("MAX_FETCH_ROWS must be greater than zero");
        }
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    pub fn tier_settings(&self, tier: CacheTier) -> TierSettings {
        let (ttl, capacity) = self.tiers[tier.index()];
        TierSettings::new(Duration::from_secs(ttl), capacity)
    }

    pub fn token_ttl(&self) -> Duration {
        Duration::from_secs(self.token_ttl)
    }

    pub fn token_safety_margin(&self) -> Duration {
        Duration::from_secs(self.token_safety_margin)
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout)
    }

    pub fn auth_timeout(&self) -> Duration {
        Duration::from_secs(self.auth_timeout)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 13456,
            environment: Environment::Development,
            auth_url: String::new(),
            sql_url: String::new(),
            credentials: Credentials {
                username: String::new(),
                password: String::new(),
                grant_type: "password".to_string(),
                client_id: "null".to_string(),
                client_secret: "null".to_string(),
            },
            token_ttl: 3000,
            token_safety_margin: 60,
            query_timeout: 120,
            auth_timeout: 30,
            max_fetch_rows: 50_000,
            tiers: [
                (1800, DEFAULT_TIER_CAPACITY),
                (1800, DEFAULT_TIER_CAPACITY),
                (600, DEFAULT_TIER_CAPACITY),
                (3600, DEFAULT_TIER_CAPACITY),
            ],
            cleanup_interval: 60,
        }
    }
}
