use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

/// Which persistence backend the service runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
    pub probe_interval_secs: u64,
    pub request_wait_ms: u64,
}

impl DatabaseConfig {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }

    pub fn probe_interval(&self) -> Duration {
        Duration::from_secs(self.probe_interval_secs)
    }

    pub fn request_wait(&self) -> Duration {
        Duration::from_millis(self.request_wait_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub backend: StoreBackend,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    /// Accept the plain `User-ID` header as an identity claim.
    pub allow_header_identity: bool,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let backend = match lookup("STORE_BACKEND").as_deref() {
            None | Some("postgres") => StoreBackend::Postgres,
            Some("memory") => StoreBackend::Memory,
            Some(other) => anyhow::bail!("unknown STORE_BACKEND {other:?}"),
        };

        let url = lookup("DATABASE_URL");
        if backend == StoreBackend::Postgres && url.is_none() {
            anyhow::bail!("DATABASE_URL is required for the postgres backend");
        }

        let database = DatabaseConfig {
            url,
            max_connections: parsed(&lookup, "DB_MAX_CONNECTIONS", 10),
            acquire_timeout_secs: parsed(&lookup, "DB_ACQUIRE_TIMEOUT_SECS", 30),
            probe_interval_secs: parsed(&lookup, "DB_PROBE_INTERVAL_SECS", 10),
            request_wait_ms: parsed(&lookup, "DB_REQUEST_WAIT_MS", 2000),
        };

        let jwt = JwtConfig {
            secret: lookup("JWT_SECRET").context("JWT_SECRET is not set")?,
            issuer: lookup("JWT_ISSUER").unwrap_or_else(|| "sensitrack".into()),
            audience: lookup("JWT_AUDIENCE").unwrap_or_else(|| "sensitrack-users".into()),
            ttl_minutes: parsed(&lookup, "JWT_TTL_MINUTES", 60 * 24 * 30),
        };

        let allow_header_identity = lookup("ALLOW_HEADER_IDENTITY")
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(true);

        Ok(Self {
            host: lookup("APP_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: parsed(&lookup, "APP_PORT", 8080),
            backend,
            database,
            jwt,
            allow_header_identity,
        })
    }
}

fn parsed<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    lookup(key)
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}
