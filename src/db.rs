//! Pool construction and connection supervision.
//!
//! The pool connects lazily. A background task probes it, applies pending
//! migrations on the first successful contact and publishes the current
//! [`DbState`]; the store only counts as connected once the schema is in
//! place. Requests arriving while the store is down wait a bounded time for
//! it to come back before failing with 503.

use std::{sync::Arc, time::Duration};

use anyhow::Context;
use async_trait::async_trait;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use sqlx::{postgres::PgPoolOptions, PgPool};
use tokio::{sync::watch, task::JoinHandle};
use tracing::{info, warn};

use crate::{config::DatabaseConfig, error::ApiError, state::AppState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DbState {
    Disconnected,
    Connected,
    Connecting,
    Disconnecting,
}

impl DbState {
    pub fn as_str(self) -> &'static str {
        match self {
            DbState::Disconnected => "disconnected",
            DbState::Connected => "connected",
            DbState::Connecting => "connecting",
            DbState::Disconnecting => "disconnecting",
        }
    }
}

/// Shared view of the connection state.
#[derive(Debug)]
pub struct ConnectionMonitor {
    tx: watch::Sender<DbState>,
}

impl ConnectionMonitor {
    pub fn new(initial: DbState) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    /// For backends without a connection to lose.
    pub fn always_connected() -> Self {
        Self::new(DbState::Connected)
    }

    pub fn current(&self) -> DbState {
        *self.tx.borrow()
    }

    pub fn set(&self, state: DbState) {
        self.tx.send_if_modified(|current| {
            if *current == state {
                return false;
            }
            *current = state;
            true
        });
    }

    /// Returns `false` if the store did not become connected within `timeout`.
    pub async fn wait_connected(&self, timeout: Duration) -> bool {
        let mut rx = self.tx.subscribe();
        let connected = matches!(
            tokio::time::timeout(timeout, rx.wait_for(|s| *s == DbState::Connected)).await,
            Ok(Ok(_))
        );
        connected
    }
}

pub fn connect_pool(cfg: &DatabaseConfig) -> anyhow::Result<PgPool> {
    let url = cfg.url.as_deref().context("DATABASE_URL is not set")?;
    let pool = PgPoolOptions::new()
        .max_connections(cfg.max_connections)
        .acquire_timeout(cfg.acquire_timeout())
        .connect_lazy(url)
        .context("parse DATABASE_URL")?;
    Ok(pool)
}

/// What the supervisor needs from a backend.
#[async_trait]
pub trait Probe: Send + Sync + 'static {
    async fn ping(&self) -> anyhow::Result<()>;
    /// Runs once, before the first `Connected`.
    async fn prepare(&self) -> anyhow::Result<()>;
}

#[async_trait]
impl Probe for PgPool {
    async fn ping(&self) -> anyhow::Result<()> {
        sqlx::query("SELECT 1").execute(self).await?;
        Ok(())
    }

    async fn prepare(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations")
            .run(self)
            .await
            .context("apply migrations")?;
        Ok(())
    }
}

const MIN_BACKOFF: Duration = Duration::from_millis(500);

/// Owns the probe task. Call [`Supervisor::shutdown`] before exit.
pub struct Supervisor {
    pool: PgPool,
    monitor: Arc<ConnectionMonitor>,
    task: JoinHandle<()>,
}

impl Supervisor {
    pub fn spawn(pool: PgPool, monitor: Arc<ConnectionMonitor>, interval: Duration) -> Self {
        monitor.set(DbState::Connecting);
        let task = tokio::spawn(probe_loop(pool.clone(), monitor.clone(), interval));
        Self {
            pool,
            monitor,
            task,
        }
    }

    pub async fn shutdown(self) {
        self.monitor.set(DbState::Disconnecting);
        self.task.abort();
        self.pool.close().await;
        self.monitor.set(DbState::Disconnected);
        info!("database connection closed");
    }
}

async fn probe_loop<P: Probe>(probe: P, monitor: Arc<ConnectionMonitor>, interval: Duration) {
    let mut backoff = MIN_BACKOFF;
    let mut prepared = false;
    loop {
        let outcome = async {
            probe.ping().await?;
            if !prepared {
                probe.prepare().await?;
                prepared = true;
                info!("database schema is up to date");
            }
            anyhow::Ok(())
        }
        .await;

        match outcome {
            Ok(_) => {
                if monitor.current() != DbState::Connected {
                    info!("database connected");
                }
                monitor.set(DbState::Connected);
                backoff = MIN_BACKOFF;
                tokio::time::sleep(interval).await;
            }
            Err(e) => {
                if monitor.current() == DbState::Connected {
                    warn!(error = %e, "database connection lost");
                } else {
                    warn!(error = ?e, retry_in = ?backoff, "database not ready");
                }
                monitor.set(DbState::Connecting);
                tokio::time::sleep(backoff).await;
                backoff = (backoff * 2).min(interval.max(MIN_BACKOFF));
            }
        }
    }
}

/// Gates store-backed routes on the connection state. `/` and `/health`
/// always pass.
pub async fn require_store(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let path = req.uri().path();
    if path == "/" || path == "/health" || state.connection.current() == DbState::Connected {
        return next.run(req).await;
    }
    if state
        .connection
        .wait_connected(state.config.database.request_wait())
        .await
    {
        next.run(req).await
    } else {
        ApiError::ServiceUnavailable.into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn waiters_wake_on_reconnect() {
        let monitor = Arc::new(ConnectionMonitor::new(DbState::Connecting));
        let flip = monitor.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            flip.set(DbState::Connected);
        });
        assert!(monitor.wait_connected(Duration::from_secs(2)).await);
        assert_eq!(monitor.current(), DbState::Connected);
    }

    #[tokio::test]
    async fn wait_gives_up_after_timeout() {
        let monitor = ConnectionMonitor::new(DbState::Disconnected);
        assert!(!monitor.wait_connected(Duration::from_millis(20)).await);
    }

    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Reachable, but the schema step fails `failures` times first.
    struct FlakySchema {
        failures: usize,
        attempts: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Probe for FlakySchema {
        async fn ping(&self) -> anyhow::Result<()> {
            Ok(())
        }

        async fn prepare(&self) -> anyhow::Result<()> {
            let n = self.attempts.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                anyhow::bail!("relation does not exist");
            }
            Ok(())
        }
    }

    struct Unreachable;

    #[async_trait]
    impl Probe for Unreachable {
        async fn ping(&self) -> anyhow::Result<()> {
            anyhow::bail!("connection refused")
        }

        async fn prepare(&self) -> anyhow::Result<()> {
            panic!("schema step must not run without a connection");
        }
    }

    #[tokio::test]
    async fn not_connected_until_schema_is_applied() {
        let monitor = Arc::new(ConnectionMonitor::new(DbState::Connecting));
        let attempts = Arc::new(AtomicUsize::new(0));
        let probe = FlakySchema {
            failures: 1,
            attempts: attempts.clone(),
        };
        let task = tokio::spawn(probe_loop(probe, monitor.clone(), Duration::from_millis(10)));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(monitor.current(), DbState::Connecting);

        assert!(monitor.wait_connected(Duration::from_secs(3)).await);
        assert_eq!(attempts.load(Ordering::SeqCst), 2);

        // later probes do not repeat the schema step
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
        task.abort();
    }

    #[tokio::test]
    async fn unreachable_store_never_reports_connected() {
        let monitor = Arc::new(ConnectionMonitor::new(DbState::Disconnected));
        let task = tokio::spawn(probe_loop(Unreachable, monitor.clone(), Duration::from_millis(10)));
        assert!(!monitor.wait_connected(Duration::from_millis(100)).await);
        assert_eq!(monitor.current(), DbState::Connecting);
        task.abort();
    }

    #[test]
    fn state_names_match_health_output() {
        assert_eq!(DbState::Connecting.as_str(), "connecting");
        assert_eq!(
            serde_json::to_value(DbState::Disconnecting).unwrap(),
            serde_json::json!("disconnecting")
        );
    }

    #[test]
    fn pool_requires_url() {
        let cfg = DatabaseConfig {
            url: None,
            max_connections: 1,
            acquire_timeout_secs: 1,
            probe_interval_secs: 1,
            request_wait_ms: 1,
        };
        assert!(connect_pool(&cfg).is_err());
    }
}
