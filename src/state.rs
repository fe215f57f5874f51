use std::{sync::Arc, time::Instant};

use crate::{
    auth::provider::{ProviderVerifier, TrustUpstream},
    config::{AppConfig, StoreBackend},
    db::{self, ConnectionMonitor, DbState, Supervisor},
    store::{MemoryStore, PgStore, Store},
};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub config: Arc<AppConfig>,
    pub connection: Arc<ConnectionMonitor>,
    pub provider: Arc<dyn ProviderVerifier>,
    pub started_at: Instant,
}

impl AppState {
    /// Builds the state for the configured backend. The postgres backend also
    /// returns the supervisor that owns its pool.
    pub fn init(config: AppConfig) -> anyhow::Result<(Self, Option<Supervisor>)> {
        let config = Arc::new(config);
        match config.backend {
            StoreBackend::Postgres => {
                let pool = db::connect_pool(&config.database)?;
                let connection = Arc::new(ConnectionMonitor::new(DbState::Disconnected));
                let supervisor = Supervisor::spawn(
                    pool.clone(),
                    connection.clone(),
                    config.database.probe_interval(),
                );
                let store = Arc::new(PgStore::new(pool)) as Arc<dyn Store>;
                let state =
                    Self::from_parts(store, config, connection, Arc::new(TrustUpstream));
                Ok((state, Some(supervisor)))
            }
            StoreBackend::Memory => Ok((Self::in_memory(config), None)),
        }
    }

    pub fn from_parts(
        store: Arc<dyn Store>,
        config: Arc<AppConfig>,
        connection: Arc<ConnectionMonitor>,
        provider: Arc<dyn ProviderVerifier>,
    ) -> Self {
        Self {
            store,
            config,
            connection,
            provider,
            started_at: Instant::now(),
        }
    }

    pub fn in_memory(config: Arc<AppConfig>) -> Self {
        Self::from_parts(
            Arc::new(MemoryStore::default()),
            config,
            Arc::new(ConnectionMonitor::always_connected()),
            Arc::new(TrustUpstream),
        )
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        use crate::config::{DatabaseConfig, JwtConfig};

        let config = Arc::new(AppConfig {
            host: "127.0.0.1".into(),
            port: 0,
            backend: StoreBackend::Memory,
            database: DatabaseConfig {
                url: None,
                max_connections: 1,
                acquire_timeout_secs: 1,
                probe_interval_secs: 1,
                request_wait_ms: 50,
            },
            jwt: JwtConfig {
                secret: "test".into(),
                issuer: "test".into(),
                audience: "test".into(),
                ttl_minutes: 5,
            },
            allow_header_identity: true,
        });
        Self::in_memory(config)
    }
}
