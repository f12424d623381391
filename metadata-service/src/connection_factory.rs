//! Connection factory.
//!
//! Opens one PostgreSQL pool per request from the credentials in the request
//! body. The returned [`ManagedPool`] must be closed by the caller on every
//! exit path; the factory counts pools that have not been released yet.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use common::config::AppConfig;
use common::errors::{AppError, AppResult};
use common::models::ConnectionParams;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{ConnectOptions, Connection, PgPool};

/// Database used when the request does not select one.
pub const MAINTENANCE_DATABASE: &str = "postgres";

const APPLICATION_NAME: &str = "metadata-service";

/// Builds request-scoped connection pools.
pub struct ConnectionFactory {
    max_connections: u32,
    connect_timeout: Duration,
    open_pools: Arc<AtomicUsize>,
}

impl ConnectionFactory {
    /// Creates a factory using the pool limits from `config`.
    pub fn new(config: &AppConfig) -> Self {
        Self {
            max_connections: config.max_connections,
            connect_timeout: config.connect_timeout(),
            open_pools: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Opens a pool against `database`, or the maintenance database when `None`.
    ///
    /// Makes a single handshake bounded by the connect timeout so bad
    /// credentials or an unreachable server surface here with their own cause.
    /// The request pool itself is lazy and reuses the verified options.
    pub async fn open(
        &self,
        params: &ConnectionParams,
        database: Option<&str>,
    ) -> AppResult<ManagedPool> {
        let options = connect_options(params, database);
        let conn = tokio::time::timeout(self.connect_timeout, options.connect())
            .await
            .map_err(|_| {
                AppError::DatabaseConnection(format!(
                    "connect timed out after {}s",
                    self.connect_timeout.as_secs()
                ))
            })?
            .map_err(AppError::from_connect_error)?;
        if let Err(e) = conn.close().await {
            tracing::debug!(error = %e, "handshake connection close failed");
        }

        let pool = PgPoolOptions::new()
            .max_connections(self.max_connections)
            .acquire_timeout(self.connect_timeout)
            .connect_lazy_with(options);

        tracing::debug!(
            host = %params.host,
            port = params.port,
            database = database.unwrap_or(MAINTENANCE_DATABASE),
            "connection pool opened"
        );
        Ok(self.track(pool))
    }

    /// Number of pools opened and not yet released.
    pub fn open_pools(&self) -> usize {
        self.open_pools.load(Ordering::SeqCst)
    }

    fn track(&self, pool: PgPool) -> ManagedPool {
        self.open_pools.fetch_add(1, Ordering::SeqCst);
        ManagedPool {
            pool,
            open_pools: Arc::clone(&self.open_pools),
            released: false,
        }
    }
}

/// Connect options for one request.
///
/// `.pgpass` is never consulted and the password is always set explicitly, so
/// the server's own credentials cannot leak to a caller-chosen host.
pub fn connect_options(params: &ConnectionParams, database: Option<&str>) -> PgConnectOptions {
    PgConnectOptions::new_without_pgpass()
        .host(&params.host)
        .port(params.port)
        .username(&params.user)
        .password(&params.password)
        .database(database.unwrap_or(MAINTENANCE_DATABASE))
        .application_name(APPLICATION_NAME)
}

/// A request-scoped pool that is released exactly once.
pub struct ManagedPool {
    pool: PgPool,
    open_pools: Arc<AtomicUsize>,
    released: bool,
}

impl ManagedPool {
    /// The underlying pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Closes every connection and releases the pool.
    pub async fn close(mut self) {
        self.pool.close().await;
        self.release();
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.open_pools.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

// Covers futures dropped mid-request (client disconnects).
impl Drop for ManagedPool {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> ConnectionParams {
        serde_json::from_value(serde_json::json!({
            "host": "db.internal",
            "port": 6432,
            "user": "reader",
            "password": "secret",
        }))
        .unwrap()
    }

    fn lazy_pool() -> PgPool {
        PgPoolOptions::new().connect_lazy_with(connect_options(&params(), None))
    }

    #[test]
    fn test_connect_options_default_to_maintenance_database() {
        let options = connect_options(&params(), None);
        assert_eq!(options.get_host(), "db.internal");
        assert_eq!(options.get_port(), 6432);
        assert_eq!(options.get_username(), "reader");
        assert_eq!(options.get_database(), Some(MAINTENANCE_DATABASE));

        let options = connect_options(&params(), Some("shop"));
        assert_eq!(options.get_database(), Some("shop"));
    }

    #[tokio::test]
    async fn test_close_releases_pool() {
        let factory = ConnectionFactory::new(&AppConfig::default());
        let pool = factory.track(lazy_pool());
        assert_eq!(factory.open_pools(), 1);

        pool.close().await;
        assert_eq!(factory.open_pools(), 0);
    }

    #[tokio::test]
    async fn test_drop_releases_pool_once() {
        let factory = ConnectionFactory::new(&AppConfig::default());
        let first = factory.track(lazy_pool());
        let second = factory.track(lazy_pool());
        assert_eq!(factory.open_pools(), 2);

        drop(first);
        assert_eq!(factory.open_pools(), 1);

        second.close().await;
        assert_eq!(factory.open_pools(), 0);
    }

    #[tokio::test]
    async fn test_unreachable_server_is_connection_error() {
        let mut config = AppConfig::default();
        config.connect_timeout_secs = 1;
        let factory = ConnectionFactory::new(&config);

        let mut params = params();
        params.host = "127.0.0.1".into();
        params.port = 1;

        let result = factory.open(&params, None).await;
        assert!(matches!(result, Err(AppError::DatabaseConnection(_))));
        assert_eq!(factory.open_pools(), 0);
    }

    #[tokio::test]
    async fn test_refused_connection_fails_fast_with_cause() {
        let mut config = AppConfig::default();
        config.connect_timeout_secs = 5;
        let factory = ConnectionFactory::new(&config);

        let mut params = params();
        params.host = "127.0.0.1".into();
        params.port = 1;

        let started = std::time::Instant::now();
        let result = factory.open(&params, None).await;
        let elapsed = started.elapsed();

        match result {
            Err(AppError::DatabaseConnection(msg)) => {
                assert!(!msg.contains("pool timed out"), "message: {msg}")
            }
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
        assert!(elapsed < Duration::from_secs(2), "took {elapsed:?}");
        assert_eq!(factory.open_pools(), 0);
    }
}
