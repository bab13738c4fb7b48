use std::time::Duration;

use sqlx::{
    pool::PoolConnection,
    postgres::{PgConnectOptions, PgPoolOptions},
    PgPool, Postgres,
};
use tlog_config::DatabaseConfig;
use tlog_types::{StorageError, StorageResult};

use crate::StorageProcessor;

pub mod holder;

const DEFAULT_POOL_SIZE: u32 = 10;

/// Builds a `ConnectionPool` from either explicit overrides or a loaded
/// `DatabaseConfig` (spec §5: pool size and statement timeout are runtime
/// knobs consulted through the ambient configuration layer).
#[derive(Debug)]
pub struct ConnectionPoolBuilder {
    url: String,
    max_size: u32,
    statement_timeout: Option<Duration>,
}

impl ConnectionPoolBuilder {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_size: DEFAULT_POOL_SIZE,
            statement_timeout: None,
        }
    }

    pub fn from_config(config: &DatabaseConfig) -> Self {
        Self {
            url: config.url.clone(),
            max_size: config.pool_size,
            statement_timeout: config.statement_timeout(),
        }
    }

    pub fn set_max_size(&mut self, max_size: u32) -> &mut Self {
        self.max_size = max_size;
        self
    }

    pub fn set_statement_timeout(&mut self, timeout: Option<Duration>) -> &mut Self {
        self.statement_timeout = timeout;
        self
    }

    pub async fn build(&self) -> StorageResult<ConnectionPool> {
        let options = PgPoolOptions::new().max_connections(self.max_size);
        let mut connect_options: PgConnectOptions = self
            .url
            .parse()
            .map_err(|e| StorageError::internal(format!("invalid database url: {e}")))?;
        if let Some(timeout) = self.statement_timeout {
            let timeout_string = format!("{}s", timeout.as_secs());
            connect_options = connect_options.options([("statement_timeout", timeout_string)]);
        }
        let pool = options.connect_with(connect_options).await?;
        Ok(ConnectionPool(pool))
    }
}

/// A single pool over the primary Postgres database (spec §5: "single
/// primary DB assumed" — no read-replica/prover split as in the teacher).
#[derive(Debug, Clone)]
pub struct ConnectionPool(PgPool);

impl ConnectionPool {
    pub fn builder(url: impl Into<String>) -> ConnectionPoolBuilder {
        ConnectionPoolBuilder::new(url)
    }

    pub fn inner(&self) -> &PgPool {
        &self.0
    }

    pub fn size(&self) -> u32 {
        self.0.size()
    }

    pub async fn access_storage(&self) -> StorageResult<StorageProcessor<'_>> {
        let conn = Self::acquire_connection_retried(&self.0).await?;
        Ok(StorageProcessor::from_pool(conn))
    }

    async fn acquire_connection_retried(pool: &PgPool) -> StorageResult<PoolConnection<Postgres>> {
        const DB_CONNECTION_RETRIES: u32 = 3;
        const BACKOFF_INTERVAL: Duration = Duration::from_secs(1);

        let mut retry_count = 0;
        loop {
            match pool.acquire().await {
                Ok(connection) => return Ok(connection),
                Err(err) if retry_count < DB_CONNECTION_RETRIES => {
                    tracing::warn!("failed acquiring a DB connection, retrying: {err}");
                    retry_count += 1;
                    tokio::time::sleep(BACKOFF_INTERVAL).await;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }
}
