use async_trait::async_trait;
use futures::future::BoxFuture;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::debug;

use super::manager::DatabaseError;
use crate::config::DatabaseConfig;

/// Lifecycle events a transport can report after it was established
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportEvent {
    Closed,
    Error,
    Timeout,
}

/// The persistence layer as seen by [`ConnectionManager`](super::ConnectionManager).
///
/// `Transport` is the pooled connection to the server; `Handle` is the logical
/// reference to one named database obtained from it.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    type Transport: Clone + Send + Sync + 'static;
    type Handle: Clone + Send + Sync + 'static;

    async fn open(&self, database: &str) -> Result<Self::Transport, DatabaseError>;

    fn select(&self, transport: &Self::Transport, database: &str) -> Result<Self::Handle, DatabaseError>;

    /// Trivial round trip used for liveness
    async fn ping(&self, handle: &Self::Handle) -> Result<(), DatabaseError>;

    async fn close(&self, transport: &Self::Transport) -> Result<(), DatabaseError>;

    /// Resolves once the transport closes or fails
    fn lifecycle(&self, transport: &Self::Transport) -> BoxFuture<'static, TransportEvent>;
}

/// Logical handle to one Postgres database
#[derive(Debug, Clone)]
pub struct PgDatabase {
    name: String,
    pool: PgPool,
}

impl PgDatabase {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Postgres connector backed by an sqlx pool
#[derive(Debug, Clone)]
pub struct PgConnector {
    url: String,
    min_connections: u32,
    max_connections: u32,
    connect_timeout: Duration,
    idle_timeout: Duration,
    acquire_timeout: Duration,
}

impl PgConnector {
    pub fn from_config(config: &DatabaseConfig) -> Self {
        Self {
            url: config.url.clone(),
            min_connections: config.min_connections,
            max_connections: config.max_connections,
            connect_timeout: config.connect_timeout(),
            idle_timeout: config.idle_timeout(),
            acquire_timeout: config.acquire_timeout(),
        }
    }

    /// Swap the database name into the path of the server URL
    fn build_connection_string(&self, database: &str) -> Result<String, DatabaseError> {
        if !Self::is_valid_db_name(database) {
            return Err(DatabaseError::InvalidDatabaseName(database.to_string()));
        }

        let mut url = url::Url::parse(&self.url).map_err(|_| DatabaseError::InvalidDatabaseUrl)?;
        url.set_path(&format!("/{}", database));
        Ok(url.into())
    }

    /// Accept only [a-zA-Z0-9_]+ so a name can never smuggle URL syntax
    fn is_valid_db_name(name: &str) -> bool {
        !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
    }
}

#[async_trait]
impl Connector for PgConnector {
    type Transport = PgPool;
    type Handle = PgDatabase;

    async fn open(&self, database: &str) -> Result<PgPool, DatabaseError> {
        let connection_string = self.build_connection_string(database)?;

        let options = PgPoolOptions::new()
            .min_connections(self.min_connections)
            .max_connections(self.max_connections)
            .acquire_timeout(self.acquire_timeout)
            .idle_timeout(Some(self.idle_timeout));

        let pool = tokio::time::timeout(self.connect_timeout, options.connect(&connection_string))
            .await
            .map_err(|_| DatabaseError::Timeout(self.connect_timeout))??;

        debug!("Opened connection pool for: {}", database);
        Ok(pool)
    }

    fn select(&self, transport: &PgPool, database: &str) -> Result<PgDatabase, DatabaseError> {
        Ok(PgDatabase {
            name: database.to_string(),
            pool: transport.clone(),
        })
    }

    async fn ping(&self, handle: &PgDatabase) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(handle.pool()).await?;
        Ok(())
    }

    async fn close(&self, transport: &PgPool) -> Result<(), DatabaseError> {
        transport.close().await;
        Ok(())
    }

    /// sqlx only surfaces pool shutdown, so this never yields `Error` or
    /// `Timeout`; failed queries show up through `ping` instead
    fn lifecycle(&self, transport: &PgPool) -> BoxFuture<'static, TransportEvent> {
        let closed = transport.close_event();
        Box::pin(async move {
            closed.await;
            TransportEvent::Closed
        })
    }
}
