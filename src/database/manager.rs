use futures::future::{BoxFuture, FutureExt, Shared};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::connector::{Connector, TransportEvent};
use crate::config::DatabaseConfig;

/// Errors from ConnectionManager and the stores built on top of it
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Invalid database URL")]
    InvalidDatabaseUrl,

    #[error("Invalid database name: {0}")]
    InvalidDatabaseName(String),

    #[error("Database is not connected")]
    NotConnected,

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Outcome of an exhausted establishment sequence. Cloneable so every caller
/// waiting on the same attempt observes the same failure.
#[derive(Debug, Clone, Error)]
#[error("failed to connect to database after {attempts} attempt(s): {last}")]
pub struct ConnectError {
    pub attempts: u32,
    #[source]
    pub last: Arc<DatabaseError>,
}

/// Exponential backoff between connection attempts
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub multiplier: f64,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1_000),
            multiplier: 2.0,
            max_delay: Duration::from_millis(10_000),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &DatabaseConfig) -> Self {
        Self {
            max_attempts: config.max_retries.max(1),
            base_delay: Duration::from_millis(config.retry_base_delay_ms),
            multiplier: config.retry_multiplier,
            max_delay: Duration::from_millis(config.retry_max_delay_ms),
        }
    }

    /// Delay after the failed attempt with 0-based index `attempt`:
    /// `min(base * multiplier^attempt, max_delay)`
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(i32::MAX as u32) as i32;
        let base_ms = self.base_delay.as_millis() as f64;
        let cap_ms = self.max_delay.as_millis() as f64;
        let delay_ms = (base_ms * self.multiplier.powi(exponent)).min(cap_ms);
        Duration::from_millis(delay_ms as u64)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    Healthy,
    Unhealthy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthStatus {
    pub status: HealthState,
    pub message: String,
}

impl HealthStatus {
    fn healthy(message: impl Into<String>) -> Self {
        Self { status: HealthState::Healthy, message: message.into() }
    }

    fn unhealthy(message: impl Into<String>) -> Self {
        Self { status: HealthState::Unhealthy, message: message.into() }
    }

    pub fn is_healthy(&self) -> bool {
        self.status == HealthState::Healthy
    }
}

type SharedAttempt<H> = Shared<BoxFuture<'static, Result<H, ConnectError>>>;

struct ConnectionState<C: Connector> {
    handle: Option<C::Handle>,
    transport: Option<C::Transport>,
    /// Bumped on every successful connect so lifecycle hooks of a replaced
    /// transport cannot clear its successor
    generation: u64,
    connecting: Option<SharedAttempt<C::Handle>>,
}

struct Inner<C: Connector> {
    connector: C,
    database: String,
    policy: RetryPolicy,
    state: Mutex<ConnectionState<C>>,
}

/// Owns the single live database handle for the process.
///
/// Construct one at startup and hand clones to whatever needs the database;
/// clones share the same connection state.
pub struct ConnectionManager<C: Connector> {
    inner: Arc<Inner<C>>,
}

impl<C: Connector> Clone for ConnectionManager<C> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<C: Connector> ConnectionManager<C> {
    pub fn new(connector: C, database: impl Into<String>, policy: RetryPolicy) -> Self {
        Self {
            inner: Arc::new(Inner {
                connector,
                database: database.into(),
                policy,
                state: Mutex::new(ConnectionState {
                    handle: None,
                    transport: None,
                    generation: 0,
                    connecting: None,
                }),
            }),
        }
    }

    pub fn database_name(&self) -> &str {
        &self.inner.database
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.inner.policy
    }

    /// Return the shared handle, establishing the connection if needed.
    ///
    /// Callers arriving while an attempt is in flight await that attempt and
    /// observe its result instead of starting their own. The attempt runs on
    /// its own task, so it finishes even if every caller stops waiting.
    pub async fn connect(&self) -> Result<C::Handle, ConnectError> {
        let attempt = {
            let mut state = self.inner.lock();
            if let Some(handle) = &state.handle {
                return Ok(handle.clone());
            }
            if let Some(attempt) = state.connecting.clone() {
                debug!("Waiting for in-flight connection to '{}'", self.inner.database);
                attempt
            } else {
                let attempt = self.inner.spawn_attempt();
                state.connecting = Some(attempt.clone());
                attempt
            }
        };

        attempt.await
    }

    /// Stored handle; never connects
    pub fn get_handle(&self) -> Result<C::Handle, DatabaseError> {
        self.inner.lock().handle.clone().ok_or(DatabaseError::NotConnected)
    }

    /// Stored transport; never connects
    pub fn get_transport(&self) -> Result<C::Transport, DatabaseError> {
        self.inner.lock().transport.clone().ok_or(DatabaseError::NotConnected)
    }

    pub fn is_connected(&self) -> bool {
        let state = self.inner.lock();
        state.handle.is_some() && state.transport.is_some()
    }

    /// Close the transport if one is held. References are cleared even if
    /// closing fails.
    pub async fn close(&self) {
        let transport = {
            let mut state = self.inner.lock();
            state.handle = None;
            state.transport.take()
        };

        if let Some(transport) = transport {
            match self.inner.connector.close(&transport).await {
                Ok(()) => info!("Closed database connection to '{}'", self.inner.database),
                Err(e) => warn!("Error closing database connection to '{}': {}", self.inner.database, e),
            }
        }
    }

    /// Ping the stored handle. A failed ping clears the connection so the
    /// next `connect()` re-establishes it.
    pub async fn health_check(&self) -> HealthStatus {
        let (handle, generation) = {
            let state = self.inner.lock();
            match (&state.handle, &state.transport) {
                (Some(handle), Some(_)) => (handle.clone(), state.generation),
                _ => return HealthStatus::unhealthy("Database not connected"),
            }
        };

        match self.inner.connector.ping(&handle).await {
            Ok(()) => HealthStatus::healthy("Database connection is healthy"),
            Err(e) => {
                warn!("Database health check failed for '{}': {}", self.inner.database, e);
                self.inner.discard(generation).await;
                HealthStatus::unhealthy(format!("Database ping failed: {}", e))
            }
        }
    }
}

impl<C: Connector> Inner<C> {
    fn lock(&self) -> MutexGuard<'_, ConnectionState<C>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn spawn_attempt(self: &Arc<Self>) -> SharedAttempt<C::Handle> {
        let task = tokio::spawn(Arc::clone(self).establish());
        let inner = Arc::clone(self);

        async move {
            match task.await {
                Ok(result) => result,
                Err(e) => {
                    error!("Connection task for '{}' did not finish: {}", inner.database, e);
                    inner.lock().connecting = None;
                    Err(ConnectError {
                        attempts: 0,
                        last: Arc::new(DatabaseError::Transport(e.to_string())),
                    })
                }
            }
        }
        .boxed()
        .shared()
    }

    async fn establish(self: Arc<Self>) -> Result<C::Handle, ConnectError> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            match self.open_and_probe().await {
                Ok((transport, handle)) => {
                    let generation = {
                        let mut state = self.lock();
                        state.generation += 1;
                        state.handle = Some(handle.clone());
                        state.transport = Some(transport.clone());
                        state.connecting = None;
                        state.generation
                    };
                    self.watch(&transport, generation);
                    info!(
                        "Connected to database '{}' on attempt {}/{}",
                        self.database, attempt, max_attempts
                    );
                    return Ok(handle);
                }
                Err(e) if attempt >= max_attempts => {
                    error!(
                        "Giving up connecting to database '{}' after {} attempt(s): {}",
                        self.database, attempt, e
                    );
                    self.lock().connecting = None;
                    return Err(ConnectError { attempts: attempt, last: Arc::new(e) });
                }
                Err(e) => {
                    let delay = self.policy.delay_for(attempt - 1);
                    warn!(
                        "Database connection attempt {}/{} failed: {}; retrying in {:?}",
                        attempt, max_attempts, e, delay
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// One attempt: open, select the database, ping
    async fn open_and_probe(&self) -> Result<(C::Transport, C::Handle), DatabaseError> {
        let transport = self.connector.open(&self.database).await?;

        let probed = match self.connector.select(&transport, &self.database) {
            Ok(handle) => self.connector.ping(&handle).await.map(|()| handle),
            Err(e) => Err(e),
        };

        match probed {
            Ok(handle) => Ok((transport, handle)),
            Err(e) => {
                if let Err(close_err) = self.connector.close(&transport).await {
                    debug!("Error closing failed transport: {}", close_err);
                }
                Err(e)
            }
        }
    }

    /// Clear the stored connection when the transport reports close/error
    fn watch(self: &Arc<Self>, transport: &C::Transport, generation: u64) {
        let events = self.connector.lifecycle(transport);
        let inner: Weak<Self> = Arc::downgrade(self);

        tokio::spawn(async move {
            let event = events.await;
            if let Some(inner) = inner.upgrade() {
                inner.on_transport_event(generation, event).await;
            }
        });
    }

    async fn on_transport_event(&self, generation: u64, event: TransportEvent) {
        let still_current = {
            let state = self.lock();
            state.generation == generation && state.handle.is_some()
        };
        if !still_current {
            return;
        }

        warn!("Database transport for '{}' reported {:?}; connection cleared", self.database, event);
        if event == TransportEvent::Closed {
            let mut state = self.lock();
            if state.generation == generation {
                state.handle = None;
                state.transport = None;
            }
        } else {
            self.discard(generation).await;
        }
    }

    /// Clear the connection belonging to `generation` and close its transport
    async fn discard(&self, generation: u64) {
        let transport = {
            let mut state = self.lock();
            if state.generation != generation {
                return;
            }
            state.handle = None;
            state.transport.take()
        };

        if let Some(transport) = transport {
            if let Err(e) = self.connector.close(&transport).await {
                debug!("Error closing discarded transport: {}", e);
            }
        }
    }
}
