//! In-memory stand-ins for the database, shared by unit tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;
use uuid::Uuid;

use crate::database::models::Account;
use crate::database::{AccountStore, Connector, DatabaseError, TransportEvent};

#[derive(Debug, Clone)]
pub struct FakeTransport {
    pub id: u32,
    event: Arc<Mutex<Option<TransportEvent>>>,
    notify: Arc<Notify>,
}

impl FakeTransport {
    /// Fire a lifecycle event as the driver would
    pub fn emit(&self, event: TransportEvent) {
        *self.event.lock().unwrap() = Some(event);
        self.notify.notify_one();
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeHandle {
    pub transport_id: u32,
    pub database: String,
}

/// Connector whose opens fail a scripted number of times before succeeding.
///
/// Clones share counters, so a test can keep one clone and hand the other
/// to a `ConnectionManager`.
#[derive(Debug, Clone, Default)]
pub struct ScriptedConnector {
    failures: u32,
    open_delay: Duration,
    opens: Arc<AtomicU32>,
    closes: Arc<AtomicU32>,
    ping_fails: Arc<AtomicBool>,
    close_fails: Arc<AtomicBool>,
    open_times: Arc<Mutex<Vec<Instant>>>,
    transports: Arc<Mutex<Vec<FakeTransport>>>,
}

impl ScriptedConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the first `n` opens
    pub fn failing_first(mut self, n: u32) -> Self {
        self.failures = n;
        self
    }

    pub fn with_open_delay(mut self, delay: Duration) -> Self {
        self.open_delay = delay;
        self
    }

    pub fn opens(&self) -> u32 {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> u32 {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn set_ping_failure(&self, fail: bool) {
        self.ping_fails.store(fail, Ordering::SeqCst);
    }

    pub fn set_close_failure(&self, fail: bool) {
        self.close_fails.store(fail, Ordering::SeqCst);
    }

    /// Milliseconds from `start` to each open call
    pub fn open_times_since(&self, start: Instant) -> Vec<u64> {
        self.open_times
            .lock()
            .unwrap()
            .iter()
            .map(|t| t.duration_since(start).as_millis() as u64)
            .collect()
    }

    pub fn last_transport(&self) -> Option<FakeTransport> {
        self.transports.lock().unwrap().last().cloned()
    }

    /// Emit an event on the most recently opened transport
    pub fn emit(&self, event: TransportEvent) {
        if let Some(transport) = self.last_transport() {
            transport.emit(event);
        }
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    type Transport = FakeTransport;
    type Handle = FakeHandle;

    async fn open(&self, _database: &str) -> Result<FakeTransport, DatabaseError> {
        let attempt = self.opens.fetch_add(1, Ordering::SeqCst) + 1;
        self.open_times.lock().unwrap().push(Instant::now());

        if !self.open_delay.is_zero() {
            tokio::time::sleep(self.open_delay).await;
        }

        if attempt <= self.failures {
            return Err(DatabaseError::Transport(format!("connection refused (attempt {})", attempt)));
        }

        let transport = FakeTransport {
            id: attempt,
            event: Arc::new(Mutex::new(None)),
            notify: Arc::new(Notify::new()),
        };
        self.transports.lock().unwrap().push(transport.clone());
        Ok(transport)
    }

    fn select(&self, transport: &FakeTransport, database: &str) -> Result<FakeHandle, DatabaseError> {
        Ok(FakeHandle {
            transport_id: transport.id,
            database: database.to_string(),
        })
    }

    async fn ping(&self, _handle: &FakeHandle) -> Result<(), DatabaseError> {
        if self.ping_fails.load(Ordering::SeqCst) {
            return Err(DatabaseError::Transport("ping timed out".to_string()));
        }
        Ok(())
    }

    async fn close(&self, transport: &FakeTransport) -> Result<(), DatabaseError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        transport.emit(TransportEvent::Closed);

        if self.close_fails.load(Ordering::SeqCst) {
            return Err(DatabaseError::Transport("close failed".to_string()));
        }
        Ok(())
    }

    fn lifecycle(&self, transport: &FakeTransport) -> BoxFuture<'static, TransportEvent> {
        let event = Arc::clone(&transport.event);
        let notify = Arc::clone(&transport.notify);
        Box::pin(async move {
            notify.notified().await;
            let fired = *event.lock().unwrap();
            fired.unwrap_or(TransportEvent::Closed)
        })
    }
}

/// Account store backed by a HashMap
#[derive(Debug, Default)]
pub struct MemoryAccountStore {
    accounts: RwLock<HashMap<Uuid, Account>>,
    unavailable: AtomicBool,
}

impl MemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, account: Account) -> Account {
        self.accounts.write().unwrap().insert(account.id, account.clone());
        account
    }

    /// Make every lookup fail as if the database were gone
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, DatabaseError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(DatabaseError::NotConnected);
        }
        Ok(self.accounts.read().unwrap().get(&id).cloned())
    }
}

pub fn account(id: Uuid, deletion_requested_at: Option<DateTime<Utc>>) -> Account {
    let created_at = Utc::now() - chrono::Duration::days(90);
    Account {
        id,
        email: format!("{}@example.com", id.simple()),
        name: "Test Parent".to_string(),
        due_date: None,
        created_at,
        updated_at: created_at,
        deletion_requested_at,
    }
}
