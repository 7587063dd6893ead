#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration as StdDuration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use futures::future::BoxFuture;
use tower_http::cors::CorsLayer;
use uuid::Uuid;

use bump_journal_api::auth::TokenKeys;
use bump_journal_api::database::models::Account;
use bump_journal_api::database::{
    AccountStore, ConnectionManager, Connector, DatabaseError, RetryPolicy, TransportEvent,
};
use bump_journal_api::{router, AppState};

pub const COOKIE_NAME: &str = "token";

/// Connector that always opens; pings follow the `healthy` flag
#[derive(Clone, Default)]
pub struct StubConnector {
    unhealthy: Arc<AtomicBool>,
}

impl StubConnector {
    pub fn set_healthy(&self, healthy: bool) {
        self.unhealthy.store(!healthy, Ordering::SeqCst);
    }
}

#[async_trait]
impl Connector for StubConnector {
    type Transport = ();
    type Handle = ();

    async fn open(&self, _database: &str) -> Result<(), DatabaseError> {
        Ok(())
    }

    fn select(&self, _transport: &(), _database: &str) -> Result<(), DatabaseError> {
        Ok(())
    }

    async fn ping(&self, _handle: &()) -> Result<(), DatabaseError> {
        if self.unhealthy.load(Ordering::SeqCst) {
            return Err(DatabaseError::Transport("server selection timed out".to_string()));
        }
        Ok(())
    }

    async fn close(&self, _transport: &()) -> Result<(), DatabaseError> {
        Ok(())
    }

    fn lifecycle(&self, _transport: &()) -> BoxFuture<'static, TransportEvent> {
        Box::pin(std::future::pending())
    }
}

/// Accounts kept in memory but reached through the stub connection, so
/// lookups fail and recover with it
pub struct MemoryAccounts {
    db: ConnectionManager<StubConnector>,
    accounts: RwLock<HashMap<Uuid, Account>>,
}

impl MemoryAccounts {
    pub fn new(db: ConnectionManager<StubConnector>) -> Self {
        Self {
            db,
            accounts: RwLock::new(HashMap::new()),
        }
    }

    pub fn add(&self, deletion_requested_at: Option<DateTime<Utc>>) -> Account {
        let created_at = Utc::now() - Duration::days(60);
        let account = Account {
            id: Uuid::new_v4(),
            email: "parent@example.com".to_string(),
            name: "Test Parent".to_string(),
            due_date: None,
            created_at,
            updated_at: created_at,
            deletion_requested_at,
        };
        self.accounts.write().unwrap().insert(account.id, account.clone());
        account
    }
}

#[async_trait]
impl AccountStore for MemoryAccounts {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, DatabaseError> {
        self.db.connect().await?;
        Ok(self.accounts.read().unwrap().get(&id).cloned())
    }
}

pub struct TestServer {
    pub base_url: String,
    pub keys: TokenKeys,
    pub accounts: Arc<MemoryAccounts>,
    pub db: ConnectionManager<StubConnector>,
    pub connector: StubConnector,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

fn fast_retries() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        base_delay: StdDuration::from_millis(10),
        multiplier: 2.0,
        max_delay: StdDuration::from_millis(50),
    }
}

/// Serve the router on a free local port. The server lives as long as the
/// test's runtime.
pub async fn spawn_server() -> Result<TestServer> {
    spawn_server_with(None).await
}

pub async fn spawn_server_with(cors: Option<CorsLayer>) -> Result<TestServer> {
    let port = portpicker::pick_unused_port().context("failed to pick free port")?;
    let base_url = format!("http://127.0.0.1:{}", port);

    let connector = StubConnector::default();
    let db = ConnectionManager::new(connector.clone(), "bump_journal_test", fast_retries());
    db.connect().await.context("stub connect failed")?;

    let keys = TokenKeys::new("integration-secret", Duration::hours(1), 0);
    let accounts = Arc::new(MemoryAccounts::new(db.clone()));
    let state = AppState::new(db.clone(), accounts.clone(), keys.clone(), COOKIE_NAME);

    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
        .await
        .context("failed to bind test listener")?;
    let mut app = router(state);
    if let Some(cors) = cors {
        app = app.layer(cors);
    }
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    Ok(TestServer {
        base_url,
        keys,
        accounts,
        db,
        connector,
    })
}
