use async_trait::async_trait;
use uuid::Uuid;

use crate::database::connector::PgConnector;
use crate::database::manager::{ConnectionManager, DatabaseError};
use crate::database::models::Account;

/// Read access to account records
#[async_trait]
pub trait AccountStore: Send + Sync + 'static {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, DatabaseError>;
}

/// Accounts table in the shared Postgres database
pub struct PgAccountStore {
    db: ConnectionManager<PgConnector>,
}

impl PgAccountStore {
    pub fn new(db: ConnectionManager<PgConnector>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AccountStore for PgAccountStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, DatabaseError> {
        // Fast path when connected; otherwise re-establishes after a drop
        let database = self.db.connect().await?;

        let account = sqlx::query_as::<_, Account>(
            "SELECT id, email, name, due_date, created_at, updated_at, deletion_requested_at
             FROM accounts
             WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(database.pool())
        .await?;

        Ok(account)
    }
}
