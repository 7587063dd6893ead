use std::sync::Arc;

use crate::auth::TokenKeys;
use crate::config::AppConfig;
use crate::database::{AccountStore, Connector, ConnectionManager};

/// Shared dependencies handed to handlers and middleware
pub struct AppState<C: Connector> {
    pub db: ConnectionManager<C>,
    pub accounts: Arc<dyn AccountStore>,
    pub tokens: TokenKeys,
    pub cookie_name: Arc<str>,
}

impl<C: Connector> Clone for AppState<C> {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
            accounts: Arc::clone(&self.accounts),
            tokens: self.tokens.clone(),
            cookie_name: Arc::clone(&self.cookie_name),
        }
    }
}

impl<C: Connector> AppState<C> {
    pub fn new(
        db: ConnectionManager<C>,
        accounts: Arc<dyn AccountStore>,
        tokens: TokenKeys,
        cookie_name: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            db,
            accounts,
            tokens,
            cookie_name: cookie_name.into(),
        }
    }

    pub fn from_config(db: ConnectionManager<C>, accounts: Arc<dyn AccountStore>, config: &AppConfig) -> Self {
        Self::new(
            db,
            accounts,
            TokenKeys::from_config(&config.security),
            config.security.auth_cookie_name.as_str(),
        )
    }
}
