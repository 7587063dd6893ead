use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Duration, Utc};
use tower_cookies::Cookies;

use super::auth::{admit_identity, AuthRejection, AuthUser};
use crate::config::ACCOUNT_GRACE_DAYS;
use crate::database::models::Account;
use crate::database::{AccountStore, Connector};
use crate::error::ApiError;
use crate::state::AppState;

/// Account record loaded for an admitted request
#[derive(Clone, Debug)]
pub struct AuthenticatedAccount(pub Account);

/// Whether a deletion requested at `requested_at` is past the grace window
pub fn deletion_grace_elapsed(requested_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now.signed_duration_since(requested_at) > Duration::days(ACCOUNT_GRACE_DAYS)
}

/// Apply account lifecycle rules to a looked-up record
pub fn check_account(account: Option<Account>, now: DateTime<Utc>) -> Result<Account, AuthRejection> {
    let account = account.ok_or(AuthRejection::AccountNotFound)?;

    match account.deletion_requested_at {
        Some(requested_at) if deletion_grace_elapsed(requested_at, now) => Err(AuthRejection::AccountPurged),
        _ => Ok(account),
    }
}

/// Look up the admitted user's account and apply lifecycle rules
pub async fn resolve_account(
    auth_user: &AuthUser,
    store: &dyn AccountStore,
    now: DateTime<Utc>,
) -> Result<Account, ApiError> {
    let account = store.find_by_id(auth_user.user_id).await.map_err(|e| {
        tracing::error!("Failed to load account {}: {}", auth_user.user_id, e);
        ApiError::from(e)
    })?;

    check_account(account, now).map_err(|rejection| {
        tracing::debug!("Account {} rejected: {}", auth_user.user_id, rejection);
        ApiError::from(rejection)
    })
}

/// Middleware that runs the token check, then requires a live account.
/// Injects both [`AuthUser`] and [`AuthenticatedAccount`].
pub async fn validate_account_middleware<C: Connector>(
    State(state): State<AppState<C>>,
    cookies: Cookies,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_user = admit_identity(&state, &cookies, request.headers())?;
    let account = resolve_account(&auth_user, state.accounts.as_ref(), Utc::now()).await?;

    request.extensions_mut().insert(auth_user);
    request.extensions_mut().insert(AuthenticatedAccount(account));

    Ok(next.run(request).await)
}
