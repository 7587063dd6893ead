use axum::extract::{Extension, State};
use serde::Serialize;
use tower_cookies::{cookie::SameSite, Cookie, Cookies};

use crate::database::Connector;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser, AuthenticatedAccount};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
    /// Seconds until the token expires
    pub expires_in: i64,
}

/// GET /api/auth/session - identity carried by the presented token
///
/// Token admission only; the account record is not loaded.
pub async fn session_get(Extension(auth_user): Extension<AuthUser>) -> ApiResponse<AuthUser> {
    ApiResponse::success(auth_user)
}

/// POST /api/auth/refresh - sign a fresh token for the admitted account
///
/// The new token is returned in the body and set as the auth cookie.
pub async fn session_refresh<C: Connector>(
    State(state): State<AppState<C>>,
    cookies: Cookies,
    Extension(AuthenticatedAccount(account)): Extension<AuthenticatedAccount>,
) -> ApiResult<TokenResponse> {
    let token = state.tokens.issue(account.id).map_err(|e| {
        tracing::error!("Failed to issue token for account {}: {}", account.id, e);
        ApiError::internal_server_error("Failed to issue token")
    })?;

    cookies.add(
        Cookie::build((state.cookie_name.to_string(), token.clone()))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .build(),
    );

    tracing::debug!("Refreshed session for account {}", account.id);

    Ok(ApiResponse::success(TokenResponse {
        token,
        expires_in: state.tokens.ttl().num_seconds(),
    }))
}
