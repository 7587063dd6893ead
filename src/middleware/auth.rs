use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use tower_cookies::Cookies;
use uuid::Uuid;

use crate::auth::{TokenError, TokenKeys};
use crate::database::Connector;
use crate::error::ApiError;
use crate::state::AppState;

/// Identity admitted by the token check
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AuthUser {
    pub user_id: Uuid,
}

/// Why a request was refused at the gate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthRejection {
    #[error("Authentication required")]
    AuthenticationRequired,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Account not found")]
    AccountNotFound,

    #[error("Account no longer exists")]
    AccountPurged,
}

impl AuthRejection {
    pub fn code(&self) -> &'static str {
        match self {
            AuthRejection::AuthenticationRequired => "AUTHENTICATION_REQUIRED",
            AuthRejection::TokenExpired => "TOKEN_EXPIRED",
            AuthRejection::InvalidToken => "INVALID_TOKEN",
            AuthRejection::AccountNotFound | AuthRejection::AccountPurged => "ACCOUNT_NOT_FOUND",
        }
    }
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}

/// Token from the auth cookie, falling back to `Authorization: Bearer`
pub fn extract_token<'a>(cookie: Option<&'a str>, headers: &'a HeaderMap) -> Option<&'a str> {
    if let Some(token) = cookie.map(str::trim).filter(|t| !t.is_empty()) {
        return Some(token);
    }

    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Verify the credential and resolve the subject id
pub fn authenticate(token: Option<&str>, keys: &TokenKeys) -> Result<AuthUser, AuthRejection> {
    let token = token.ok_or(AuthRejection::AuthenticationRequired)?;

    let claims = keys.verify(token).map_err(|e| match e {
        TokenError::Expired => AuthRejection::TokenExpired,
        _ => AuthRejection::InvalidToken,
    })?;

    let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AuthRejection::InvalidToken)?;

    Ok(AuthUser { user_id })
}

/// Run the token check against a request's cookie jar and headers
pub(crate) fn admit_identity<C: Connector>(
    state: &AppState<C>,
    cookies: &Cookies,
    headers: &HeaderMap,
) -> Result<AuthUser, AuthRejection> {
    let cookie = cookies.get(&state.cookie_name);
    let token = extract_token(cookie.as_ref().map(|c| c.value()), headers);

    authenticate(token, &state.tokens).map_err(|rejection| {
        tracing::debug!("Request rejected: {}", rejection);
        rejection
    })
}

/// JWT authentication middleware that validates tokens and injects [`AuthUser`]
pub async fn jwt_auth_middleware<C: Connector>(
    State(state): State<AppState<C>>,
    cookies: Cookies,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthRejection> {
    let auth_user = admit_identity(&state, &cookies, request.headers())?;
    request.extensions_mut().insert(auth_user);

    Ok(next.run(request).await)
}
