// handlers/protected/auth/whoami.rs - GET /api/auth/me

use axum::extract::Extension;

use crate::database::models::Account;
use crate::middleware::{ApiResponse, AuthenticatedAccount};

/// GET /api/auth/me - account record of the signed-in user
pub async fn whoami(Extension(AuthenticatedAccount(account)): Extension<AuthenticatedAccount>) -> ApiResponse<Account> {
    ApiResponse::success(account)
}
