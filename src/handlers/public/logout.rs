// handlers/public/logout.rs - POST /auth/logout

use axum::extract::State;
use serde_json::{json, Value};
use tower_cookies::{Cookie, Cookies};

use crate::database::Connector;
use crate::middleware::ApiResponse;
use crate::state::AppState;

/// POST /auth/logout - remove the auth cookie.
///
/// Does not require a valid token. Bearer tokens are stateless and simply expire.
pub async fn logout_post<C: Connector>(State(state): State<AppState<C>>, cookies: Cookies) -> ApiResponse<Value> {
    cookies.remove(Cookie::build((state.cookie_name.to_string(), "")).path("/").build());

    ApiResponse::success(json!({ "logged_out": true }))
}
