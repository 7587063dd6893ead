use axum::{
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use tower_cookies::CookieManagerLayer;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::SecurityConfig;
use crate::database::Connector;
use crate::handlers::{protected, public};
use crate::middleware::{jwt_auth_middleware, validate_account_middleware};
use crate::state::AppState;

pub fn router<C: Connector>(state: AppState<C>) -> Router {
    Router::new()
        // Public
        .route("/", get(public::root))
        .route("/health", get(public::health::<C>))
        .route("/auth/logout", post(public::logout_post::<C>))
        // Protected API
        .merge(session_routes(state.clone()))
        .merge(account_routes(state.clone()))
        // Global middleware
        .layer(CookieManagerLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Routes that need only a verified token
fn session_routes<C: Connector>(state: AppState<C>) -> Router<AppState<C>> {
    Router::new()
        .route("/api/auth/session", get(protected::session_get))
        .route_layer(from_fn_with_state(state, jwt_auth_middleware::<C>))
}

/// Routes that need a verified token and a live account
fn account_routes<C: Connector>(state: AppState<C>) -> Router<AppState<C>> {
    Router::new()
        .route("/api/auth/me", get(protected::whoami))
        .route("/api/auth/refresh", post(protected::session_refresh::<C>))
        .route_layer(from_fn_with_state(state, validate_account_middleware::<C>))
}

/// CORS from the configured origin list; permissive when the list is empty
pub fn cors_layer(security: &SecurityConfig) -> Option<CorsLayer> {
    if !security.enable_cors {
        return None;
    }

    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    if origins.is_empty() {
        Some(CorsLayer::permissive())
    } else {
        Some(
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods([Method::GET, Method::POST])
                .allow_headers([AUTHORIZATION, CONTENT_TYPE])
                .allow_credentials(true),
        )
    }
}
