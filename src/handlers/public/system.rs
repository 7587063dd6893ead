// handlers/public/system.rs - service banner and liveness

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::{json, Value};

use crate::database::Connector;
use crate::middleware::ApiResponse;
use crate::state::AppState;

/// GET / - service name, version and route overview
pub async fn root() -> ApiResponse<Value> {
    let version = env!("CARGO_PKG_VERSION");

    ApiResponse::success(json!({
        "name": "Bump Journal API",
        "version": version,
        "endpoints": {
            "health": "/health (public)",
            "logout": "/auth/logout (public)",
            "session": "/api/auth/session (token)",
            "me": "/api/auth/me (token + account)",
            "refresh": "/api/auth/refresh (token + account)",
        }
    }))
}

/// GET /health - pings the database; 503 when it is unreachable.
///
/// A dropped connection is re-established first, so health recovers on its
/// own once the database is back.
pub async fn health<C: Connector>(State(state): State<AppState<C>>) -> Response {
    let now = chrono::Utc::now();
    if !state.db.is_connected() {
        if let Err(e) = state.db.connect().await {
            tracing::warn!("Health check could not reconnect: {}", e);
        }
    }
    let database = state.db.health_check().await;

    if database.is_healthy() {
        ApiResponse::success(json!({
            "status": "ok",
            "timestamp": now,
            "database": database,
        }))
        .into_response()
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "success": false,
                "error": "database unavailable",
                "data": {
                    "status": "degraded",
                    "timestamp": now,
                    "database": database,
                }
            })),
        )
            .into_response()
    }
}
