use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use constant_time_eq::constant_time_eq;
use serde_json::json;

use crate::AppState;

/// Axum middleware guarding the admin routes. When QUARX_API_KEY is unset the
/// guard is disabled and all requests pass through.
///
/// Admin clients may present the key either as `Authorization: Bearer <key>`
/// or in an `X-Api-Key` header.
pub async fn require_api_key(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let Some(expected) = &state.api_key else {
        return next.run(request).await;
    };

    match presented_key(&request) {
        Some(key) if constant_time_eq(key.as_bytes(), expected.as_bytes()) => {
            next.run(request).await
        }
        _ => (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "unauthorized: this endpoint requires the configured QUARX_API_KEY"})),
        )
            .into_response(),
    }
}

fn presented_key(request: &Request) -> Option<&str> {
    let header = |name: &str| {
        request
            .headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
    };

    header("Authorization")
        .and_then(|v| v.strip_prefix("Bearer "))
        .or_else(|| header("X-Api-Key"))
}
