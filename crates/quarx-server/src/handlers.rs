use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::{
    store::{LicenseRecord, StoreError},
    AppState,
};

// ── Index ─────────────────────────────────────────────────────────────────────

pub async fn index() -> impl IntoResponse {
    Json(json!({
        "message": "Quarx license API is running",
        "status": "active",
        "timestamp": iso(now_ts()),
        "endpoints": [
            "/api/health",
            "/api/license/validate",
            "/api/license/activate",
            "/api/license/status",
            "/api/test/add-key",
        ],
    }))
}

// ── Health ────────────────────────────────────────────────────────────────────

pub async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "timestamp": iso(now_ts()),
    }))
}

// ── Validate ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ValidateRequest {
    pub license_key: Option<String>,
    pub hardware_id: Option<String>,
}

/// License snapshot returned by validate. Unlike the status snapshot it omits
/// the hardware binding and last-check fields.
#[derive(Debug, Serialize)]
pub struct ValidatedLicense {
    pub key: String,
    #[serde(rename = "type")]
    pub license_type: String,
    pub expiry_date: String,
    pub is_used: bool,
    pub used_by: Option<String>,
    pub days_remaining: i64,
}

impl ValidatedLicense {
    fn from_record(rec: &LicenseRecord, now: i64) -> Self {
        Self {
            key: rec.key.clone(),
            license_type: rec.license_type.clone(),
            expiry_date: iso(rec.expires_at),
            is_used: rec.is_used,
            used_by: rec.used_by.clone(),
            days_remaining: rec.days_remaining(now),
        }
    }
}

pub async fn validate_license(
    State(state): State<AppState>,
    Json(body): Json<ValidateRequest>,
) -> Response {
    let Some(key) = body.license_key.as_deref() else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"valid": false, "message": "License key required"})),
        )
            .into_response();
    };

    let now = now_ts();
    match state.store.validate(key, now) {
        Ok(rec) => {
            info!(key = %rec.key, hardware_id = ?body.hardware_id, "audit: license.validate");
            Json(json!({
                "valid": true,
                "license_data": ValidatedLicense::from_record(&rec, now),
            }))
            .into_response()
        }
        Err(StoreError::NotFound) => (
            StatusCode::NOT_FOUND,
            Json(json!({"valid": false, "message": "License key not found"})),
        )
            .into_response(),
        Err(StoreError::Expired) => (
            StatusCode::FORBIDDEN,
            Json(json!({"valid": false, "message": "License has expired"})),
        )
            .into_response(),
        Err(e) => internal_error(e),
    }
}

// ── Activate ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ActivateRequest {
    pub license_key: Option<String>,
    pub username: Option<String>,
    /// Accepted for client compatibility; not stored.
    pub email: Option<String>,
    pub hardware_id: Option<String>,
}

pub async fn activate_license(
    State(state): State<AppState>,
    Json(body): Json<ActivateRequest>,
) -> Response {
    let Some(key) = body.license_key.as_deref() else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"success": false, "message": "License key required"})),
        )
            .into_response();
    };

    let now = now_ts();
    match state.store.activate(
        key,
        body.username.as_deref(),
        body.hardware_id.as_deref(),
        now,
    ) {
        Ok(rec) => {
            info!(
                key = %rec.key,
                used_by = ?rec.used_by,
                email = ?body.email,
                "audit: license.activate"
            );
            Json(json!({"success": true, "message": "License activated"})).into_response()
        }
        Err(StoreError::NotFound) => (
            StatusCode::NOT_FOUND,
            Json(json!({"success": false, "message": "License key not found"})),
        )
            .into_response(),
        Err(StoreError::Expired) => (
            StatusCode::FORBIDDEN,
            Json(json!({"success": false, "message": "License has expired"})),
        )
            .into_response(),
        Err(e) => internal_error(e),
    }
}

// ── Status ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct StatusParams {
    pub license_key: Option<String>,
}

/// Full license snapshot. `days_remaining` is not clamped: status reports
/// expired licenses (negative days) instead of rejecting them the way
/// validate/activate do.
#[derive(Debug, Serialize)]
pub struct LicenseStatusData {
    pub key: String,
    #[serde(rename = "type")]
    pub license_type: String,
    pub expiry_date: String,
    pub is_used: bool,
    pub used_by: Option<String>,
    pub hardware_id: Option<String>,
    pub last_check: Option<String>,
    pub days_remaining: i64,
}

impl LicenseStatusData {
    fn from_record(rec: &LicenseRecord, now: i64) -> Self {
        Self {
            key: rec.key.clone(),
            license_type: rec.license_type.clone(),
            expiry_date: iso(rec.expires_at),
            is_used: rec.is_used,
            used_by: rec.used_by.clone(),
            hardware_id: rec.hardware_id.clone(),
            last_check: rec.last_checked_at.map(iso),
            days_remaining: rec.days_remaining(now),
        }
    }
}

pub async fn license_status(
    State(state): State<AppState>,
    Query(params): Query<StatusParams>,
) -> Response {
    let Some(key) = params.license_key.as_deref() else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "License key required"})),
        )
            .into_response();
    };

    match state.store.lookup(key) {
        Ok(rec) => Json(json!({
            "license_data": LicenseStatusData::from_record(&rec, now_ts()),
        }))
        .into_response(),
        Err(StoreError::NotFound) => (
            StatusCode::NOT_FOUND,
            Json(json!({"error": "License key not found"})),
        )
            .into_response(),
        Err(e) => internal_error(e),
    }
}

// ── Add ───────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AddRequest {
    pub license_key: Option<String>,
    pub license_type: Option<String>,
    pub expiry_date: Option<String>,
}

pub async fn add_license(
    State(state): State<AppState>,
    Json(body): Json<AddRequest>,
) -> Response {
    let (Some(key), Some(license_type), Some(expiry)) = (
        body.license_key.as_deref(),
        body.license_type.as_deref(),
        body.expiry_date.as_deref(),
    ) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"success": false, "message": "Missing required fields"})),
        )
            .into_response();
    };

    let Some(expires_at) = parse_timestamp(expiry) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"success": false, "message": "expiry_date is not a valid ISO-8601 timestamp"})),
        )
            .into_response();
    };

    match state.store.create(key, license_type, expires_at, now_ts()) {
        Ok(rec) => {
            info!(key = %rec.key, license_type = %rec.license_type, "audit: license.add");
            Json(json!({
                "success": true,
                "message": "License key added successfully",
                "key": rec.key,
                "type": rec.license_type,
                "expiry_date": iso(rec.expires_at),
            }))
            .into_response()
        }
        Err(StoreError::DuplicateKey) => (
            StatusCode::CONFLICT,
            Json(json!({"success": false, "message": "License key already exists"})),
        )
            .into_response(),
        Err(e) => internal_error(e),
    }
}

// ── Test key ──────────────────────────────────────────────────────────────────

pub async fn add_test_key(State(state): State<AppState>) -> Response {
    match state.store.seed_test_license(now_ts()) {
        Ok(rec) => {
            info!(key = %rec.key, "audit: license.seed_test");
            Json(json!({
                "success": true,
                "message": "Test license key available",
                "key": rec.key,
                "expiry_date": iso(rec.expires_at),
            }))
            .into_response()
        }
        Err(e) => internal_error(e),
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

pub(crate) fn now_ts() -> i64 {
    Utc::now().timestamp()
}

/// Format a Unix timestamp as an ISO-8601 (RFC 3339) string.
fn iso(ts: i64) -> String {
    DateTime::<Utc>::from_timestamp(ts, 0)
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_else(|| ts.to_string())
}

/// Parse the ISO-8601 flavors clients send: RFC 3339, a naive datetime
/// without offset, or a bare date (midnight UTC).
fn parse_timestamp(s: &str) -> Option<i64> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.timestamp());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc().timestamp());
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(date.and_hms_opt(0, 0, 0)?.and_utc().timestamp());
    }
    None
}

fn internal_error(e: StoreError) -> Response {
    tracing::error!(error = %e, "internal error");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"error": format!("internal server error: {e}")})),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::parse_timestamp;

    #[test]
    fn parses_rfc3339_and_naive_and_date() {
        assert_eq!(parse_timestamp("1970-01-01T00:00:00Z"), Some(0));
        assert_eq!(parse_timestamp("1970-01-01T00:00:00+00:00"), Some(0));
        assert_eq!(parse_timestamp("1970-01-01T00:00:00"), Some(0));
        assert_eq!(parse_timestamp("1970-01-01T00:00:00.500000"), Some(0));
        assert_eq!(parse_timestamp("1970-01-02"), Some(86_400));
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(parse_timestamp("not-a-date"), None);
        assert_eq!(parse_timestamp(""), None);
    }
}
