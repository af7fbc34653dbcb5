use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::{
    auth::require_api_key,
    handlers::{
        activate_license, add_license, add_test_key, health, index, license_status, now_ts,
        validate_license,
    },
    AppState,
};

pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub api_key: Option<String>,
    pub data_dir: Option<PathBuf>,
    pub in_memory: bool,
    pub cors_origins: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: std::env::var("QUARX_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: std::env::var("QUARX_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            api_key: std::env::var("QUARX_API_KEY").ok(),
            data_dir: std::env::var("QUARX_DATA_DIR").ok().map(PathBuf::from),
            in_memory: std::env::var("QUARX_IN_MEMORY")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            cors_origins: std::env::var("QUARX_CORS_ORIGINS").ok(),
        }
    }
}

/// Assemble the application router. Public so integration tests can drive the
/// app in-process without binding a socket.
pub fn build_router(state: AppState) -> Router {
    // Public routes (no auth required).
    let public = Router::new()
        .route("/", get(index))
        .route("/api/health", get(health))
        .route("/api/license/validate", post(validate_license))
        .route("/api/license/activate", post(activate_license))
        .route("/api/license/status", get(license_status))
        .route("/api/test/add-key", post(add_test_key));

    // Admin routes (API key required if configured).
    let protected = Router::new()
        .route("/api/license/add", post(add_license))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            require_api_key,
        ));

    Router::new().merge(public).merge(protected).with_state(state)
}

pub async fn run(cfg: ServerConfig) -> Result<()> {
    let store = if cfg.in_memory {
        info!("using in-memory store; licenses will not survive a restart");
        crate::store::Store::open_in_memory()?
    } else {
        let data_dir = crate::dirs::resolve_data_dir(cfg.data_dir.as_ref())?;
        info!(data_dir = %data_dir.display(), "using data directory");
        let db_path = data_dir.join("quarx.db");
        crate::store::Store::open(&db_path).context("open store")?
    };

    // Bootstrap record: a fresh deployment always has one usable key.
    let seeded = store
        .seed_test_license(now_ts())
        .context("seed test license")?;
    info!(key = %seeded.key, expires_at = seeded.expires_at, "test license seeded");

    let state = AppState {
        store,
        api_key: cfg.api_key,
    };

    let cors = build_cors(cfg.cors_origins.as_deref());

    let app = build_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", cfg.host, cfg.port)
        .parse()
        .context("invalid host/port")?;

    info!(%addr, "quarx server listening");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("bind listener")?;

    axum::serve(listener, app).await.context("server error")
}

fn build_cors(origins: Option<&str>) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([
            http::Method::GET,
            http::Method::POST,
            http::Method::OPTIONS,
        ])
        .allow_headers(Any);

    match origins {
        Some(o) => {
            let origins: Vec<_> = o
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            cors.allow_origin(origins)
        }
        None => cors.allow_origin(Any),
    }
}
