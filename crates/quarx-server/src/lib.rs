pub mod auth;
pub mod dirs;
pub mod handlers;
pub mod server;
pub mod store;

/// Shared application state threaded through axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: store::Store,
    /// Optional API key write-protecting the admin add-license route.
    pub api_key: Option<String>,
}

pub use dirs::resolve_data_dir;
pub use server::{build_router, run, ServerConfig};
