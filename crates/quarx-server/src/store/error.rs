use thiserror::Error;

/// Failure kinds surfaced by the license store. Transport maps these to HTTP
/// status codes; missing-field errors never reach the store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("license key not found")]
    NotFound,

    #[error("license key already exists")]
    DuplicateKey,

    #[error("license has expired")]
    Expired,

    /// Catch-all for redb/codec failures, with the underlying cause attached.
    #[error("storage failure: {0:#}")]
    Storage(#[from] anyhow::Error),
}
