use std::sync::Arc;

use crate::{
    config::Config,
    storage::StorageBackend,
    store::{FileStore, LogStore},
};

/// Central application state shared across all Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Store for File metadata records.
    pub files: Arc<dyn FileStore>,

    /// Append-only store for audit Log records.
    pub logs: Arc<dyn LogStore>,

    /// Abstracted object-storage backend (local filesystem or S3).
    pub storage: StorageBackend,

    /// Application configuration loaded from environment variables or `.env`.
    pub config: Config,
}
