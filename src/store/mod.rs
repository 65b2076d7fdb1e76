// Record stores: Postgres for real deployments, in-memory for ephemeral mode
mod memory;
mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    config::Config,
    database::init_db,
    models::{FileRecord, FileUpdate, LogRecord, NewFile, NewLog},
    store::{
        memory::{MemFileStore, MemLogStore},
        postgres::{PgFileStore, PgLogStore},
    },
};

// Record store error types
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Not found: {0}")]
    NotFound(String), // Returned when no record exists for the given id

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Store for File metadata records. Each operation is atomic at the
/// single-record level; no cross-record guarantees.
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Persist a new File record, assigning its id and timestamps.
    async fn create(&self, file: NewFile) -> Result<FileRecord, StoreError>;

    async fn get(&self, id: Uuid) -> Result<FileRecord, StoreError>;

    /// All records for an owner, most-recently-created first, optionally
    /// narrowed to one folder.
    async fn list_by_owner(
        &self,
        owner_id: &str,
        folder_id: Option<&str>,
    ) -> Result<Vec<FileRecord>, StoreError>;

    /// Apply the provided fields only; omitted fields are unchanged.
    /// Last writer wins.
    async fn update(&self, id: Uuid, update: FileUpdate) -> Result<FileRecord, StoreError>;

    /// Add exactly 1 to the download counter.
    async fn increment_downloads(&self, id: Uuid) -> Result<FileRecord, StoreError>;

    /// Remove the record, returning it so callers can read its
    /// `remote_object_id` for remote cleanup.
    async fn delete(&self, id: Uuid) -> Result<FileRecord, StoreError>;
}

/// Append-only store for audit Log records.
#[async_trait]
pub trait LogStore: Send + Sync {
    async fn append(&self, log: NewLog) -> Result<LogRecord, StoreError>;

    /// Most-recent-first, truncated to `limit`.
    async fn list_by_owner(&self, owner_id: &str, limit: i64)
        -> Result<Vec<LogRecord>, StoreError>;
}

/// Initialize the record stores based on config.
pub async fn init_stores(
    config: &Config,
) -> Result<(Arc<dyn FileStore>, Arc<dyn LogStore>), sqlx::Error> {
    match &config.database_url {
        Some(url) => {
            info!("Initializing Postgres record stores");
            let pool = init_db(url).await?;
            Ok((
                Arc::new(PgFileStore::new(pool.clone())),
                Arc::new(PgLogStore::new(pool)),
            ))
        }
        None => {
            warn!("DATABASE_URL not set, using ephemeral in-memory record stores");
            Ok((
                Arc::new(MemFileStore::new()),
                Arc::new(MemLogStore::new()),
            ))
        }
    }
}

#[cfg(test)]
pub fn mem_stores() -> (Arc<dyn FileStore>, Arc<dyn LogStore>) {
    (Arc::new(MemFileStore::new()), Arc::new(MemLogStore::new()))
}
