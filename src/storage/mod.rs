// Submodules for local file system storage and S3 storage
mod local;
mod s3;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use tracing::info;

use crate::config::Config;

pub use local::LocalStorage;
pub use s3::S3Storage;

// Storage error types
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Object not found: {0}")]
    NotFound(String), // Returned when an object cannot be found

    #[error("Io Error: {0}")]
    IoError(#[from] std::io::Error), // Wraps standard I/O errors

    #[error("Upload Error: {0}")]
    UploadError(String), // Errors during upload to storage

    #[error("Delete Error: {0}")]
    DeleteError(String), // Errors during deletion from storage
}

// Async Storage trait for the remote object store holding file bytes
#[async_trait]
pub trait Storage: Send + Sync {
    /// Upload an object under the given key.
    /// Returns the permanent URL of the stored object.
    async fn upload(&self, key: &str, content: Bytes) -> Result<String, StorageError>;

    /// Download an object's bytes by key.
    async fn download(&self, key: &str) -> Result<Bytes, StorageError>;

    /// Delete an object by key.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;
}

// Enum to represent storage backends
#[derive(Clone)]
pub enum StorageBackend {
    Local(LocalStorage), // Local filesystem storage
    S3(S3Storage),       // AWS S3 or MinIO storage
}

// Implement Storage trait for StorageBackend enum
// Delegates calls to the chosen backend
#[async_trait]
impl Storage for StorageBackend {
    async fn upload(&self, key: &str, content: Bytes) -> Result<String, StorageError> {
        match self {
            StorageBackend::Local(s) => s.upload(key, content).await,
            StorageBackend::S3(s) => s.upload(key, content).await,
        }
    }

    async fn download(&self, key: &str) -> Result<Bytes, StorageError> {
        match self {
            StorageBackend::Local(s) => s.download(key).await,
            StorageBackend::S3(s) => s.download(key).await,
        }
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        match self {
            StorageBackend::Local(s) => s.delete(key).await,
            StorageBackend::S3(s) => s.delete(key).await,
        }
    }
}

// Initialize the storage backend based on config
pub async fn init_storage(config: &Config) -> StorageBackend {
    if config.use_s3 {
        info!("Initializing S3 storage");
        StorageBackend::S3(S3Storage::new(config).await)
    } else {
        info!("Initializing Local storage");
        StorageBackend::Local(LocalStorage::new("uploads").await)
    }
}
