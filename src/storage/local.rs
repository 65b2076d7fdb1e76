use std::path::Path;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::{fs, io::AsyncWriteExt};

use super::{Storage, StorageError};

// Local filesystem storage
#[derive(Clone)]
pub struct LocalStorage {
    base_path: String, // Base directory where objects will be stored
}

impl LocalStorage {
    /// Creates a new LocalStorage instance and ensures the base directory exists
    pub async fn new(base_path: &str) -> Self {
        fs::create_dir_all(base_path)
            .await
            .expect("Failed to create uploads directory");
        Self {
            base_path: base_path.to_string(),
        }
    }

    /// Returns the full path of an object relative to the base directory
    fn full_path(&self, key: &str) -> String {
        format!("{}/{}", self.base_path, key)
    }
}

#[async_trait]
impl Storage for LocalStorage {
    /// Writes the object to a file on the local filesystem
    async fn upload(&self, key: &str, content: Bytes) -> Result<String, StorageError> {
        let full_path = self.full_path(key);

        // Ensure parent directories exist (keys are namespaced per owner)
        if let Some(parent) = Path::new(&full_path).parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut file = fs::File::create(&full_path).await?;
        file.write_all(&content).await?;

        tracing::info!("Saved object at {:?}", full_path);

        Ok(format!("/{}", full_path.trim_start_matches('/')))
    }

    /// Reads an object back from the local filesystem
    async fn download(&self, key: &str) -> Result<Bytes, StorageError> {
        let full_path = self.full_path(key);

        if !Path::new(&full_path).exists() {
            return Err(StorageError::NotFound(key.to_string()));
        }

        let content = fs::read(&full_path).await.map_err(StorageError::IoError)?;

        Ok(Bytes::from(content))
    }

    /// Deletes an object from the local filesystem
    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let full_path = self.full_path(key);

        if Path::new(&full_path).exists() {
            fs::remove_file(&full_path)
                .await
                .map_err(StorageError::IoError)?;
        }
        Ok(())
    }
}
