use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::{FileStore, LogStore, StoreError};
use crate::models::{FileRecord, FileUpdate, LogRecord, NewFile, NewLog};

// In-memory File store. Records live in insertion (= creation) order, so
// most-recent-first is a reversed scan.
#[derive(Default)]
pub struct MemFileStore {
    files: Mutex<Vec<FileRecord>>,
}

impl MemFileStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FileStore for MemFileStore {
    async fn create(&self, file: NewFile) -> Result<FileRecord, StoreError> {
        let now = Utc::now();
        let record = FileRecord {
            id: Uuid::new_v4(),
            owner_id: file.owner_id,
            original_name: file.original_name,
            display_name: file.display_name,
            mime_type: file.mime_type,
            size_bytes: file.size_bytes,
            description: file.description,
            tags: file.tags,
            favorite: false,
            download_count: 0,
            remote_url: file.remote_url,
            remote_object_id: file.remote_object_id,
            folder_id: file.folder_id,
            created_at: now,
            updated_at: now,
        };

        let mut files = self.files.lock().expect("file store mutex poisoned");
        files.push(record.clone());
        Ok(record)
    }

    async fn get(&self, id: Uuid) -> Result<FileRecord, StoreError> {
        let files = self.files.lock().expect("file store mutex poisoned");
        files
            .iter()
            .find(|f| f.id == id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("file {}", id)))
    }

    async fn list_by_owner(
        &self,
        owner_id: &str,
        folder_id: Option<&str>,
    ) -> Result<Vec<FileRecord>, StoreError> {
        let files = self.files.lock().expect("file store mutex poisoned");
        Ok(files
            .iter()
            .rev()
            .filter(|f| f.owner_id == owner_id)
            .filter(|f| folder_id.is_none() || f.folder_id.as_deref() == folder_id)
            .cloned()
            .collect())
    }

    async fn update(&self, id: Uuid, update: FileUpdate) -> Result<FileRecord, StoreError> {
        let mut files = self.files.lock().expect("file store mutex poisoned");
        let file = files
            .iter_mut()
            .find(|f| f.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("file {}", id)))?;

        if let Some(display_name) = update.display_name {
            file.display_name = Some(display_name);
        }
        if let Some(description) = update.description {
            file.description = description;
        }
        if let Some(tags) = update.tags {
            file.tags = tags;
        }
        if let Some(favorite) = update.favorite {
            file.favorite = favorite;
        }
        file.updated_at = Utc::now();

        Ok(file.clone())
    }

    async fn increment_downloads(&self, id: Uuid) -> Result<FileRecord, StoreError> {
        let mut files = self.files.lock().expect("file store mutex poisoned");
        let file = files
            .iter_mut()
            .find(|f| f.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("file {}", id)))?;

        file.download_count += 1;
        file.updated_at = Utc::now();
        Ok(file.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<FileRecord, StoreError> {
        let mut files = self.files.lock().expect("file store mutex poisoned");
        let index = files
            .iter()
            .position(|f| f.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("file {}", id)))?;

        Ok(files.remove(index))
    }
}

// In-memory Log store, append-only.
#[derive(Default)]
pub struct MemLogStore {
    logs: Mutex<Vec<LogRecord>>,
}

impl MemLogStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LogStore for MemLogStore {
    async fn append(&self, log: NewLog) -> Result<LogRecord, StoreError> {
        let record = LogRecord {
            id: Uuid::new_v4(),
            owner_id: log.owner_id,
            action: log.action.as_str().to_string(),
            file_id: log.file_id,
            file_name: log.file_name,
            timestamp: Utc::now(),
        };

        let mut logs = self.logs.lock().expect("log store mutex poisoned");
        logs.push(record.clone());
        Ok(record)
    }

    async fn list_by_owner(
        &self,
        owner_id: &str,
        limit: i64,
    ) -> Result<Vec<LogRecord>, StoreError> {
        let logs = self.logs.lock().expect("log store mutex poisoned");
        Ok(logs
            .iter()
            .rev()
            .filter(|l| l.owner_id == owner_id)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }
}
