use async_trait::async_trait;
use chrono::Utc;
use sqlx::{query_as, PgPool, QueryBuilder};
use uuid::Uuid;

use super::{FileStore, LogStore, StoreError};
use crate::models::{FileRecord, FileUpdate, LogRecord, NewFile, NewLog};

// Postgres-backed File store
pub struct PgFileStore {
    pool: PgPool,
}

impl PgFileStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FileStore for PgFileStore {
    async fn create(&self, file: NewFile) -> Result<FileRecord, StoreError> {
        let now = Utc::now();

        let created = query_as::<_, FileRecord>(
            r#"
            INSERT INTO files (
                id, owner_id, original_name, display_name, mime_type, size_bytes,
                description, tags, favorite, download_count, remote_url,
                remote_object_id, folder_id, created_at, updated_at
            ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,FALSE,0,$9,$10,$11,$12,$12)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&file.owner_id)
        .bind(&file.original_name)
        .bind(&file.display_name)
        .bind(&file.mime_type)
        .bind(file.size_bytes)
        .bind(&file.description)
        .bind(&file.tags)
        .bind(&file.remote_url)
        .bind(&file.remote_object_id)
        .bind(&file.folder_id)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    async fn get(&self, id: Uuid) -> Result<FileRecord, StoreError> {
        query_as::<_, FileRecord>("SELECT * FROM files WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("file {}", id)))
    }

    async fn list_by_owner(
        &self,
        owner_id: &str,
        folder_id: Option<&str>,
    ) -> Result<Vec<FileRecord>, StoreError> {
        let files = match folder_id {
            Some(folder) => {
                query_as::<_, FileRecord>(
                    "SELECT * FROM files WHERE owner_id = $1 AND folder_id = $2 \
                     ORDER BY created_at DESC",
                )
                .bind(owner_id)
                .bind(folder)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                query_as::<_, FileRecord>(
                    "SELECT * FROM files WHERE owner_id = $1 ORDER BY created_at DESC",
                )
                .bind(owner_id)
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(files)
    }

    async fn update(&self, id: Uuid, update: FileUpdate) -> Result<FileRecord, StoreError> {
        // Nothing to write: hand back the current record
        if update.is_empty() {
            return self.get(id).await;
        }

        let mut builder = QueryBuilder::new("UPDATE files SET updated_at = ");
        builder.push_bind(Utc::now());

        if let Some(display_name) = &update.display_name {
            builder.push(", display_name = ");
            builder.push_bind(display_name);
        }
        if let Some(description) = &update.description {
            builder.push(", description = ");
            builder.push_bind(description);
        }
        if let Some(tags) = &update.tags {
            builder.push(", tags = ");
            builder.push_bind(tags);
        }
        if let Some(favorite) = update.favorite {
            builder.push(", favorite = ");
            builder.push_bind(favorite);
        }

        builder.push(" WHERE id = ");
        builder.push_bind(id);
        builder.push(" RETURNING *");

        builder
            .build_query_as::<FileRecord>()
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("file {}", id)))
    }

    async fn increment_downloads(&self, id: Uuid) -> Result<FileRecord, StoreError> {
        query_as::<_, FileRecord>(
            "UPDATE files SET download_count = download_count + 1, updated_at = $2 \
             WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("file {}", id)))
    }

    async fn delete(&self, id: Uuid) -> Result<FileRecord, StoreError> {
        query_as::<_, FileRecord>("DELETE FROM files WHERE id = $1 RETURNING *")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("file {}", id)))
    }
}

// Postgres-backed Log store
pub struct PgLogStore {
    pool: PgPool,
}

impl PgLogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LogStore for PgLogStore {
    async fn append(&self, log: NewLog) -> Result<LogRecord, StoreError> {
        let created = query_as::<_, LogRecord>(
            r#"
            INSERT INTO logs (id, owner_id, action, file_id, file_name, timestamp)
            VALUES ($1,$2,$3,$4,$5,$6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&log.owner_id)
        .bind(log.action.as_str())
        .bind(log.file_id)
        .bind(&log.file_name)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    async fn list_by_owner(
        &self,
        owner_id: &str,
        limit: i64,
    ) -> Result<Vec<LogRecord>, StoreError> {
        let logs = query_as::<_, LogRecord>(
            "SELECT * FROM logs WHERE owner_id = $1 ORDER BY timestamp DESC LIMIT $2",
        )
        .bind(owner_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(logs)
    }
}
