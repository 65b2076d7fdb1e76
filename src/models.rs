use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

/// Canonical metadata for one uploaded asset. The actual bytes live in the
/// object store; `remote_object_id` is the key used to delete them.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FileRecord {
    pub id: Uuid,
    pub owner_id: String,
    pub original_name: String,
    pub display_name: Option<String>,
    pub mime_type: String,
    pub size_bytes: i64,
    pub description: String,
    pub tags: Vec<String>,
    pub favorite: bool,
    pub download_count: i64,
    pub remote_url: String,
    pub remote_object_id: String,
    pub folder_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FileRecord {
    /// User-facing name: the chosen display name, falling back to the
    /// name the file was uploaded under.
    pub fn title(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.original_name)
    }
}

/// Input to `FileStore::create`. Id and timestamps are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewFile {
    pub owner_id: String,
    pub original_name: String,
    pub display_name: Option<String>,
    pub mime_type: String,
    pub size_bytes: i64,
    pub description: String,
    pub tags: Vec<String>,
    pub remote_url: String,
    pub remote_object_id: String,
    pub folder_id: Option<String>,
}

/// Partial update for PATCH /files/{id}. Fields left as `None` are untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FileUpdate {
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
    pub favorite: Option<bool>,
}

impl FileUpdate {
    pub fn is_empty(&self) -> bool {
        self.display_name.is_none()
            && self.description.is_none()
            && self.tags.is_none()
            && self.favorite.is_none()
    }
}

/// Mutating actions recorded in the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogAction {
    Add,
    Edit,
    Delete,
    Download,
}

impl LogAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogAction::Add => "ADD",
            LogAction::Edit => "EDIT",
            LogAction::Delete => "DELETE",
            LogAction::Download => "DOWNLOAD",
        }
    }
}

/// One append-only audit entry. `file_id` is a weak reference: it is kept
/// even after the File record is deleted, which is why `file_name` snapshots
/// the name at write time.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LogRecord {
    pub id: Uuid,
    pub owner_id: String,
    pub action: String,
    pub file_id: Uuid,
    pub file_name: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewLog {
    pub owner_id: String,
    pub action: LogAction,
    pub file_id: Uuid,
    pub file_name: String,
}

/// Coarse file-type classes derived from the MIME type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FileKind {
    Images,
    Videos,
    Documents,
    Audio,
    Others,
}

impl FileKind {
    /// Classify a MIME type string. Documents cover PDFs, plain text,
    /// legacy Word and anything that self-describes as a spreadsheet.
    pub fn of(mime_type: &str) -> FileKind {
        if mime_type.starts_with("image/") {
            FileKind::Images
        } else if mime_type.starts_with("video/") {
            FileKind::Videos
        } else if mime_type == "application/pdf"
            || mime_type.starts_with("text/")
            || mime_type == "application/msword"
            || mime_type.contains("spreadsheet")
        {
            FileKind::Documents
        } else if mime_type.starts_with("audio/") {
            FileKind::Audio
        } else {
            FileKind::Others
        }
    }
}

impl std::str::FromStr for FileKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "images" => Ok(FileKind::Images),
            "videos" => Ok(FileKind::Videos),
            "documents" => Ok(FileKind::Documents),
            "audio" => Ok(FileKind::Audio),
            "others" => Ok(FileKind::Others),
            other => Err(format!("unknown file kind: {}", other)),
        }
    }
}

/// API representation of a File record. The remote storage location is
/// exposed as `url`, plus a server-relative download link.
#[derive(Debug, Serialize, Deserialize)]
pub struct FileResponse {
    pub id: Uuid,
    pub owner_id: String,
    pub original_name: String,
    pub display_name: Option<String>,
    pub mime_type: String,
    pub size_bytes: i64,
    pub description: String,
    pub tags: Vec<String>,
    pub favorite: bool,
    pub download_count: i64,
    pub url: String,
    pub download_url: String,
    pub folder_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<FileRecord> for FileResponse {
    fn from(file: FileRecord) -> Self {
        FileResponse {
            download_url: format!("/files/{}/download", file.id),
            id: file.id,
            owner_id: file.owner_id,
            original_name: file.original_name,
            display_name: file.display_name,
            mime_type: file.mime_type,
            size_bytes: file.size_bytes,
            description: file.description,
            tags: file.tags,
            favorite: file.favorite,
            download_count: file.download_count,
            url: file.remote_url,
            folder_id: file.folder_id,
            created_at: file.created_at,
            updated_at: file.updated_at,
        }
    }
}
