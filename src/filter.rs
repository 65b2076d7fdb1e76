use chrono::{DateTime, Duration, Utc};

use crate::models::{FileKind, FileRecord};

/// In-memory narrowing of an already-fetched file list. The filtered view is
/// only as fresh as the fetch it was applied to; no extra round-trip happens.
#[derive(Debug, Default)]
pub struct FileFilter {
    /// Keep only files of this type class.
    pub kind: Option<FileKind>,
    /// Case-insensitive substring match over name, display name,
    /// description and tags.
    pub search: Option<String>,
    /// Keep only files uploaded within this many trailing days
    /// (rolling window by elapsed time).
    pub uploaded_within_days: Option<i64>,
}

impl FileFilter {
    /// Applies all configured filters (AND), preserving input order.
    pub fn apply(&self, files: Vec<FileRecord>, now: DateTime<Utc>) -> Vec<FileRecord> {
        let needle = self.search.as_deref().map(str::to_lowercase);

        files
            .into_iter()
            .filter(|f| match self.kind {
                Some(kind) => FileKind::of(&f.mime_type) == kind,
                None => true,
            })
            .filter(|f| match &needle {
                Some(needle) => matches_text(f, needle),
                None => true,
            })
            .filter(|f| match self.uploaded_within_days {
                Some(days) => now.signed_duration_since(f.created_at) <= Duration::days(days),
                None => true,
            })
            .collect()
    }
}

fn matches_text(file: &FileRecord, needle: &str) -> bool {
    file.original_name.to_lowercase().contains(needle)
        || file
            .display_name
            .as_deref()
            .is_some_and(|n| n.to_lowercase().contains(needle))
        || file.description.to_lowercase().contains(needle)
        || file.tags.iter().any(|t| t.to_lowercase().contains(needle))
}
