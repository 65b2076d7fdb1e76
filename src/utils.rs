/// Splits a comma-separated tag string into trimmed, non-empty tags.
/// Duplicates are kept on purpose: each occurrence counts once in the
/// tag-frequency analytics.
pub fn split_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_string())
        .collect()
}

/// Builds the object-store key for an upload: namespaced per owner so one
/// user's objects never collide with another's.
pub fn object_key(owner_id: &str, file_id: &uuid::Uuid, original_name: &str) -> String {
    format!("files/{}/{}_{}", owner_id, file_id, original_name)
}
