use axum::{
    extract::{Multipart, Path, Query, State},
    http::header,
    response::Response,
    Json,
};
use bytes::Bytes;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info};
use uuid::Uuid;

use crate::{
    analytics::AnalyticsReport,
    error::AppError,
    filter::FileFilter,
    models::*,
    state::AppState,
    storage::Storage,
    utils::{object_key, split_tags},
};

/// Log records returned per activity-feed request.
const LOG_LIMIT: i64 = 20;

/// Appends an audit log entry for a completed mutation. Logging is
/// best-effort: a failure here never rolls back the mutation it records.
async fn record_log(state: &AppState, action: LogAction, file: &FileRecord) {
    let entry = NewLog {
        owner_id: file.owner_id.clone(),
        action,
        file_id: file.id,
        file_name: file.title().to_string(),
    };
    if let Err(e) = state.logs.append(entry).await {
        error!(
            "Failed to append {} log for file {}: {}",
            action.as_str(),
            file.id,
            e
        );
    }
}

/// Upload a file using multipart/form-data.
pub async fn upload_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<FileResponse>, AppError> {
    // Temporary holders for multipart fields
    let mut file_data: Option<Bytes> = None;
    let mut original_name: Option<String> = None;
    let mut mime_type: Option<String> = None;
    let mut owner_id: Option<String> = None;
    let mut display_name: Option<String> = None;
    let mut description = String::new();
    let mut tags: Vec<String> = Vec::new();
    let mut folder_id: Option<String> = None;

    // Parse multipart fields
    while let Some(field) = multipart.next_field().await.map_err(|e| {
        error!("Error parsing multipart: {}", e);
        AppError::MultipartError(format!("Failed to parse multipart form: {}", e))
    })? {
        match field.name().unwrap_or("") {
            "file" => {
                original_name = field.file_name().map(|s| s.to_string());
                mime_type = field.content_type().map(|s| s.to_string());
                // Read file bytes
                let data = field.bytes().await.map_err(|e| {
                    error!("Error reading file bytes: {}", e);
                    AppError::MultipartError(format!("Failed to read the file: {}", e))
                })?;
                file_data = Some(data);
            }
            "userId" => {
                if let Ok(value) = field.text().await {
                    if !value.is_empty() {
                        owner_id = Some(value);
                    }
                }
            }
            "displayName" => {
                if let Ok(value) = field.text().await {
                    if !value.is_empty() {
                        display_name = Some(value);
                    }
                }
            }
            "description" => {
                if let Ok(value) = field.text().await {
                    description = value;
                }
            }
            "tags" => {
                // Comma-separated tag string, split + trimmed server-side
                if let Ok(value) = field.text().await {
                    tags = split_tags(&value);
                }
            }
            "folderId" => {
                if let Ok(value) = field.text().await {
                    if !value.is_empty() {
                        folder_id = Some(value);
                    }
                }
            }
            _ => {}
        }
    }

    // Required inputs: the payload and its owner
    let owner_id = owner_id.ok_or_else(|| AppError::BadRequest("Missing userId".into()))?;
    let file_data = file_data.ok_or_else(|| AppError::BadRequest("No file uploaded".into()))?;
    let original_name =
        original_name.ok_or_else(|| AppError::BadRequest("No file uploaded".into()))?;

    // Enforce maximum file size
    let size_bytes = file_data.len() as u64;
    if size_bytes > state.config.max_file_size {
        error!(
            "File size {} exceeds maximum limit of {} bytes",
            size_bytes, state.config.max_file_size
        );

        return Err(AppError::PayloadTooLarge(format!(
            "File size {} exceeds maximum limit of {} bytes",
            size_bytes, state.config.max_file_size
        )));
    }

    let mime_type = mime_type.unwrap_or_else(|| "application/octet-stream".into());

    // Push bytes to the object store first: a File record must never exist
    // without a retrievable remote object behind it
    let file_id = Uuid::new_v4();
    let key = object_key(&owner_id, &file_id, &original_name);
    let remote_url = state.storage.upload(&key, file_data).await.map_err(|e| {
        error!("Error uploading object {}: {}", key, e);
        AppError::InternalServerError("Failed to upload file".into())
    })?;

    // Persist file metadata
    let file_record = state
        .files
        .create(NewFile {
            owner_id,
            original_name,
            display_name,
            mime_type,
            size_bytes: size_bytes as i64,
            description,
            tags,
            remote_url,
            remote_object_id: key.clone(),
            folder_id,
        })
        .await
        .map_err(|e| {
            // The pushed object now has no metadata record; nothing sweeps
            // it up, so make the orphan visible in the logs
            error!("Orphaned remote object {}: record creation failed: {}", key, e);
            AppError::from(e)
        })?;

    record_log(&state, LogAction::Add, &file_record).await;

    info!(
        "File uploaded: {} ({} bytes) for {}",
        file_record.id, size_bytes, file_record.owner_id
    );

    Ok(Json(FileResponse::from(file_record)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListFilesQuery {
    user_id: Option<String>,
    folder_id: Option<String>,
    kind: Option<String>,
    search: Option<String>,
    uploaded_within_days: Option<i64>,
}

/// List a user's files, most-recently-uploaded first, with optional
/// in-memory narrowing by type, text and upload window.
pub async fn list_files(
    State(state): State<AppState>,
    Query(query): Query<ListFilesQuery>,
) -> Result<Json<Vec<FileResponse>>, AppError> {
    let owner_id = query
        .user_id
        .ok_or_else(|| AppError::BadRequest("Missing userId".into()))?;

    let kind = query
        .kind
        .map(|k| k.parse::<FileKind>())
        .transpose()
        .map_err(AppError::BadRequest)?;

    let files = state
        .files
        .list_by_owner(&owner_id, query.folder_id.as_deref())
        .await?;

    // Narrow the already-fetched list; no extra store round-trip
    let filter = FileFilter {
        kind,
        search: query.search,
        uploaded_within_days: query.uploaded_within_days,
    };
    let files = filter.apply(files, Utc::now());

    Ok(Json(files.into_iter().map(FileResponse::from).collect()))
}

/// Get metadata for a single file by its ID.
pub async fn get_file(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<FileResponse>, AppError> {
    let file = state.files.get(id).await?;
    Ok(Json(FileResponse::from(file)))
}

/// Download a file by its unique ID. Counts the download and records it
/// in the activity log before the bytes go out.
pub async fn download_file(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    // Each completed request adds exactly 1; a retried request may
    // double-count, which is accepted
    let file = state.files.increment_downloads(id).await?;

    record_log(&state, LogAction::Download, &file).await;

    // Fetch the bytes from the object store and proxy them through
    let content = state.storage.download(&file.remote_object_id).await?;

    let mut response = Response::new(content.into());

    // Content-Type so the browser knows the file type
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_str(&file.mime_type)
            .unwrap_or_else(|_| header::HeaderValue::from_static("application/octet-stream")),
    );

    // Content-Disposition to force download under the user-facing name
    response.headers_mut().insert(
        header::CONTENT_DISPOSITION,
        header::HeaderValue::from_str(&format!("attachment; filename=\"{}\"", file.title()))
            .unwrap_or_else(|_| header::HeaderValue::from_static("attachment")),
    );

    Ok(response)
}

/// Apply a partial metadata update (rename, describe, retag, favorite).
pub async fn update_file(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(update): Json<FileUpdate>,
) -> Result<Json<FileResponse>, AppError> {
    let file = state.files.update(id, update).await?;

    record_log(&state, LogAction::Edit, &file).await;

    Ok(Json(FileResponse::from(file)))
}

/// Delete a file: record first, then best-effort remote-object cleanup.
pub async fn delete_file(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let file = state.files.delete(id).await?;

    // Remote deletion failure is non-fatal: the record stays gone and the
    // remote object may leak
    if let Err(e) = state.storage.delete(&file.remote_object_id).await {
        error!(
            "Failed to delete remote object {}: {}",
            file.remote_object_id, e
        );
    }

    record_log(&state, LogAction::Delete, &file).await;

    info!("File deleted: {}", id);

    Ok(Json(json!({ "message": "File deleted successfully" })))
}

/// The 20 most recent activity-log entries for a user, newest first.
pub async fn user_logs(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<LogRecord>>, AppError> {
    let logs = state.logs.list_by_owner(&user_id, LOG_LIMIT).await?;
    Ok(Json(logs))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsQuery {
    user_id: Option<String>,
}

/// Derived analytics over the user's full file list, recomputed per call.
pub async fn file_analytics(
    State(state): State<AppState>,
    Query(query): Query<AnalyticsQuery>,
) -> Result<Json<AnalyticsReport>, AppError> {
    let owner_id = query
        .user_id
        .ok_or_else(|| AppError::BadRequest("Missing userId".into()))?;

    let files = state.files.list_by_owner(&owner_id, None).await?;

    Ok(Json(AnalyticsReport::build(&files, Utc::now())))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use axum_test::{
        multipart::{MultipartForm, Part},
        TestServer,
    };
    use serde_json::json;
    use tempfile::TempDir;

    use std::sync::Arc;

    use async_trait::async_trait;

    use crate::{
        config::Config,
        models::{FileResponse, LogRecord, NewLog},
        state::AppState,
        storage::{LocalStorage, StorageBackend},
        store::{mem_stores, LogStore, StoreError},
    };

    fn test_config() -> Config {
        Config {
            database_url: None,
            s3_endpoint: None,
            s3_region: "us-east-1".to_string(),
            s3_bucket: "test".to_string(),
            s3_access_key: "test".to_string(),
            s3_secret_key: "test".to_string(),
            max_file_size: 10_485_760,
            use_s3: false,
        }
    }

    async fn test_server() -> (TestServer, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let (files, logs) = mem_stores();
        let state = AppState {
            files,
            logs,
            storage: StorageBackend::Local(
                LocalStorage::new(dir.path().to_str().unwrap()).await,
            ),
            config: test_config(),
        };
        (TestServer::new(crate::app(state)).unwrap(), dir)
    }

    fn upload_form(owner: &str, name: &str, payload: &[u8], tags: &str) -> MultipartForm {
        MultipartForm::new()
            .add_text("userId", owner.to_string())
            .add_text("tags", tags.to_string())
            .add_part(
                "file",
                Part::bytes(payload.to_vec())
                    .file_name(name.to_string())
                    .mime_type("image/png"),
            )
    }

    #[tokio::test]
    async fn upload_requires_user_id_and_file() {
        let (server, _dir) = test_server().await;

        let missing_user = MultipartForm::new().add_part(
            "file",
            Part::bytes(b"data".to_vec()).file_name("a.png"),
        );
        let res = server.post("/files/upload").multipart(missing_user).await;
        assert_eq!(res.status_code(), StatusCode::BAD_REQUEST);

        let missing_file = MultipartForm::new().add_text("userId", "u1");
        let res = server.post("/files/upload").multipart(missing_file).await;
        assert_eq!(res.status_code(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn upload_records_exact_size_and_remote_url() {
        let (server, _dir) = test_server().await;
        let payload = vec![7u8; 1234];

        let res = server
            .post("/files/upload")
            .multipart(upload_form("u1", "photo.png", &payload, "vacation"))
            .await;
        assert_eq!(res.status_code(), StatusCode::OK);

        let file: FileResponse = res.json();
        assert_eq!(file.size_bytes, 1234);
        assert!(!file.url.is_empty());
        assert_eq!(file.tags, vec!["vacation".to_string()]);
        assert_eq!(file.mime_type, "image/png");
        assert_eq!(file.download_count, 0);
    }

    #[tokio::test]
    async fn oversized_upload_is_rejected() {
        let (server, _dir) = test_server().await;
        let payload = vec![0u8; 10_485_761];

        let res = server
            .post("/files/upload")
            .multipart(upload_form("u1", "big.png", &payload, ""))
            .await;
        assert_eq!(res.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn list_requires_user_id_and_scopes_by_owner() {
        let (server, _dir) = test_server().await;

        let res = server.get("/files").await;
        assert_eq!(res.status_code(), StatusCode::BAD_REQUEST);

        server
            .post("/files/upload")
            .multipart(upload_form("u1", "mine.png", b"abc", ""))
            .await
            .assert_status_ok();
        server
            .post("/files/upload")
            .multipart(upload_form("u2", "theirs.png", b"def", ""))
            .await
            .assert_status_ok();

        let res = server.get("/files").add_query_param("userId", "u1").await;
        let files: Vec<FileResponse> = res.json();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].original_name, "mine.png");
    }

    #[tokio::test]
    async fn list_filters_apply_in_memory() {
        let (server, _dir) = test_server().await;

        server
            .post("/files/upload")
            .multipart(upload_form("u1", "beach.png", b"abc", "summer"))
            .await
            .assert_status_ok();
        server
            .post("/files/upload")
            .multipart(upload_form("u1", "city.png", b"def", "work"))
            .await
            .assert_status_ok();

        let res = server
            .get("/files")
            .add_query_param("userId", "u1")
            .add_query_param("search", "SUMMER")
            .await;
        let files: Vec<FileResponse> = res.json();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].original_name, "beach.png");

        let res = server
            .get("/files")
            .add_query_param("userId", "u1")
            .add_query_param("kind", "documents")
            .await;
        let files: Vec<FileResponse> = res.json();
        assert!(files.is_empty());

        let res = server
            .get("/files")
            .add_query_param("userId", "u1")
            .add_query_param("kind", "archive")
            .await;
        assert_eq!(res.status_code(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn download_increments_count_and_returns_bytes() {
        let (server, _dir) = test_server().await;

        let res = server
            .post("/files/upload")
            .multipart(upload_form("u1", "photo.png", b"pixels", ""))
            .await;
        let file: FileResponse = res.json();

        for _ in 0..3 {
            let res = server.get(&format!("/files/{}/download", file.id)).await;
            res.assert_status_ok();
            assert_eq!(res.as_bytes().to_vec(), b"pixels".to_vec());
        }

        let res = server.get(&format!("/files/{}", file.id)).await;
        let fetched: FileResponse = res.json();
        assert_eq!(fetched.download_count, 3);

        let logs: Vec<LogRecord> = server
            .get("/files/logs/user/u1")
            .await
            .json();
        assert_eq!(logs.iter().filter(|l| l.action == "DOWNLOAD").count(), 3);
    }

    #[tokio::test]
    async fn unknown_ids_return_not_found() {
        let (server, _dir) = test_server().await;
        let id = uuid::Uuid::new_v4();

        assert_eq!(
            server.get(&format!("/files/{}", id)).await.status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            server
                .get(&format!("/files/{}/download", id))
                .await
                .status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            server.delete(&format!("/files/{}", id)).await.status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            server
                .patch(&format!("/files/{}", id))
                .json(&json!({"favorite": true}))
                .await
                .status_code(),
            StatusCode::NOT_FOUND
        );
    }

    #[tokio::test]
    async fn patch_applies_partial_updates_only() {
        let (server, _dir) = test_server().await;

        let res = server
            .post("/files/upload")
            .multipart(
                upload_form("u1", "notes.png", b"abc", "a,b").add_text("description", "first"),
            )
            .await;
        let file: FileResponse = res.json();

        let res = server
            .patch(&format!("/files/{}", file.id))
            .json(&json!({"favorite": true}))
            .await;
        res.assert_status_ok();
        let updated: FileResponse = res.json();
        assert!(updated.favorite);
        assert_eq!(updated.description, "first");
        assert_eq!(updated.tags, vec!["a".to_string(), "b".to_string()]);

        let res = server
            .patch(&format!("/files/{}", file.id))
            .json(&json!({"displayName": "renamed", "description": "second"}))
            .await;
        let updated: FileResponse = res.json();
        assert_eq!(updated.display_name.as_deref(), Some("renamed"));
        assert_eq!(updated.description, "second");
        assert!(updated.favorite);
    }

    #[tokio::test]
    async fn analytics_requires_user_and_reflects_uploads() {
        let (server, _dir) = test_server().await;

        let res = server.get("/files/analytics").await;
        assert_eq!(res.status_code(), StatusCode::BAD_REQUEST);

        server
            .post("/files/upload")
            .multipart(upload_form("u1", "a.png", &vec![0u8; 1024], "x,y"))
            .await
            .assert_status_ok();
        server
            .post("/files/upload")
            .multipart(upload_form("u1", "b.png", &vec![0u8; 2048], "y,z"))
            .await
            .assert_status_ok();

        let res = server
            .get("/files/analytics")
            .add_query_param("userId", "u1")
            .await;
        res.assert_status_ok();
        let report: serde_json::Value = res.json();

        assert_eq!(report["upload_activity"]["total"], 2);
        assert_eq!(report["file_types"]["images"], 2);
        assert_eq!(report["clusters"][0]["count"], 2);
        assert_eq!(report["clusters"][0]["top_tag"], "y");
    }

    // A remote-object deletion failure never resurrects the record or
    // fails the response; the object may leak, the record stays gone.
    #[tokio::test]
    async fn delete_succeeds_when_remote_object_cannot_be_removed() {
        let (server, dir) = test_server().await;

        let res = server
            .post("/files/upload")
            .multipart(upload_form("u1", "photo.png", b"pixels", ""))
            .await;
        res.assert_status_ok();
        let file: FileResponse = res.json();

        // Swap the stored object for a non-empty directory so the
        // backend's file removal errors out
        let owner_dir = dir.path().join("files").join("u1");
        let object_path = std::fs::read_dir(&owner_dir)
            .unwrap()
            .next()
            .unwrap()
            .unwrap()
            .path();
        std::fs::remove_file(&object_path).unwrap();
        std::fs::create_dir(&object_path).unwrap();
        std::fs::write(object_path.join("inner"), b"x").unwrap();

        let res = server.delete(&format!("/files/{}", file.id)).await;
        res.assert_status_ok();

        assert_eq!(
            server.get(&format!("/files/{}", file.id)).await.status_code(),
            StatusCode::NOT_FOUND
        );

        let logs: Vec<LogRecord> = server.get("/files/logs/user/u1").await.json();
        assert_eq!(logs[0].action, "DELETE");
        assert_eq!(logs[0].file_id, file.id);
    }

    struct FailingLogStore;

    #[async_trait]
    impl LogStore for FailingLogStore {
        async fn append(&self, _log: NewLog) -> Result<LogRecord, StoreError> {
            Err(StoreError::Database(sqlx::Error::PoolClosed))
        }

        async fn list_by_owner(
            &self,
            _owner_id: &str,
            _limit: i64,
        ) -> Result<Vec<LogRecord>, StoreError> {
            Ok(Vec::new())
        }
    }

    // A log-append failure never rolls back the mutation it records:
    // upload, edit and delete all commit and respond 200 regardless.
    #[tokio::test]
    async fn log_append_failure_leaves_the_mutation_committed() {
        let dir = tempfile::tempdir().unwrap();
        let (files, _logs) = mem_stores();
        let state = AppState {
            files,
            logs: Arc::new(FailingLogStore),
            storage: StorageBackend::Local(
                LocalStorage::new(dir.path().to_str().unwrap()).await,
            ),
            config: test_config(),
        };
        let server = TestServer::new(crate::app(state)).unwrap();

        let res = server
            .post("/files/upload")
            .multipart(upload_form("u1", "photo.png", b"pixels", ""))
            .await;
        res.assert_status_ok();
        let file: FileResponse = res.json();

        let res = server
            .patch(&format!("/files/{}", file.id))
            .json(&json!({"favorite": true}))
            .await;
        res.assert_status_ok();
        let updated: FileResponse = res.json();
        assert!(updated.favorite);

        server
            .delete(&format!("/files/{}", file.id))
            .await
            .assert_status_ok();
        assert_eq!(
            server.get(&format!("/files/{}", file.id)).await.status_code(),
            StatusCode::NOT_FOUND
        );
    }

    // Full lifecycle: upload, list, favorite, delete, with the audit
    // trail surviving the file itself.
    #[tokio::test]
    async fn upload_edit_delete_end_to_end() {
        let (server, _dir) = test_server().await;

        let res = server
            .post("/files/upload")
            .multipart(upload_form("u1", "trip.png", &vec![1u8; 5 * 1024], "vacation"))
            .await;
        res.assert_status_ok();
        let file: FileResponse = res.json();

        let files: Vec<FileResponse> =
            server.get("/files").add_query_param("userId", "u1").await.json();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].id, file.id);

        let res = server
            .patch(&format!("/files/{}", file.id))
            .json(&json!({"favorite": true, "displayName": "Best trip"}))
            .await;
        let updated: FileResponse = res.json();
        assert!(updated.favorite);

        let res = server.delete(&format!("/files/{}", file.id)).await;
        res.assert_status_ok();

        let files: Vec<FileResponse> =
            server.get("/files").add_query_param("userId", "u1").await.json();
        assert!(files.is_empty());
        assert_eq!(
            server.get(&format!("/files/{}", file.id)).await.status_code(),
            StatusCode::NOT_FOUND
        );

        // Logs: newest first, one per mutation, DELETE keeps the snapshot name
        let logs: Vec<LogRecord> = server.get("/files/logs/user/u1").await.json();
        let actions: Vec<_> = logs.iter().map(|l| l.action.as_str()).collect();
        assert_eq!(actions, vec!["DELETE", "EDIT", "ADD"]);
        assert_eq!(logs[0].file_name, "Best trip");
        assert_eq!(logs[0].file_id, file.id);
        assert_eq!(logs[2].file_name, "trip.png");
    }
}
