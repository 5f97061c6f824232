use std::fmt::Write as _;

use axum::{
    Extension, Json,
    body::{Body, Bytes},
    extract::{
        Multipart, Path, State,
        multipart::{Field, MultipartError},
    },
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use tokio_util::io::ReaderStream;
use tracing::{error, info, warn};

use hireprep_db::is_constraint_violation;
use hireprep_db::models::ResourceRow;
use hireprep_types::api::{PartialDeleteResponse, ResourceResponse};

use crate::auth::AppState;
use crate::error::{ApiError, ApiResult};
use crate::identity::Identity;
use crate::storage::{Removal, ResourceStore, WriteError};
use crate::validation::{FileMeta, MAX_RESOURCE_BYTES, check_resource_upload};
use crate::{parse_timestamp, with_db};

const DUPLICATE_TITLE: &str = "A resource with this title already exists";

/// A file part pulled out of a multipart upload. `size` is the length the
/// client sent; `data` holds at most `MAX_RESOURCE_BYTES` of it.
pub struct UploadedFile {
    pub name: String,
    pub size: u64,
    pub data: Bytes,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        let data = data.into();
        Self {
            name: name.into(),
            size: data.len() as u64,
            data,
        }
    }

    fn meta(&self) -> FileMeta<'_> {
        FileMeta {
            name: &self.name,
            size: self.size,
        }
    }
}

/// How a resource deletion ended. The row is gone in both cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Complete,
    /// Row deleted but the file could not be removed from disk.
    BlobLeaked,
}

/// Validate, write the blob, then insert the row. If the insert fails the
/// fresh blob is removed again so no orphan is left behind.
pub async fn store_resource(
    state: &AppState,
    title: Option<&str>,
    file: Option<&UploadedFile>,
) -> ApiResult<ResourceRow> {
    check_resource_upload(title, file.map(UploadedFile::meta))?;
    let (Some(title), Some(file)) = (title, file) else {
        return Err(ApiError::validation("File is required"));
    };

    let file_name = ResourceStore::derive_file_name(title, &file.name)?;

    state.store.write_new(&file_name, &file.data).await.map_err(|e| match e {
        WriteError::AlreadyExists => ApiError::Conflict(DUPLICATE_TITLE.into()),
        WriteError::Io(e) => ApiError::Storage(format!("writing {}: {}", file_name, e)),
    })?;

    let (t, f) = (title.to_string(), file_name.clone());
    let inserted = with_db(state, move |db| match db.insert_resource(&t, &f) {
        Ok(row) => Ok(Ok(row)),
        Err(e) if is_constraint_violation(&e) => Ok(Err(ApiError::Conflict(DUPLICATE_TITLE.into()))),
        Err(e) => Err(e),
    })
    .await
    .and_then(|r| r);

    match inserted {
        Ok(row) => {
            info!("Stored resource {} as {} ({} bytes)", row.id, file_name, file.data.len());
            Ok(row)
        }
        Err(e) => {
            if let Err(cleanup) = state.store.remove(&file_name).await {
                error!("Orphaned resource file {} after failed insert: {}", file_name, cleanup);
            }
            Err(e)
        }
    }
}

/// Look up the row, remove the blob, then delete the row.
pub async fn delete_resource(state: &AppState, id: i64) -> ApiResult<DeleteOutcome> {
    let row = with_db(state, move |db| db.get_resource(id))
        .await?
        .ok_or_else(|| ApiError::not_found("Resource not found"))?;

    let removal = state.store.remove(&row.file_name).await;

    let deleted = with_db(state, move |db| db.delete_resource(id)).await?;
    if !deleted {
        // Raced with another delete; the blob step above was still safe.
        return Err(ApiError::not_found("Resource not found"));
    }

    match removal {
        Ok(Removal::Removed | Removal::AlreadyAbsent) => Ok(DeleteOutcome::Complete),
        Err(e) => {
            error!("Resource {} deleted but file {} could not be removed: {}", id, row.file_name, e);
            Ok(DeleteOutcome::BlobLeaked)
        }
    }
}

fn to_response(row: ResourceRow) -> ResourceResponse {
    let context = format!("resource '{}'", row.id);
    ResourceResponse {
        download_url: format!("/resources/{}/download/", row.id),
        uploaded_at: parse_timestamp(&row.uploaded_at, &context),
        id: row.id,
        title: row.title,
        file: row.file_name,
    }
}

/// GET /resources/: open to everyone, newest first.
pub async fn list_resources(State(state): State<AppState>) -> ApiResult<Json<Vec<ResourceResponse>>> {
    let rows = with_db(&state, |db| db.list_resources()).await?;
    Ok(Json(rows.into_iter().map(to_response).collect()))
}

/// POST /resources/upload/: multipart form with `title` and `file`.
pub async fn upload_resource(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    mut multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    let mut title: Option<String> = None;
    let mut file: Option<UploadedFile> = None;

    // Once the body limit trips, nothing past that point can be read, so
    // validation runs on the parts seen so far.
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) if is_over_body_limit(&e) => break,
            Err(e) => return Err(malformed(e)),
        };

        let part = field.name().map(str::to_string);
        match part.as_deref() {
            Some("title") => match field.text().await {
                Ok(text) => title = Some(text),
                Err(e) if is_over_body_limit(&e) => break,
                Err(e) => return Err(malformed(e)),
            },
            Some("file") => {
                // A part without a filename is a plain form value, not a file.
                let Some(name) = field.file_name().map(str::to_string) else {
                    continue;
                };
                let (upload, complete) = read_file_part(name, field).await?;
                file = Some(upload);
                if !complete {
                    break;
                }
            }
            _ => {}
        }
    }

    let row = store_resource(&state, title.as_deref(), file.as_ref()).await?;
    info!("Resource {} uploaded by {}", row.id, identity.username());

    Ok((StatusCode::CREATED, Json(to_response(row))))
}

/// Buffer a file part up to `MAX_RESOURCE_BYTES`; beyond that bytes are only
/// counted. Returns `false` when the body limit cut the part short, in which
/// case the size is reported as just over the resource limit.
async fn read_file_part(name: String, mut field: Field<'_>) -> ApiResult<(UploadedFile, bool)> {
    let mut data = Vec::new();
    let mut size: u64 = 0;

    loop {
        match field.chunk().await {
            Ok(Some(chunk)) => {
                size += chunk.len() as u64;
                if size <= MAX_RESOURCE_BYTES {
                    data.extend_from_slice(&chunk);
                }
            }
            Ok(None) => return Ok((UploadedFile { name, size, data: data.into() }, true)),
            Err(e) if is_over_body_limit(&e) => {
                let size = size.max(MAX_RESOURCE_BYTES + 1);
                return Ok((UploadedFile { name, size, data: Bytes::new() }, false));
            }
            Err(e) => return Err(malformed(e)),
        }
    }
}

fn is_over_body_limit(e: &MultipartError) -> bool {
    e.status() == StatusCode::PAYLOAD_TOO_LARGE
}

fn malformed(e: MultipartError) -> ApiError {
    ApiError::validation(format!("Malformed upload: {}", e.body_text()))
}

/// DELETE /delete/{id}/
pub async fn delete_resource_handler(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Extension(identity): Extension<Identity>,
) -> ApiResult<Response> {
    let outcome = delete_resource(&state, id).await?;
    info!("Resource {} deleted by {} ({:?})", id, identity.username(), outcome);

    Ok(match outcome {
        DeleteOutcome::Complete => StatusCode::NO_CONTENT.into_response(),
        DeleteOutcome::BlobLeaked => (
            StatusCode::OK,
            Json(PartialDeleteResponse {
                message: "Resource deleted, but its file could not be removed".into(),
                file_removed: false,
            }),
        )
            .into_response(),
    })
}

/// GET /resources/{id}/download/: streams the stored PDF.
pub async fn download_resource(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Response> {
    let row = with_db(&state, move |db| db.get_resource(id))
        .await?
        .ok_or_else(|| ApiError::not_found("Resource not found"))?;

    let file = match state.store.open(&row.file_name).await {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!("Resource {} has a row but no file at {}", id, row.file_name);
            return Err(ApiError::not_found("Resource file not found"));
        }
        Err(e) => return Err(ApiError::Storage(format!("opening {}: {}", row.file_name, e))),
    };
    let len = file
        .metadata()
        .await
        .map_err(|e| ApiError::Storage(format!("stat {}: {}", row.file_name, e)))?
        .len();

    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/pdf"));
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(len));
    headers.insert(header::CONTENT_DISPOSITION, content_disposition(&row.file_name));

    let body = Body::from_stream(ReaderStream::new(file));
    Ok((StatusCode::OK, headers, body).into_response())
}

/// `attachment` with an ASCII fallback name plus the RFC 5987 UTF-8 form.
fn content_disposition(file_name: &str) -> HeaderValue {
    let fallback: String = file_name
        .chars()
        .map(|c| if (c.is_ascii_graphic() && c != '"' && c != '\\') || c == ' ' { c } else { '_' })
        .collect();

    let mut encoded = String::with_capacity(file_name.len() * 3);
    for b in file_name.bytes() {
        if b.is_ascii_alphanumeric() || b"-._~".contains(&b) {
            encoded.push(b as char);
        } else {
            let _ = write!(encoded, "%{:02X}", b);
        }
    }

    HeaderValue::from_str(&format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback, encoded
    ))
    .unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use hireprep_db::Database;
    use tempfile::TempDir;

    use crate::auth::AppStateInner;

    async fn test_state() -> (AppState, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = ResourceStore::new(dir.path().join("media")).await.unwrap();
        let state = Arc::new(AppStateInner {
            db: Database::open_in_memory().unwrap(),
            store,
            jwt_secret: "test-secret".into(),
            token_ttl_hours: 1,
        });
        (state, dir)
    }

    fn pdf(name: &str, size: usize) -> UploadedFile {
        UploadedFile::new(name, vec![b'%'; size])
    }

    #[tokio::test]
    async fn stores_under_title_derived_name() {
        let (state, _dir) = test_state().await;
        let row = store_resource(&state, Some("midterm"), Some(&pdf("midterm.pdf", 1024)))
            .await
            .unwrap();

        assert_eq!(row.file_name, "midterm.pdf");
        let on_disk = tokio::fs::metadata(state.store.file_path("midterm.pdf")).await.unwrap();
        assert_eq!(on_disk.len(), 1024);
    }

    #[tokio::test]
    async fn duplicate_title_is_a_conflict_and_keeps_first_file() {
        let (state, _dir) = test_state().await;
        store_resource(&state, Some("notes"), Some(&pdf("a.pdf", 10))).await.unwrap();
        let err = store_resource(&state, Some("notes"), Some(&pdf("b.pdf", 20))).await.unwrap_err();

        assert!(matches!(err, ApiError::Conflict(_)));
        assert_eq!(state.db.list_resources().unwrap().len(), 1);
        let kept = tokio::fs::metadata(state.store.file_path("notes.pdf")).await.unwrap();
        assert_eq!(kept.len(), 10);
    }

    #[tokio::test]
    async fn validation_failure_writes_nothing() {
        let (state, _dir) = test_state().await;
        let err = store_resource(&state, Some("cv"), Some(&pdf("cv.docx", 10))).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(msg) if msg == "Only PDF files are allowed"));
        assert!(state.store.list_files().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn row_insert_failure_removes_fresh_blob() {
        let (state, _dir) = test_state().await;
        // Row exists without a blob, so the exclusive write succeeds but the
        // UNIQUE insert does not.
        state.db.insert_resource("ghost", "ghost.pdf").unwrap();

        let err = store_resource(&state, Some("ghost"), Some(&pdf("g.pdf", 5))).await.unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
        assert!(!state.store.exists("ghost.pdf").await.unwrap());
    }

    #[tokio::test]
    async fn oversize_count_is_validated_even_when_data_was_not_kept() {
        let (state, _dir) = test_state().await;
        let file = UploadedFile {
            name: "big.pdf".into(),
            size: MAX_RESOURCE_BYTES + 1,
            data: Bytes::new(),
        };

        let err = store_resource(&state, Some("big"), Some(&file)).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(msg) if msg == "File size must be less than 10MB"));
        let err = store_resource(&state, None, Some(&file)).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(msg) if msg == "Title is required"));
    }

    #[tokio::test]
    async fn multibyte_title_too_long_for_a_file_name_is_rejected() {
        let (state, _dir) = test_state().await;
        let title = "न".repeat(100);
        let err = store_resource(&state, Some(&title), Some(&pdf("x.pdf", 4))).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
        assert!(state.store.list_files().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_removes_blob_and_row() {
        let (state, _dir) = test_state().await;
        let row = store_resource(&state, Some("midterm"), Some(&pdf("m.pdf", 8))).await.unwrap();

        assert_eq!(delete_resource(&state, row.id).await.unwrap(), DeleteOutcome::Complete);
        assert!(state.db.get_resource(row.id).unwrap().is_none());
        assert!(!state.store.exists("midterm.pdf").await.unwrap());
    }

    #[tokio::test]
    async fn delete_with_missing_blob_still_succeeds() {
        let (state, _dir) = test_state().await;
        let row = store_resource(&state, Some("lost"), Some(&pdf("l.pdf", 8))).await.unwrap();
        tokio::fs::remove_file(state.store.file_path("lost.pdf")).await.unwrap();

        assert_eq!(delete_resource(&state, row.id).await.unwrap(), DeleteOutcome::Complete);
        assert!(state.db.get_resource(row.id).unwrap().is_none());
    }

    #[tokio::test]
    async fn blob_removal_failure_is_reported_as_leak() {
        let (state, _dir) = test_state().await;
        // A directory where the file should be makes remove_file fail with
        // something other than NotFound.
        let row = state.db.insert_resource("stuck", "stuck.pdf").unwrap();
        tokio::fs::create_dir(state.store.file_path("stuck.pdf")).await.unwrap();

        assert_eq!(delete_resource(&state, row.id).await.unwrap(), DeleteOutcome::BlobLeaked);
        assert!(state.db.get_resource(row.id).unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_unknown_id_is_not_found() {
        let (state, _dir) = test_state().await;
        assert!(matches!(delete_resource(&state, 404).await, Err(ApiError::NotFound(_))));
    }

    #[test]
    fn content_disposition_handles_non_ascii_titles() {
        let value = content_disposition("नोट्स.pdf");
        let text = value.to_str().unwrap();
        assert!(text.starts_with("attachment; filename=\""));
        assert!(text.contains("filename*=UTF-8''%E0%A4"));
        assert!(text.ends_with(".pdf"));
    }
}
