use axum::{
    Extension, Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::{info, warn};

use hireprep_db::models::{NewNotice, NoticeRow};
use hireprep_types::api::{NoticeRequest, NoticeResponse};
use hireprep_types::models::Priority;

use crate::auth::AppState;
use crate::error::{ApiError, ApiResult};
use crate::identity::Identity;
use crate::policy::{can_create_notice, can_delete_notice, require};
use crate::validation::validate_notice;
use crate::{parse_timestamp, with_db};

fn to_response(row: NoticeRow) -> NoticeResponse {
    let context = format!("notice '{}'", row.id);
    let priority = Priority::parse(&row.priority).unwrap_or_else(|| {
        warn!("Unknown priority '{}' on {}", row.priority, context);
        Priority::default()
    });

    NoticeResponse {
        created_at: parse_timestamp(&row.created_at, &context),
        expires_at: row.expires_at.as_deref().map(|raw| parse_timestamp(raw, &context)),
        id: row.id,
        title: row.title,
        description: row.description,
        priority,
        author: row.author_id,
        author_name: row.author_username,
    }
}

/// GET /api/notices/: open to everyone, newest first.
pub async fn list_notices(State(state): State<AppState>) -> ApiResult<Json<Vec<NoticeResponse>>> {
    let rows = with_db(&state, |db| db.list_notices()).await?;
    Ok(Json(rows.into_iter().map(to_response).collect()))
}

/// POST /api/notices/create/: admin/faculty only. The author is always the
/// caller; an `author` field in the body is ignored.
pub async fn create_notice(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    payload: Result<Json<NoticeRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    require(
        can_create_notice(&identity),
        "Permission denied. Only admin/faculty can create notices.",
    )?;

    let Json(req) = payload?;
    let notice = validate_notice(&req)?;

    let author_id = identity.user_id();
    let row = with_db(&state, move |db| {
        let expires_at = notice.expires_at.map(|dt| dt.to_rfc3339());
        db.insert_notice(&NewNotice {
            title: &notice.title,
            description: &notice.description,
            priority: notice.priority.as_str(),
            author_id,
            expires_at: expires_at.as_deref(),
        })
    })
    .await?;

    info!("Notice {} created by {}", row.id, identity.username());
    Ok((StatusCode::CREATED, Json(to_response(row))))
}

/// DELETE /api/notices/{id}/delete/: admin/faculty only; any notice,
/// regardless of who wrote it.
pub async fn delete_notice(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Extension(identity): Extension<Identity>,
) -> ApiResult<StatusCode> {
    require(
        can_delete_notice(&identity),
        "Permission denied. Only admin/faculty can delete notices.",
    )?;

    let deleted = with_db(&state, move |db| db.delete_notice(id)).await?;
    if !deleted {
        return Err(ApiError::not_found("Notice not found"));
    }

    info!("Notice {} deleted by {}", id, identity.username());
    Ok(StatusCode::NO_CONTENT)
}
