use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;

use hireprep_db::models::{NewReview, ReviewRow};
use hireprep_types::api::{ReviewRequest, ReviewResponse};

use crate::auth::AppState;
use crate::error::ApiResult;
use crate::identity::Identity;
use crate::policy::{can_create_review, require};
use crate::validation::validate_review;
use crate::{parse_timestamp, with_db};

fn to_response(row: ReviewRow) -> ReviewResponse {
    ReviewResponse {
        created_at: parse_timestamp(&row.created_at, &format!("review '{}'", row.id)),
        id: row.id,
        company_name: row.company_name,
        rating: row.rating,
        review_text: row.review_text,
        position: row.position,
        placement_type: row.placement_type,
        user: row.user_id,
    }
}

pub async fn list_reviews(State(state): State<AppState>) -> ApiResult<Json<Vec<ReviewResponse>>> {
    let rows = with_db(&state, |db| db.list_reviews()).await?;
    Ok(Json(rows.into_iter().map(to_response).collect()))
}

/// POST /add/reviews/: students only. `user` is always the caller.
pub async fn add_review(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    payload: Result<Json<ReviewRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    require(can_create_review(&identity), "Only students can add reviews.")?;

    let Json(req) = payload?;
    let review = validate_review(&req)?;

    let user_id = identity.user_id();
    let row = with_db(&state, move |db| {
        db.insert_review(&NewReview {
            company_name: &review.company_name,
            rating: review.rating,
            review_text: &review.review_text,
            position: &review.position,
            placement_type: &review.placement_type,
            user_id,
        })
    })
    .await?;

    info!("Review {} for {} added by {}", row.id, row.company_name, identity.username());
    Ok((StatusCode::CREATED, Json(to_response(row))))
}
