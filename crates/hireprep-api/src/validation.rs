//! Payload validators. Every check fails fast: the first violated rule is
//! the only one reported.

use chrono::{DateTime, NaiveDateTime, Utc};

use hireprep_types::api::{NoticeRequest, ReviewRequest};
use hireprep_types::models::Priority;

use crate::error::{ApiError, ApiResult};

/// 10 MB upload limit for resources
pub const MAX_RESOURCE_BYTES: u64 = 10 * 1024 * 1024;

pub const REQUIRED_SUFFIX: &str = ".pdf";

/// Name and size of an uploaded file, as reported by the multipart part.
#[derive(Debug, Clone, Copy)]
pub struct FileMeta<'a> {
    pub name: &'a str,
    pub size: u64,
}

/// Ordered resource upload checks: title, file presence, suffix, size.
pub fn check_resource_upload(title: Option<&str>, file: Option<FileMeta<'_>>) -> ApiResult<()> {
    if title.is_none_or(str::is_empty) {
        return Err(ApiError::validation("Title is required"));
    }

    let Some(file) = file else {
        return Err(ApiError::validation("File is required"));
    };

    // Case-sensitive: "REPORT.PDF" is rejected.
    if !file.name.ends_with(REQUIRED_SUFFIX) {
        return Err(ApiError::validation("Only PDF files are allowed"));
    }

    if file.size > MAX_RESOURCE_BYTES {
        return Err(ApiError::validation("File size must be less than 10MB"));
    }

    Ok(())
}

#[derive(Debug)]
pub struct ValidNotice {
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub expires_at: Option<DateTime<Utc>>,
}

pub fn validate_notice(req: &NoticeRequest) -> ApiResult<ValidNotice> {
    let title = required_text("title", req.title.as_deref(), Some(255))?;
    let description = required_text("description", req.description.as_deref(), None)?;

    let priority = match req.priority.as_deref() {
        None => Priority::default(),
        Some(raw) => Priority::parse(raw).ok_or_else(|| {
            ApiError::validation(format!("priority: \"{}\" is not a valid choice.", raw))
        })?,
    };

    let expires_at = match req.expires_at.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(
            parse_datetime(raw).ok_or_else(|| ApiError::validation("expires_at: Datetime has wrong format."))?,
        ),
    };

    Ok(ValidNotice {
        title: title.to_string(),
        description: description.to_string(),
        priority,
        expires_at,
    })
}

/// Offsets are honored; a datetime without one is read as UTC.
fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
    const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M"];

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|ndt| ndt.and_utc())
}

#[derive(Debug)]
pub struct ValidReview {
    pub company_name: String,
    pub rating: i64,
    pub review_text: String,
    pub position: String,
    pub placement_type: String,
}

/// Rating must be an integer but is not range-checked; values outside
/// 1..=5 are stored as sent until the product owner decides otherwise.
pub fn validate_review(req: &ReviewRequest) -> ApiResult<ValidReview> {
    let company_name = required_text("company_name", req.company_name.as_deref(), Some(255))?;
    let rating = parse_rating(req.rating.as_ref())?;
    let review_text = required_text("review_text", req.review_text.as_deref(), None)?;
    let position = required_text("position", req.position.as_deref(), Some(255))?;
    let placement_type = required_text("placement_type", req.placement_type.as_deref(), Some(50))?;

    Ok(ValidReview {
        company_name: company_name.to_string(),
        rating,
        review_text: review_text.to_string(),
        position: position.to_string(),
        placement_type: placement_type.to_string(),
    })
}

fn parse_rating(value: Option<&serde_json::Value>) -> ApiResult<i64> {
    let invalid = || ApiError::validation("rating: A valid integer is required.");
    match value {
        None | Some(serde_json::Value::Null) => {
            Err(ApiError::validation("rating: This field is required."))
        }
        Some(serde_json::Value::Number(n)) => n.as_i64().ok_or_else(invalid),
        Some(serde_json::Value::String(s)) => s.trim().parse().map_err(|_| invalid()),
        Some(_) => Err(invalid()),
    }
}

fn required_text<'a>(field: &str, value: Option<&'a str>, max_chars: Option<usize>) -> ApiResult<&'a str> {
    let value = value.ok_or_else(|| ApiError::validation(format!("{field}: This field is required.")))?;
    if value.trim().is_empty() {
        return Err(ApiError::validation(format!("{field}: This field may not be blank.")));
    }
    if let Some(max) = max_chars {
        if value.chars().count() > max {
            return Err(ApiError::validation(format!(
                "{field}: Ensure this field has no more than {max} characters."
            )));
        }
    }
    Ok(value)
}
