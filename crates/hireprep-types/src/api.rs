use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Priority, Role};

// -- JWT Claims --

/// Bearer token claims. `sub` is the user id in decimal. `role` is
/// optional: tokens minted before roles existed (or by services that omit
/// it) carry no role claim at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub exp: usize,
}

// -- Auth --

/// Extra profile fields sent by the portal's sign-up form are accepted and
/// dropped.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user_id: i64,
    pub username: String,
    pub role: Role,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CurrentUserResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role: Role,
}

// -- Notices --

/// Raw notice payload. Fields stay loosely typed so validation can report
/// the first offending field by name; `author` and `created_at` are not
/// read from the client.
#[derive(Debug, Default, Deserialize)]
pub struct NoticeRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<String>,
    pub expires_at: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NoticeResponse {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub author: Option<i64>,
    pub author_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

// -- Reviews --

/// `rating` accepts a JSON number or a numeric string; `user` is never read
/// from the client.
#[derive(Debug, Default, Deserialize)]
pub struct ReviewRequest {
    pub company_name: Option<String>,
    pub rating: Option<serde_json::Value>,
    pub review_text: Option<String>,
    pub position: Option<String>,
    pub placement_type: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReviewResponse {
    pub id: i64,
    pub company_name: String,
    pub rating: i64,
    pub review_text: String,
    pub position: String,
    pub placement_type: String,
    pub created_at: DateTime<Utc>,
    pub user: i64,
}

// -- Resources --

#[derive(Debug, Serialize, Deserialize)]
pub struct ResourceResponse {
    pub id: i64,
    pub title: String,
    pub file: String,
    pub download_url: String,
    pub uploaded_at: DateTime<Utc>,
}

/// Body returned when a resource row was deleted but its file was not.
#[derive(Debug, Serialize, Deserialize)]
pub struct PartialDeleteResponse {
    pub message: String,
    pub file_removed: bool,
}
