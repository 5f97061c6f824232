//! Database rows, one struct per table.

#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: String,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct NoticeRow {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub priority: String,
    pub author_id: Option<i64>,
    /// Joined from `users`; `None` when the notice has no author.
    pub author_username: Option<String>,
    pub created_at: String,
    pub expires_at: Option<String>,
}

pub struct NewNotice<'a> {
    pub title: &'a str,
    pub description: &'a str,
    pub priority: &'a str,
    pub author_id: i64,
    pub expires_at: Option<&'a str>,
}

#[derive(Debug, Clone)]
pub struct ResourceRow {
    pub id: i64,
    pub title: String,
    pub file_name: String,
    pub uploaded_at: String,
}

#[derive(Debug, Clone)]
pub struct ReviewRow {
    pub id: i64,
    pub company_name: String,
    pub rating: i64,
    pub review_text: String,
    pub position: String,
    pub placement_type: String,
    pub created_at: String,
    pub user_id: i64,
}

pub struct NewReview<'a> {
    pub company_name: &'a str,
    pub rating: i64,
    pub review_text: &'a str,
    pub position: &'a str,
    pub placement_type: &'a str,
    pub user_id: i64,
}
