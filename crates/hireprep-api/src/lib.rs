pub mod auth;
pub mod cleanup;
pub mod error;
pub mod identity;
pub mod middleware;
pub mod notices;
pub mod policy;
pub mod resources;
pub mod reviews;
pub mod router;
pub mod storage;
pub mod validation;

use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::{error, warn};

use hireprep_db::Database;

use crate::auth::AppState;
use crate::error::{ApiError, ApiResult};

/// Run a blocking DB call off the async runtime.
pub(crate) async fn with_db<F, T>(state: &AppState, f: F) -> ApiResult<T>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(anyhow::anyhow!("blocking task failed"))
        })?
        .map_err(ApiError::Internal)
}

/// Parse a stored timestamp. Rows written by this service are RFC 3339;
/// rows imported from elsewhere may use SQLite's "YYYY-MM-DD HH:MM:SS".
pub(crate) fn parse_timestamp(raw: &str, context: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt timestamp '{}' on {}: {}", raw, context, e);
            DateTime::default()
        })
}
