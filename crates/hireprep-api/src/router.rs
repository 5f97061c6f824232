use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::{self, AppState};
use crate::middleware::require_auth;
use crate::validation::MAX_RESOURCE_BYTES;
use crate::{notices, resources, reviews};

/// Headroom above the file limit for multipart framing and the title field,
/// so oversize PDFs reach the validator instead of the body limit.
const UPLOAD_BODY_SLACK: usize = 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health))
        .route("/api/auth/register/", post(auth::register))
        .route("/api/auth/login/", post(auth::login))
        .route("/api/notices/", get(notices::list_notices))
        .route("/resources/", get(resources::list_resources))
        .route("/resources/{id}/download/", get(resources::download_resource))
        .route("/api/reviews/", get(reviews::list_reviews))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/api/user/", get(auth::current_user))
        .route("/api/notices/create/", post(notices::create_notice))
        .route("/api/notices/{id}/delete/", delete(notices::delete_notice))
        .route("/resources/upload/", post(resources::upload_resource))
        .route("/delete/{id}/", delete(resources::delete_resource_handler))
        .route("/add/reviews/", post(reviews::add_review))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(MAX_RESOURCE_BYTES as usize + UPLOAD_BODY_SLACK))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// GET /health (no auth).
pub async fn health() -> &'static str {
    "ok"
}
