use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};

use crate::auth::{AppState, decode_token};
use crate::error::ApiError;
use crate::identity::Identity;

/// Extract and validate the JWT from the Authorization header, then hand the
/// caller's `Identity` to the handler through request extensions.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let bearer = req
        .headers()
        .typed_get::<Authorization<Bearer>>()
        .ok_or(ApiError::Unauthenticated)?;

    let claims = decode_token(&state.jwt_secret, bearer.token())?;

    let identity = Identity::from_claims(claims).ok_or(ApiError::Unauthenticated)?;

    req.extensions_mut().insert(identity);
    Ok(next.run(req).await)
}
