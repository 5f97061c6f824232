use std::sync::Arc;

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use axum::{Extension, Json, extract::{State, rejection::JsonRejection}, http::StatusCode, response::IntoResponse};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand_core::OsRng;
use tracing::{info, warn};

use hireprep_db::{Database, is_constraint_violation};
use hireprep_types::api::{AuthResponse, Claims, CurrentUserResponse, LoginRequest, RegisterRequest};
use hireprep_types::models::Role;

use crate::error::{ApiError, ApiResult};
use crate::identity::Identity;
use crate::storage::ResourceStore;
use crate::with_db;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub store: ResourceStore,
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
}

pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(req) = payload?;

    // Validate input
    let username = req.username.trim().to_string();
    let username_chars = username.chars().count();
    if !(3..=150).contains(&username_chars) {
        return Err(ApiError::validation("Username must be between 3 and 150 characters"));
    }
    let email = req.email.trim().to_string();
    if !email.contains('@') {
        return Err(ApiError::validation("Enter a valid email address"));
    }
    if req.password.len() < 8 {
        return Err(ApiError::validation("Password must be at least 8 characters"));
    }
    let role = match req.role.as_deref().map(Role::parse) {
        None => Role::Student,
        Some(role @ (Role::Student | Role::Faculty)) => role,
        Some(_) => return Err(ApiError::validation("Role must be student or faculty")),
    };

    // Hash password with Argon2id
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("password hashing failed: {}", e)))?
        .to_string();

    let (uname, mail, role_name) = (username.clone(), email.clone(), role.to_string());
    let user_id = with_db(&state, move |db| {
        if db.get_user_by_username(&uname)?.is_some() {
            return Ok(Err(ApiError::Conflict("Username already exists".into())));
        }
        if db.email_taken(&mail)? {
            return Ok(Err(ApiError::Conflict("Email already exists".into())));
        }
        match db.create_user(&uname, &mail, &password_hash, &role_name) {
            Ok(id) => Ok(Ok(id)),
            Err(e) if is_constraint_violation(&e) => {
                Ok(Err(ApiError::Conflict("Username or email already exists".into())))
            }
            Err(e) => Err(e),
        }
    })
    .await??;

    let token = create_token(&state.jwt_secret, state.token_ttl_hours, user_id, &username, &role)?;
    info!("Registered user {} ({}) as {}", username, user_id, role);

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            user_id,
            username,
            role,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Json<AuthResponse>> {
    let Json(req) = payload?;

    let username = req.username.clone();
    let user = with_db(&state, move |db| db.get_user_by_username(&username))
        .await?
        .ok_or(ApiError::Unauthenticated)?;

    // Verify password
    let parsed_hash = PasswordHash::new(&user.password)
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("stored hash unreadable: {}", e)))?;

    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| {
            warn!("Failed login for {}", user.username);
            ApiError::Unauthenticated
        })?;

    let role = Role::parse(&user.role);
    let token = create_token(&state.jwt_secret, state.token_ttl_hours, user.id, &user.username, &role)?;

    Ok(Json(AuthResponse {
        token,
        user_id: user.id,
        username: user.username,
        role,
    }))
}

/// GET /api/user/: the caller's own profile row.
pub async fn current_user(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> ApiResult<Json<CurrentUserResponse>> {
    let user_id = identity.user_id();
    let user = with_db(&state, move |db| db.get_user_by_id(user_id))
        .await?
        .ok_or(ApiError::Unauthenticated)?;

    Ok(Json(CurrentUserResponse {
        id: user.id,
        username: user.username,
        email: user.email,
        role: Role::parse(&user.role),
    }))
}

pub fn create_token(
    secret: &str,
    ttl_hours: i64,
    user_id: i64,
    username: &str,
    role: &Role,
) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id.to_string(),
        username: username.to_string(),
        role: Some(role.to_string()),
        exp: (chrono::Utc::now() + chrono::Duration::hours(ttl_hours)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

pub fn decode_token(secret: &str, token: &str) -> ApiResult<Claims> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| ApiError::Unauthenticated)?;

    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_round_trip_keeps_role() {
        let token = create_token("s3cret", 1, 9, "kiran", &Role::Faculty).unwrap();
        let claims = decode_token("s3cret", &token).unwrap();
        assert_eq!(claims.sub, "9");
        assert_eq!(claims.role.as_deref(), Some("faculty"));
    }

    #[test]
    fn wrong_secret_is_unauthenticated() {
        let token = create_token("s3cret", 1, 9, "kiran", &Role::Student).unwrap();
        assert!(matches!(decode_token("other", &token), Err(ApiError::Unauthenticated)));
    }

    #[test]
    fn expired_token_is_unauthenticated() {
        let token = create_token("s3cret", -2, 9, "kiran", &Role::Student).unwrap();
        assert!(matches!(decode_token("s3cret", &token), Err(ApiError::Unauthenticated)));
    }
}
