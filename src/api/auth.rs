//! Authentication: password hashing, access tokens, and extractors.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    async_trait,
    extract::{FromRequestParts, State},
    http::{header, request::Parts, StatusCode},
    Json,
};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::error::ApiError;
use crate::config::AuthConfig;
use crate::db::{self, CreateUserRequest, LoginRequest, TokenResponse, User};
use crate::{AppState, DbPool};

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2.hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Verify a password against a hash
pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

/// Access-token claims: username, user id, role, expiry.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub id: String,
    pub role: String,
    pub exp: i64,
}

/// Issue a signed access token for a user.
pub fn create_access_token(
    user: &User,
    config: &AuthConfig,
) -> Result<String, jsonwebtoken::errors::Error> {
    let expires = chrono::Utc::now() + chrono::Duration::minutes(config.token_expiry_minutes);
    let claims = Claims {
        sub: user.username.clone(),
        id: user.id.clone(),
        role: user.role.clone(),
        exp: expires.timestamp(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.secret_key.as_bytes()),
    )
}

/// Decode and validate an access token.
pub fn decode_token(token: &str, secret_key: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret_key.as_bytes()),
        &Validation::default(),
    )?;
    Ok(data.claims)
}

/// The authenticated caller, extracted from the bearer token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: String,
    pub username: String,
    pub role: String,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == "admin"
    }
}

fn extract_bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_bearer_token(parts)
            .ok_or_else(|| ApiError::unauthorized("Could not validate user"))?;

        let claims = decode_token(token, &state.config.auth.secret_key)
            .map_err(|_| ApiError::unauthorized("Could not validate user"))?;

        Ok(AuthUser {
            id: claims.id,
            username: claims.sub,
            role: claims.role,
        })
    }
}

/// An authenticated caller holding the admin role.
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthUser);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            return Err(ApiError::forbidden("Admin access required"));
        }
        Ok(AdminUser(user))
    }
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub id: String,
    pub username: String,
}

fn validate_registration(request: &CreateUserRequest) -> Result<(), ApiError> {
    if request.username.trim().is_empty() {
        return Err(ApiError::validation("Username is required"));
    }
    if !request.email.contains('@') {
        return Err(ApiError::validation("Invalid email address"));
    }
    if request.password.len() < 6 {
        return Err(ApiError::validation(
            "Password must be at least 6 characters",
        ));
    }
    Ok(())
}

/// Register a new user
///
/// POST /auth/register
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    validate_registration(&request)?;

    let existing =
        db::users::find_by_username_or_email(&state.db, &request.username, &request.email).await?;
    if existing.is_some() {
        return Err(ApiError::conflict("Username or email already exists"));
    }

    let password_hash = hash_password(&request.password)
        .map_err(|e| ApiError::internal(format!("Failed to hash password: {}", e)))?;

    let now = chrono::Utc::now().to_rfc3339();
    let user = User {
        id: uuid::Uuid::new_v4().to_string(),
        username: request.username,
        email: request.email,
        first_name: request.first_name,
        last_name: request.last_name,
        password_hash,
        is_active: 1,
        role: request.role,
        created_at: now.clone(),
        updated_at: now,
    };
    db::users::insert(&state.db, &user).await?;

    tracing::info!(username = %user.username, "Registered user");

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            id: user.id,
            username: user.username,
        }),
    ))
}

/// Exchange credentials for a bearer token
///
/// POST /auth/token
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let user = db::users::find_by_username(&state.db, &request.username).await?;

    let user = match user {
        Some(u) if u.is_active() && verify_password(&request.password, &u.password_hash) => u,
        _ => return Err(ApiError::unauthorized("Could not validate user")),
    };

    let token = create_access_token(&user, &state.config.auth)
        .map_err(|e| ApiError::internal(format!("Failed to issue token: {}", e)))?;

    Ok(Json(TokenResponse {
        access_token: token,
        token_type: "bearer".to_string(),
    }))
}

/// Tokens are stateless; logout exists for client symmetry.
///
/// POST /auth/logout
pub async fn logout() -> StatusCode {
    StatusCode::NO_CONTENT
}

/// Create the initial admin account when the user table is empty.
pub async fn ensure_admin_user(db: &DbPool, config: &AuthConfig) -> anyhow::Result<()> {
    if db::users::count(db).await? > 0 {
        return Ok(());
    }

    let password_hash = hash_password(&config.admin_password)
        .map_err(|e| anyhow::anyhow!("Failed to hash admin password: {}", e))?;

    let now = chrono::Utc::now().to_rfc3339();
    let admin = User {
        id: uuid::Uuid::new_v4().to_string(),
        username: config.admin_username.clone(),
        email: config.admin_email.clone(),
        first_name: String::new(),
        last_name: String::new(),
        password_hash,
        is_active: 1,
        role: "admin".to_string(),
        created_at: now.clone(),
        updated_at: now,
    };
    db::users::insert(db, &admin).await?;

    tracing::info!(username = %admin.username, "Created initial admin user");
    Ok(())
}
