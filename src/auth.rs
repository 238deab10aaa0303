use axum::{
    extract::{FromRef, FromRequestParts},
    http::{StatusCode, header, request::Parts},
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

use crate::{
    config::AppConfig,
    error::{ApiError, Result},
    repository::RepositoryState,
};

/// Work factor for password digests.
pub const BCRYPT_COST: u32 = 10;

/// Claims
///
/// The payload signed into every bearer token.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user's id.
    pub sub: Uuid,
    pub username: String,
    /// Expiration time (seconds since the epoch). Always validated.
    pub exp: usize,
    /// Issued at.
    pub iat: usize,
}

/// AuthUser
///
/// The resolved identity of an authenticated request. Every note, folder and tag
/// operation is scoped to `id`.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub id: Uuid,
    pub username: String,
}

/// AuthUser Extractor
///
/// Resolves the bearer token in `Authorization` to a user. The auth middleware runs
/// this once and stores the result in the request extensions; handlers then pick it
/// up from there without a second lookup.
///
/// Steps:
/// 1. Reuse an identity already placed in the extensions.
/// 2. Extract the `Bearer` token.
/// 3. Verify signature and expiry.
/// 4. Confirm the subject still exists, so deleted accounts lose access at once.
///
/// Rejection: 401 on any authentication failure, 500 if storage is unavailable.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> std::result::Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<AuthUser>() {
            return Ok(user.clone());
        }

        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);

        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or(StatusCode::UNAUTHORIZED)?;

        let claims = verify_token(token, &config.jwt_secret)?;

        let user = match repo.get_user(claims.sub).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                tracing::debug!(user_id = %claims.sub, "token subject no longer exists");
                return Err(StatusCode::UNAUTHORIZED);
            }
            Err(e) => {
                tracing::error!("user lookup failed during authentication: {:?}", e);
                return Err(StatusCode::INTERNAL_SERVER_ERROR);
            }
        };

        let auth_user = AuthUser {
            id: user.id,
            username: user.username,
        };
        parts.extensions.insert(auth_user.clone());
        Ok(auth_user)
    }
}

/// Decodes and validates a token. Expired, tampered and malformed tokens all map to 401.
pub fn verify_token(token: &str, secret: &str) -> std::result::Result<Claims, StatusCode> {
    let mut validation = Validation::default();
    validation.validate_exp = true;
    // No grace period: a token is dead the second it expires.
    validation.leeway = 0;

    match decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation) {
        Ok(data) => Ok(data.claims),
        Err(e) => {
            match e.kind() {
                ErrorKind::ExpiredSignature => tracing::debug!("rejected expired token"),
                other => tracing::debug!("rejected token: {:?}", other),
            }
            Err(StatusCode::UNAUTHORIZED)
        }
    }
}

/// issue_token
///
/// Signs a token for `user` valid for the configured lifetime.
pub fn issue_token(user: &AuthUser, config: &AppConfig) -> Result<String> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .as_secs();

    let claims = Claims {
        sub: user.id,
        username: user.username.clone(),
        iat: now as usize,
        exp: (now + config.jwt_expiry_secs) as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(e.to_string()))
}

/// Hashes a password on the blocking pool.
pub async fn hash_password(password: String) -> Result<String> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, BCRYPT_COST))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .map_err(|e| ApiError::Internal(e.to_string()))
}

/// Checks a password against a stored digest. A corrupt digest counts as a mismatch.
pub async fn verify_password(password: String, digest: String) -> Result<bool> {
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &digest).unwrap_or(false))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))
}
