//! Bearer-token authentication: HS256 access tokens and argon2 password
//! hashing.

use std::sync::Arc;

use argon2::password_hash::SaltString;
use argon2::password_hash::rand_core::OsRng;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use common::UserId;
use store::ShopStore;

use crate::error::ApiError;
use crate::routes::AppState;

/// Claims carried by an access token.
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    /// Authenticated user id.
    sub: UserId,
    /// Expiry as a unix timestamp.
    exp: i64,
}

/// Issues and verifies HS256 access tokens.
#[derive(Clone)]
pub struct JwtAuth {
    encoding: Arc<EncodingKey>,
    decoding: Arc<DecodingKey>,
    expire_minutes: i64,
}

impl JwtAuth {
    /// Creates a token authority from a shared secret.
    pub fn new(secret: &str, expire_minutes: i64) -> Self {
        Self {
            encoding: Arc::new(EncodingKey::from_secret(secret.as_bytes())),
            decoding: Arc::new(DecodingKey::from_secret(secret.as_bytes())),
            expire_minutes,
        }
    }

    /// Issues an access token for the user.
    pub fn issue(&self, user: UserId) -> Result<String, ApiError> {
        let claims = Claims {
            sub: user,
            exp: (Utc::now() + chrono::Duration::minutes(self.expire_minutes)).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| ApiError::Internal(format!("failed to sign token: {e}")))
    }

    /// Verifies a token and returns the authenticated user id.
    pub fn verify(&self, token: &str) -> Result<UserId, ApiError> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims.sub)
            .map_err(|_| ApiError::Unauthorized("invalid or expired token".to_string()))
    }
}

/// Hashes a password with argon2 on a blocking task.
pub async fn hash_password(password: String) -> Result<String, ApiError> {
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(|e| ApiError::Internal(format!("failed to hash password: {e}")))
    })
    .await
    .map_err(|e| ApiError::Internal(format!("hashing task failed: {e}")))?
}

/// Verifies a password against a stored hash on a blocking task.
pub async fn verify_password(password: String, hash: String) -> Result<bool, ApiError> {
    tokio::task::spawn_blocking(move || {
        let parsed = PasswordHash::new(&hash)
            .map_err(|e| ApiError::Internal(format!("malformed password hash: {e}")))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    })
    .await
    .map_err(|e| ApiError::Internal(format!("verification task failed: {e}")))?
}

/// Extractor for the authenticated user, taken from the bearer token.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub UserId);

impl<S> FromRequestParts<Arc<AppState<S>>> for AuthUser
where
    S: ShopStore + Clone + 'static,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState<S>>,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized("missing authorization header".to_string()))?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| ApiError::Unauthorized("expected bearer token".to_string()))?;

        Ok(AuthUser(state.auth.verify(token)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn password_hash_roundtrip() {
        let hash = hash_password("sugar-rush".to_string()).await.unwrap();
        assert!(
            verify_password("sugar-rush".to_string(), hash.clone())
                .await
                .unwrap()
        );
        assert!(!verify_password("wrong".to_string(), hash).await.unwrap());
    }

    #[test]
    fn token_roundtrip() {
        let auth = JwtAuth::new("test-secret", 30);
        let user = UserId::new();
        let token = auth.issue(user).unwrap();
        assert_eq!(auth.verify(&token).unwrap(), user);
    }

    #[test]
    fn rejects_token_signed_with_other_secret() {
        let auth = JwtAuth::new("test-secret", 30);
        let other = JwtAuth::new("other-secret", 30);
        let token = other.issue(UserId::new()).unwrap();
        assert!(auth.verify(&token).is_err());
    }
}
