//! JWT authentication module.
//!
//! Turns the bearer token on each request into the [`Caller`] the sale
//! engine runs on behalf of. Issuing tokens (login) belongs to another
//! service; [`JwtManager::issue_token`] exists for tests and tooling.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, TokenData, Validation};
use serde::{Deserialize, Serialize};
use tracing::warn;

use till_core::{Caller, Role};

use crate::error::ApiError;
use crate::AppState;

/// JWT claims structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    /// Authenticated user
    pub user_id: i64,

    /// `ADMIN`, or `CASHIER`/`CAIXA`
    pub role: Role,

    /// Expiration (Unix timestamp)
    pub exp: i64,
}

impl From<Claims> for Caller {
    fn from(claims: Claims) -> Self {
        Caller {
            user_id: claims.user_id,
            role: claims.role,
        }
    }
}

/// JWT token manager (HS256, shared secret).
pub struct JwtManager {
    encoding: EncodingKey,
    decoding: DecodingKey,
    lifetime_secs: i64,
}

impl JwtManager {
    /// Create a new JWT manager.
    pub fn new(secret: &str, lifetime_secs: i64) -> Self {
        JwtManager {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            lifetime_secs,
        }
    }

    /// Generate a token for a user.
    pub fn issue_token(&self, user_id: i64, role: Role) -> Result<String, ApiError> {
        let claims = Claims {
            user_id,
            role,
            exp: (Utc::now() + Duration::seconds(self.lifetime_secs)).timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| ApiError::unauthorized(format!("Failed to generate token: {}", e)))
    }

    /// Validate and decode a token.
    pub fn validate_token(&self, token: &str) -> Result<Claims, ApiError> {
        let token_data: TokenData<Claims> = decode(token, &self.decoding, &Validation::default())
            .map_err(|e| ApiError::unauthorized(format!("Invalid token: {}", e)))?;

        Ok(token_data.claims)
    }
}

/// Extract bearer token from authorization header.
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// The caller behind a request.
///
/// Rejects with 401 when the token is missing or invalid.
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser(pub Caller);

#[axum::async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| {
                warn!(uri = %parts.uri, "Missing authorization header");
                ApiError::unauthorized("Missing authorization header")
            })?;

        let token = extract_bearer_token(header)
            .ok_or_else(|| ApiError::unauthorized("Invalid authorization header"))?;

        let claims = state.jwt.validate_token(token).map_err(|err| {
            warn!(uri = %parts.uri, error = %err.message, "Rejected token");
            err
        })?;

        Ok(CurrentUser(claims.into()))
    }
}
