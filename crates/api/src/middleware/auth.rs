//! JWT authentication middleware and helpers.
//!
//! Tokens are issued at login and accepted either from the
//! `Authorization: Bearer <token>` header or from the `access_token_cookie`
//! cookie. Logged-out tokens are rejected through the session deny list.

use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::http::request::Parts;
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use curbside_common::error::AppError;
use curbside_common::types::UserRole;

use crate::state::AppState;

pub const AUTH_COOKIE: &str = "access_token_cookie";

/// JWT claims stored in the token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject: the user's UUID
    pub sub: String,
    pub role: UserRole,
    /// Token id, the handle used for revocation
    pub jti: String,
    /// Issued at (UNIX timestamp)
    pub iat: i64,
    /// Expiration time (UNIX timestamp)
    pub exp: i64,
}

impl Claims {
    /// Seconds until the token expires, negative once it has.
    pub fn remaining_secs(&self) -> i64 {
        self.exp - Utc::now().timestamp()
    }
}

/// Authenticated user extracted from the request.
///
/// ```ignore
/// async fn handler(auth: AuthUser) -> impl IntoResponse {
///     auth.require_role(UserRole::Driver)?;
///     // auth.user_id is the caller's UUID
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub role: UserRole,
    pub claims: Claims,
}

impl AuthUser {
    /// Reject callers whose role differs from `role`.
    pub fn require_role(&self, role: UserRole) -> Result<(), AppError> {
        if self.role == role {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!(
                "This action requires a {} account",
                role
            )))
        }
    }

    /// Validate a raw token: signature, expiry and revocation.
    pub async fn from_token(token: &str, state: &AppState) -> Result<Self, AppError> {
        let claims = decode_jwt(token, &state.config.jwt_secret)?;
        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| AppError::Auth("Invalid user ID in token".to_string()))?;

        if state.sessions().is_revoked(&claims.jti).await? {
            return Err(AppError::Auth("Token has been revoked".to_string()));
        }

        Ok(AuthUser {
            user_id,
            role: claims.role,
            claims,
        })
    }

    /// Authenticate from request headers, for handlers where auth is optional.
    pub async fn from_headers(headers: &HeaderMap, state: &AppState) -> Result<Self, AppError> {
        let token = token_from_headers(headers).ok_or_else(missing_token)?;
        Self::from_token(&token, state).await
    }
}

fn missing_token() -> AppError {
    AppError::Auth(
        "Missing or invalid credentials. Use 'Authorization: Bearer <JWT>' or log in first"
            .to_string(),
    )
}

/// Encode a JWT for a user. Returns the token and its claims.
pub fn encode_jwt(
    user_id: Uuid,
    role: UserRole,
    secret: &str,
    expiry_hours: u64,
) -> Result<(String, Claims), AppError> {
    let now = Utc::now();
    let exp = i64::try_from(expiry_hours)
        .ok()
        .and_then(Duration::try_hours)
        .and_then(|ttl| now.checked_add_signed(ttl))
        .ok_or_else(|| {
            AppError::Internal(format!("JWT expiry of {} hours is out of range", expiry_hours))
        })?;

    let claims = Claims {
        sub: user_id.to_string(),
        role,
        jti: Uuid::new_v4().to_string(),
        iat: now.timestamp(),
        exp: exp.timestamp(),
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Failed to encode JWT: {}", e)))?;

    Ok((token, claims))
}

/// Decode and validate a JWT token.
pub fn decode_jwt(token: &str, secret: &str) -> Result<Claims, AppError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| AppError::Auth(format!("Invalid token: {}", e)))?;

    Ok(token_data.claims)
}

/// Bearer header first, then the auth cookie.
pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == AUTH_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

/// `Set-Cookie` value carrying a freshly issued token.
pub fn auth_cookie(token: &str, max_age_secs: i64, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        AUTH_COOKIE,
        token,
        max_age_secs.max(0)
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` value that removes the auth cookie.
pub fn clear_auth_cookie(secure: bool) -> String {
    auth_cookie("", 0, secure)
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let token = token_from_headers(&parts.headers);
        let state = state.clone();

        async move {
            let token = token.ok_or_else(missing_token)?;
            AuthUser::from_token(&token, &state).await
        }
    }
}
