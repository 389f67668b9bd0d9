//! Authentication routes: login, logout, identify and registration.

use axum::extract::State;
use axum::http::header::SET_COOKIE;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use curbside_common::error::AppError;
use curbside_common::types::{UserProfile, UserRole};
use curbside_engine::account::{AccountService, RegisterParams};

use super::{Data, data};
use crate::middleware::auth::{AuthUser, auth_cookie, clear_auth_cookie, encode_jwt};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/login", post(login))
        .route("/api/logout", get(logout))
        .route("/api/identify", get(identify))
        .route("/api/register", post(register))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
    pub user_id: Uuid,
    pub role: UserRole,
}

/// POST /api/login: Check credentials, return a JWT and set the auth cookie.
async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = AccountService::authenticate(&state.pool, &req.username, &req.password)
        .await?
        .ok_or_else(|| AppError::Auth("Bad username or password given".to_string()))?;

    let (token, claims) = encode_jwt(
        user.id,
        user.role,
        &state.config.jwt_secret,
        state.config.jwt_expiry_hours,
    )?;
    let cookie = auth_cookie(&token, claims.remaining_secs(), state.config.cookie_secure);

    tracing::info!(user_id = %user.id, role = %user.role, "User logged in");

    Ok((
        [(SET_COOKIE, cookie)],
        Json(LoginResponse {
            access_token: token,
            user_id: user.id,
            role: user.role,
        }),
    ))
}

/// GET /api/logout: Revoke the presented token (if any) and clear the cookie.
async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    match AuthUser::from_headers(&headers, &state).await {
        Ok(auth) => {
            state
                .sessions()
                .revoke(&auth.claims.jti, auth.claims.remaining_secs())
                .await?;
            tracing::info!(user_id = %auth.user_id, "User logged out");
        }
        Err(AppError::Auth(_)) => {}
        Err(e) => return Err(e),
    }

    Ok((
        [(SET_COOKIE, clear_auth_cookie(state.config.cookie_secure))],
        Json(json!({ "message": "Logged Out!" })),
    ))
}

/// GET /api/identify: Profile of the logged-in user.
async fn identify(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Data<UserProfile>>, AppError> {
    let user = AccountService::get(&state.pool, auth.user_id).await?;
    Ok(data(user.into()))
}

/// POST /api/register: Create a driver or resident account.
async fn register(
    State(state): State<AppState>,
    Json(params): Json<RegisterParams>,
) -> Result<impl IntoResponse, AppError> {
    let user = AccountService::register(&state.pool, &params).await?;
    let message = format!("User {} created", user.username);
    let profile = UserProfile::from(user);

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": message, "data": profile })),
    ))
}
