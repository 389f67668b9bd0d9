//! Resident routes.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use uuid::Uuid;

use curbside_common::error::AppError;
use curbside_common::types::{StopRequest, UserProfile, UserRole};
use curbside_engine::account::AccountService;
use curbside_engine::stop_request::StopRequestService;

use super::{Data, data};
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/residents", get(list_residents))
        .route("/api/residents/{id}", get(get_resident))
        .route("/api/residents/me/request", post(request_stop))
}

async fn list_residents(
    State(state): State<AppState>,
    _auth: AuthUser,
) -> Result<Json<Data<Vec<UserProfile>>>, AppError> {
    let residents = AccountService::list(&state.pool, Some(UserRole::Resident)).await?;
    Ok(data(residents.into_iter().map(UserProfile::from).collect()))
}

async fn get_resident(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Data<UserProfile>>, AppError> {
    let resident = AccountService::get_with_role(&state.pool, id, UserRole::Resident).await?;
    Ok(data(resident.into()))
}

/// POST /api/residents/me/request: Ask for a stop on the caller's street.
async fn request_stop(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<(StatusCode, Json<Data<StopRequest>>), AppError> {
    auth.require_role(UserRole::Resident)?;
    let request = StopRequestService::create(&state.pool, auth.user_id).await?;
    Ok((StatusCode::CREATED, data(request)))
}
