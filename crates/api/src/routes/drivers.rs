//! Driver routes: directory, status and the driver's own stops.

use axum::extract::{Path, State};
use axum::routing::{get, patch};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use curbside_common::error::AppError;
use curbside_common::types::{DriverStatus, StopView, UserProfile, UserRole};
use curbside_engine::account::AccountService;
use curbside_engine::stop::StopService;

use super::{Data, data};
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/drivers", get(list_drivers))
        .route("/api/drivers/{id}/status", get(driver_status))
        .route("/api/drivers/me/status", patch(update_my_status))
        .route("/api/drivers/me/stops", get(my_stops))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverStatusResponse {
    pub driver_id: Uuid,
    pub status: DriverStatus,
    pub current_location: Option<String>,
    pub summary: String,
}

/// Omitted fields keep their current value.
#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: Option<String>,
    #[serde(alias = "where")]
    pub location: Option<String>,
}

async fn list_drivers(
    State(state): State<AppState>,
) -> Result<Json<Data<Vec<UserProfile>>>, AppError> {
    let drivers = AccountService::list(&state.pool, Some(UserRole::Driver)).await?;
    Ok(data(drivers.into_iter().map(UserProfile::from).collect()))
}

/// GET /api/drivers/{id}/status
async fn driver_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Data<DriverStatusResponse>>, AppError> {
    let driver = AccountService::get_with_role(&state.pool, id, UserRole::Driver).await?;
    Ok(data(DriverStatusResponse {
        driver_id: driver.id,
        status: driver.status.unwrap_or_default(),
        summary: driver.status_summary(),
        current_location: driver.current_location,
    }))
}

/// PATCH /api/drivers/me/status: `{status?, location?}`
async fn update_my_status(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<Data<UserProfile>>, AppError> {
    auth.require_role(UserRole::Driver)?;
    let status = req
        .status
        .as_deref()
        .map(str::parse::<DriverStatus>)
        .transpose()?;

    let driver = AccountService::update_driver_status(
        &state.pool,
        auth.user_id,
        status,
        req.location.as_deref(),
    )
    .await?;
    Ok(data(driver.into()))
}

async fn my_stops(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Data<Vec<StopView>>>, AppError> {
    auth.require_role(UserRole::Driver)?;
    let stops = StopService::list_by_driver(&state.pool, auth.user_id).await?;
    Ok(data(stops.into_iter().map(StopView::from).collect()))
}
