//! Stop routes: scheduling, arrival and cancellation.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, patch};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use curbside_common::error::AppError;
use curbside_common::types::{StopView, UserRole};
use curbside_engine::stop::{StopService, parse_scheduled_date};

use super::{Data, data};
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/stops", get(list_stops).post(schedule_stop))
        .route("/api/stops/{id}", patch(mark_arrival).delete(cancel_stop))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleStopRequest {
    pub street_name: String,
    /// `YYYY-MM-DD`
    pub scheduled_date: String,
}

async fn list_stops(State(state): State<AppState>) -> Result<Json<Data<Vec<StopView>>>, AppError> {
    let stops = StopService::list(&state.pool).await?;
    Ok(data(stops.into_iter().map(StopView::from).collect()))
}

/// POST /api/stops: Schedule a stop for the calling driver.
async fn schedule_stop(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<ScheduleStopRequest>,
) -> Result<(StatusCode, Json<Data<StopView>>), AppError> {
    auth.require_role(UserRole::Driver)?;
    let date = parse_scheduled_date(&req.scheduled_date)?;
    let stop = StopService::schedule(&state.pool, auth.user_id, &req.street_name, date).await?;
    Ok((StatusCode::CREATED, data(stop.into())))
}

/// PATCH /api/stops/{id}: Mark the driver as arrived.
async fn mark_arrival(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    auth.require_role(UserRole::Driver)?;
    let outcome = StopService::mark_arrival(&state.pool, auth.user_id, id).await?;
    let stop = StopView::from(outcome.stop);

    Ok(Json(json!({
        "message": format!("Arrived at {}", stop.stop.street_name),
        "data": stop,
        "requestsCleared": outcome.requests_cleared,
    })))
}

/// DELETE /api/stops/{id}
async fn cancel_stop(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    auth.require_role(UserRole::Driver)?;
    let stop = StopService::cancel(&state.pool, auth.user_id, id).await?;

    Ok(Json(json!({
        "message": "Stop cancelled",
        "data": StopView::from(stop),
    })))
}
