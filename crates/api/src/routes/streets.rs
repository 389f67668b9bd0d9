//! Street routes.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use curbside_common::error::AppError;
use curbside_common::types::{Street, UserRole};
use curbside_engine::street::StreetService;

use super::{Data, data};
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/streets", get(list_streets).post(create_street))
}

#[derive(Debug, Deserialize)]
pub struct CreateStreetRequest {
    pub name: String,
}

async fn list_streets(State(state): State<AppState>) -> Result<Json<Data<Vec<Street>>>, AppError> {
    let streets = StreetService::list(&state.pool).await?;
    Ok(data(streets))
}

/// POST /api/streets: Drivers add streets to the service area.
async fn create_street(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<CreateStreetRequest>,
) -> Result<(StatusCode, Json<Data<Street>>), AppError> {
    auth.require_role(UserRole::Driver)?;
    let street = StreetService::create(&state.pool, &req.name).await?;
    Ok((StatusCode::CREATED, data(street)))
}
