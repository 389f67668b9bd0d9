pub mod auth;
pub mod drivers;
pub mod health;
pub mod notifications;
pub mod residents;
pub mod stops;
pub mod streets;
pub mod users;

use axum::{Json, Router};
use serde::Serialize;

use crate::state::AppState;

/// Success envelope: `{"data": ...}`.
#[derive(Debug, Serialize)]
pub struct Data<T> {
    pub data: T,
}

pub fn data<T: Serialize>(data: T) -> Json<Data<T>> {
    Json(Data { data })
}

/// Build the complete API router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(health::router())
        .merge(auth::router())
        .merge(users::router())
        .merge(streets::router())
        .merge(drivers::router())
        .merge(residents::router())
        .merge(stops::router())
        .merge(notifications::router())
        .with_state(state)
}
