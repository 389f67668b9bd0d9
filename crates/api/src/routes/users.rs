//! User directory.

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use curbside_common::error::AppError;
use curbside_common::types::{UserProfile, UserRole};
use curbside_engine::account::AccountService;

use super::{Data, data};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/users", get(list_users))
}

#[derive(Debug, Deserialize)]
pub struct UsersQuery {
    pub role: Option<String>,
}

/// GET /api/users: All users, optionally `?role=driver|resident`.
async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<UsersQuery>,
) -> Result<Json<Data<Vec<UserProfile>>>, AppError> {
    let role = query
        .role
        .as_deref()
        .filter(|r| !r.trim().is_empty())
        .map(str::parse::<UserRole>)
        .transpose()?;

    let users = AccountService::list(&state.pool, role).await?;
    Ok(data(users.into_iter().map(UserProfile::from).collect()))
}
