//! Notification inbox routes.
//!
//! The inbox is computed for the caller's current profile, so a resident
//! who moves street sees the new street's notifications straight away.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use curbside_common::error::AppError;
use curbside_common::types::{
    InboxFilter, InboxItem, NotificationCategory, NotificationPriority, NotificationTarget,
    NotificationType, NotificationView, UserRole, Viewer,
};
use curbside_engine::account::AccountService;
use curbside_engine::notification::{InboxQuery, NewNotification, NotificationService};

use super::{Data, data};
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/notifications",
            get(list_notifications).post(create_notification),
        )
        .route("/api/notifications/unread-count", get(unread_count))
        .route("/api/notifications/{id}/read", patch(mark_read))
        .route("/api/notifications/read-all", post(mark_all_read))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboxParams {
    pub filter: Option<String>,
    pub unread_only: Option<bool>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct UnreadCount {
    pub unread: i64,
}

#[derive(Debug, Serialize)]
pub struct MarkedCount {
    pub marked: u64,
}

/// Body of `POST /api/notifications`. With neither `recipientId` nor
/// `streetName` the notification is global.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNotificationRequest {
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub notification_type: Option<String>,
    pub category: Option<String>,
    pub priority: Option<String>,
    pub recipient_id: Option<Uuid>,
    pub street_name: Option<String>,
    pub expires_in_minutes: Option<i64>,
}

async fn viewer(state: &AppState, auth: &AuthUser) -> Result<Viewer, AppError> {
    let user = AccountService::get(&state.pool, auth.user_id).await?;
    Ok(user.viewer())
}

fn views(items: Vec<InboxItem>) -> Vec<NotificationView> {
    let now = Utc::now();
    items.into_iter().map(|item| item.into_view(now)).collect()
}

/// GET /api/notifications?filter=&unreadOnly=&limit=
async fn list_notifications(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<InboxParams>,
) -> Result<Json<Data<Vec<NotificationView>>>, AppError> {
    let viewer = viewer(&state, &auth).await?;
    let filter = match params.filter.as_deref() {
        Some(raw) => InboxFilter::parse(raw, viewer.role)?,
        None => InboxFilter::All,
    };
    let query = InboxQuery {
        filter,
        unread_only: params.unread_only.unwrap_or(false),
        ..InboxQuery::default()
    }
    .with_limit(params.limit);

    let items = NotificationService::inbox(&state.pool, &viewer, &query).await?;
    Ok(data(views(items)))
}

async fn unread_count(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Data<UnreadCount>>, AppError> {
    let viewer = viewer(&state, &auth).await?;
    let unread = NotificationService::unread_count(&state.pool, &viewer).await?;
    Ok(data(UnreadCount { unread }))
}

/// PATCH /api/notifications/{id}/read
async fn mark_read(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Data<NotificationView>>, AppError> {
    let viewer = viewer(&state, &auth).await?;
    let item = NotificationService::mark_as_read(&state.pool, &viewer, id).await?;
    Ok(data(item.into_view(Utc::now())))
}

async fn mark_all_read(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Data<MarkedCount>>, AppError> {
    let viewer = viewer(&state, &auth).await?;
    let marked = NotificationService::mark_all_read(&state.pool, &viewer).await?;
    Ok(data(MarkedCount { marked }))
}

/// POST /api/notifications: Drivers publish announcements.
async fn create_notification(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<CreateNotificationRequest>,
) -> Result<(StatusCode, Json<Data<NotificationView>>), AppError> {
    auth.require_role(UserRole::Driver)?;

    let notification_type = req
        .notification_type
        .as_deref()
        .map(str::parse::<NotificationType>)
        .transpose()?
        .unwrap_or(NotificationType::System);
    let street = req
        .street_name
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());

    let target = match (req.recipient_id, street) {
        (Some(id), _) => {
            let recipient = AccountService::get(&state.pool, id).await?;
            NotificationTarget::User {
                id,
                role: recipient.role,
            }
        }
        (None, Some(street)) => NotificationTarget::Street(street.to_string()),
        (None, None) => NotificationTarget::Global,
    };

    let mut new = NewNotification::new(notification_type, req.title, req.message, target);
    if let Some(category) = req.category.as_deref() {
        new = new.category(category.parse::<NotificationCategory>()?);
    }
    if let Some(priority) = req.priority.as_deref() {
        new = new.priority(priority.parse::<NotificationPriority>()?);
    }
    if let Some(minutes) = req.expires_in_minutes {
        new = new.expires_in_minutes(minutes);
    }
    if req.recipient_id.is_some()
        && let Some(street) = street
    {
        new = new.context_street(street);
    }

    let notification = NotificationService::create(&state.pool, &new).await?;
    let item = InboxItem {
        notification,
        read_at: None,
    };
    Ok((StatusCode::CREATED, data(item.into_view(Utc::now()))))
}
