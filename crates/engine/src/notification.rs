//! Notification feed: creation, per-viewer inboxes, read receipts and expiry.
//!
//! A notification is addressed to one user, to the residents of a street,
//! or to everyone. Drivers additionally see street-level requests and
//! confirmations, which form their work queue. Read state is tracked per
//! viewer in `notification_reads`, so a global notification read by one
//! resident stays unread for everybody else.

use chrono::{DateTime, Duration, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use curbside_common::db::is_foreign_key_violation;
use curbside_common::error::AppError;
use curbside_common::types::{
    InboxFilter, InboxItem, Notification, NotificationCategory, NotificationPriority,
    NotificationTarget, NotificationType, Viewer,
};

pub const DEFAULT_INBOX_LIMIT: i64 = 50;
pub const MAX_INBOX_LIMIT: i64 = 200;
/// Longest accepted `expires_in_minutes`: five years.
pub const MAX_EXPIRY_MINUTES: i64 = 5 * 365 * 24 * 60;

/// SQL twin of `Notification::is_visible_to`.
///
/// Binds: `$1` viewer id, `$2` viewer role, `$3` viewer street (nullable).
macro_rules! visible_to_viewer {
    () => {
        r#"
        (n.expires_at IS NULL OR n.expires_at > NOW())
        AND (
            (n.recipient_id IS NULL AND n.street_name IS NULL)
            OR n.recipient_id = $1
            OR (n.recipient_id IS NULL AND $2 = 'resident' AND n.street_name = $3)
            OR (n.recipient_id IS NULL AND $2 = 'driver' AND n.street_name IS NOT NULL
                AND n.notification_type IN ('requested', 'confirmed'))
        )
        "#
    };
}

/// A notification about to be stored.
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub title: String,
    pub message: String,
    pub notification_type: NotificationType,
    pub category: NotificationCategory,
    pub priority: NotificationPriority,
    pub target: NotificationTarget,
    /// Street recorded alongside a user-targeted notification
    pub context_street: Option<String>,
    pub expires_in_minutes: Option<i64>,
}

impl NewNotification {
    pub fn new(
        notification_type: NotificationType,
        title: impl Into<String>,
        message: impl Into<String>,
        target: NotificationTarget,
    ) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            notification_type,
            category: NotificationCategory::default(),
            priority: NotificationPriority::default(),
            target,
            context_street: None,
            expires_in_minutes: None,
        }
    }

    pub fn category(mut self, category: NotificationCategory) -> Self {
        self.category = category;
        self
    }

    pub fn priority(mut self, priority: NotificationPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn expires_in_minutes(mut self, minutes: i64) -> Self {
        self.expires_in_minutes = Some(minutes);
        self
    }

    pub fn context_street(mut self, street: impl Into<String>) -> Self {
        self.context_street = Some(street.into());
        self
    }

    fn validate(&self) -> Result<(), AppError> {
        if self.title.trim().is_empty() {
            return Err(AppError::Validation("title is required".to_string()));
        }
        if self.message.trim().is_empty() {
            return Err(AppError::Validation("message is required".to_string()));
        }
        if let Some(minutes) = self.expires_in_minutes
            && !(1..=MAX_EXPIRY_MINUTES).contains(&minutes)
        {
            return Err(AppError::Validation(format!(
                "expiresInMinutes must be between 1 and {}",
                MAX_EXPIRY_MINUTES
            )));
        }
        Ok(())
    }

    /// Absolute expiry relative to `now`, if one was requested.
    fn expires_at(&self, now: DateTime<Utc>) -> Result<Option<DateTime<Utc>>, AppError> {
        self.expires_in_minutes
            .map(|minutes| {
                Duration::try_minutes(minutes)
                    .and_then(|d| now.checked_add_signed(d))
                    .ok_or_else(|| {
                        AppError::Validation("expiresInMinutes is out of range".to_string())
                    })
            })
            .transpose()
    }

    /// Split the target into `(recipient_id, recipient_role, street_name)` columns.
    fn columns(&self) -> (Option<Uuid>, Option<&'static str>, Option<&str>) {
        match &self.target {
            NotificationTarget::Global => (None, None, None),
            NotificationTarget::Street(street) => (None, None, Some(street.as_str())),
            NotificationTarget::User { id, role } => {
                (Some(*id), Some(role.as_str()), self.context_street.as_deref())
            }
        }
    }
}

/// Inbox listing options.
#[derive(Debug, Clone, Copy)]
pub struct InboxQuery {
    pub filter: InboxFilter,
    pub unread_only: bool,
    pub limit: i64,
}

impl Default for InboxQuery {
    fn default() -> Self {
        Self {
            filter: InboxFilter::All,
            unread_only: false,
            limit: DEFAULT_INBOX_LIMIT,
        }
    }
}

impl InboxQuery {
    /// Clamp a caller-supplied limit into `1..=MAX_INBOX_LIMIT`.
    pub fn with_limit(mut self, limit: Option<i64>) -> Self {
        self.limit = limit
            .unwrap_or(DEFAULT_INBOX_LIMIT)
            .clamp(1, MAX_INBOX_LIMIT);
        self
    }
}

pub struct NotificationService;

impl NotificationService {
    /// Store a notification on an existing connection (usually inside the
    /// caller's transaction).
    pub async fn insert(
        conn: &mut PgConnection,
        new: &NewNotification,
    ) -> Result<Notification, AppError> {
        new.validate()?;

        let now = Utc::now();
        let expires_at = new.expires_at(now)?;
        let (recipient_id, recipient_role, street_name) = new.columns();

        let notification: Notification = sqlx::query_as(
            r#"
            INSERT INTO notifications
                (id, title, message, notification_type, category, priority,
                 recipient_id, recipient_role, street_name, created_at, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new.title.trim())
        .bind(new.message.trim())
        .bind(new.notification_type.as_str())
        .bind(new.category.as_str())
        .bind(new.priority.as_str())
        .bind(recipient_id)
        .bind(recipient_role)
        .bind(street_name)
        .bind(now)
        .bind(expires_at)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                AppError::NotFound("Notification recipient or street does not exist".to_string())
            } else {
                e.into()
            }
        })?;

        tracing::info!(
            notification_id = %notification.id,
            notification_type = %notification.notification_type,
            recipient_id = ?notification.recipient_id,
            street = ?notification.street_name,
            "Notification created"
        );

        Ok(notification)
    }

    pub async fn create(pool: &PgPool, new: &NewNotification) -> Result<Notification, AppError> {
        let mut conn = pool.acquire().await?;
        Self::insert(&mut conn, new).await
    }

    pub async fn get(pool: &PgPool, notification_id: Uuid) -> Result<Notification, AppError> {
        let notification: Notification =
            sqlx::query_as("SELECT * FROM notifications WHERE id = $1")
                .bind(notification_id)
                .fetch_optional(pool)
                .await?
                .ok_or_else(|| {
                    AppError::NotFound(format!("Notification {} not found", notification_id))
                })?;
        Ok(notification)
    }

    /// Notifications visible to `viewer`, newest first, each with the viewer's
    /// read receipt.
    pub async fn inbox(
        pool: &PgPool,
        viewer: &Viewer,
        query: &InboxQuery,
    ) -> Result<Vec<InboxItem>, AppError> {
        let items: Vec<InboxItem> = sqlx::query_as(concat!(
            r#"
            SELECT n.*, r.read_at
            FROM notifications n
            LEFT JOIN notification_reads r
              ON r.notification_id = n.id AND r.user_id = $1
            WHERE "#,
            visible_to_viewer!(),
            r#"
              AND ($4::text IS NULL OR n.notification_type = $4)
              AND (NOT $5 OR r.read_at IS NULL)
            ORDER BY n.created_at DESC, n.id
            LIMIT $6
            "#
        ))
        .bind(viewer.user_id)
        .bind(viewer.role.as_str())
        .bind(viewer.street_name.as_deref())
        .bind(query.filter.notification_type().map(|t| t.as_str()))
        .bind(query.unread_only)
        .bind(query.limit)
        .fetch_all(pool)
        .await?;

        Ok(items)
    }

    pub async fn unread_count(pool: &PgPool, viewer: &Viewer) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar(concat!(
            r#"
            SELECT COUNT(*)
            FROM notifications n
            LEFT JOIN notification_reads r
              ON r.notification_id = n.id AND r.user_id = $1
            WHERE "#,
            visible_to_viewer!(),
            " AND r.read_at IS NULL"
        ))
        .bind(viewer.user_id)
        .bind(viewer.role.as_str())
        .bind(viewer.street_name.as_deref())
        .fetch_one(pool)
        .await?;

        Ok(count)
    }

    /// Mark one notification read for `viewer`. Idempotent: a second call
    /// keeps the original `read_at`. Notifications the viewer cannot see
    /// read as missing.
    pub async fn mark_as_read(
        pool: &PgPool,
        viewer: &Viewer,
        notification_id: Uuid,
    ) -> Result<InboxItem, AppError> {
        let notification = Self::get(pool, notification_id).await?;
        if !notification.is_visible_to(viewer, Utc::now()) {
            return Err(AppError::NotFound(format!(
                "Notification {} not found",
                notification_id
            )));
        }

        let read_at: DateTime<Utc> = sqlx::query_scalar(
            r#"
            INSERT INTO notification_reads (notification_id, user_id, read_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (notification_id, user_id)
            DO UPDATE SET read_at = notification_reads.read_at
            RETURNING read_at
            "#,
        )
        .bind(notification_id)
        .bind(viewer.user_id)
        .fetch_one(pool)
        .await?;

        tracing::debug!(
            notification_id = %notification_id,
            user_id = %viewer.user_id,
            "Notification marked as read"
        );

        Ok(InboxItem {
            notification,
            read_at: Some(read_at),
        })
    }

    /// Mark everything in the viewer's inbox read. Returns how many were newly marked.
    pub async fn mark_all_read(pool: &PgPool, viewer: &Viewer) -> Result<u64, AppError> {
        let result = sqlx::query(concat!(
            r#"
            INSERT INTO notification_reads (notification_id, user_id, read_at)
            SELECT n.id, $1, NOW()
            FROM notifications n
            WHERE "#,
            visible_to_viewer!(),
            " ON CONFLICT (notification_id, user_id) DO NOTHING"
        ))
        .bind(viewer.user_id)
        .bind(viewer.role.as_str())
        .bind(viewer.street_name.as_deref())
        .execute(pool)
        .await?;

        let marked = result.rows_affected();
        tracing::info!(user_id = %viewer.user_id, marked, "Inbox marked as read");
        Ok(marked)
    }

    /// Delete notifications whose expiry has passed. Returns the number removed.
    pub async fn purge_expired(pool: &PgPool) -> Result<u64, AppError> {
        let result =
            sqlx::query("DELETE FROM notifications WHERE expires_at IS NOT NULL AND expires_at <= NOW()")
                .execute(pool)
                .await?;

        let purged = result.rows_affected();
        if purged > 0 {
            tracing::info!(purged, "Expired notifications purged");
        }
        Ok(purged)
    }

    /// All notifications recorded against a street, newest first.
    pub async fn list_by_street(
        pool: &PgPool,
        street_name: &str,
        notification_type: Option<NotificationType>,
    ) -> Result<Vec<Notification>, AppError> {
        let notifications: Vec<Notification> = sqlx::query_as(
            r#"
            SELECT * FROM notifications
            WHERE street_name = $1
              AND ($2::text IS NULL OR notification_type = $2)
            ORDER BY created_at DESC, id
            "#,
        )
        .bind(street_name)
        .bind(notification_type.map(|t| t.as_str()))
        .fetch_all(pool)
        .await?;

        Ok(notifications)
    }
}

#[cfg(test)]
mod tests {
    use curbside_common::types::UserRole;

    use super::*;

    #[test]
    fn test_builder_defaults() {
        let n = NewNotification::new(
            NotificationType::System,
            "Test Notification",
            "This is a test notification message",
            NotificationTarget::Global,
        );
        assert_eq!(n.category, NotificationCategory::General);
        assert_eq!(n.priority, NotificationPriority::Normal);
        assert!(n.expires_in_minutes.is_none());
        assert_eq!(n.columns(), (None, None, None));
    }

    #[test]
    fn test_builder_overrides() {
        let n = NewNotification::new(
            NotificationType::Arrived,
            "Arrived",
            "Driver is here",
            NotificationTarget::Street("Test Street".to_string()),
        )
        .category(NotificationCategory::Service)
        .priority(NotificationPriority::High)
        .expires_in_minutes(30);

        assert_eq!(n.category, NotificationCategory::Service);
        assert_eq!(n.priority, NotificationPriority::High);
        assert_eq!(n.expires_in_minutes, Some(30));
        assert_eq!(n.columns(), (None, None, Some("Test Street")));
    }

    #[test]
    fn test_recipient_columns_keep_context_street() {
        let id = Uuid::new_v4();
        let n = NewNotification::new(
            NotificationType::System,
            "Hi",
            "Just for you",
            NotificationTarget::User {
                id,
                role: UserRole::Resident,
            },
        )
        .context_street("Test Street");
        assert_eq!(
            n.columns(),
            (Some(id), Some("resident"), Some("Test Street"))
        );
    }

    #[test]
    fn test_validate() {
        let ok = NewNotification::new(
            NotificationType::System,
            "t",
            "m",
            NotificationTarget::Global,
        );
        assert!(ok.validate().is_ok());

        let mut blank = ok.clone();
        blank.message = "  ".to_string();
        assert!(matches!(blank.validate(), Err(AppError::Validation(_))));

        let expired = ok.clone().expires_in_minutes(0);
        assert!(expired.validate().is_err());

        let longest = ok.clone().expires_in_minutes(MAX_EXPIRY_MINUTES);
        assert!(longest.validate().is_ok());
    }

    #[test]
    fn test_oversized_expiry_rejected() {
        let n = NewNotification::new(
            NotificationType::System,
            "t",
            "m",
            NotificationTarget::Global,
        )
        .expires_in_minutes(200_000_000_000);
        assert!(matches!(n.validate(), Err(AppError::Validation(_))));
        assert!(matches!(n.expires_at(Utc::now()), Err(AppError::Validation(_))));
        assert!(matches!(
            n.expires_in_minutes(i64::MAX).expires_at(Utc::now()),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_expires_at_offsets_now() {
        let now = Utc::now();
        let n = NewNotification::new(
            NotificationType::System,
            "t",
            "m",
            NotificationTarget::Global,
        );
        assert_eq!(n.expires_at(now).unwrap(), None);
        assert_eq!(
            n.expires_in_minutes(90).expires_at(now).unwrap(),
            Some(now + Duration::minutes(90))
        );
    }

    #[test]
    fn test_inbox_limit_clamped() {
        assert_eq!(InboxQuery::default().with_limit(None).limit, DEFAULT_INBOX_LIMIT);
        assert_eq!(InboxQuery::default().with_limit(Some(0)).limit, 1);
        assert_eq!(InboxQuery::default().with_limit(Some(10_000)).limit, MAX_INBOX_LIMIT);
        assert_eq!(InboxQuery::default().with_limit(Some(7)).limit, 7);
    }
}
