use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

/// Implements `Display` and `FromStr` for a text-backed enum with an
/// `ALL` table and an `as_str` method.
macro_rules! text_enum {
    ($ty:ty, $label:literal) => {
        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $ty {
            type Err = AppError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let wanted = s.trim().to_ascii_lowercase();
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str() == wanted)
                    .ok_or_else(|| {
                        let valid: Vec<&str> = Self::ALL.iter().map(|v| v.as_str()).collect();
                        AppError::Validation(format!(
                            "Invalid {} '{}'. Valid values: {}",
                            $label,
                            s,
                            valid.join(", ")
                        ))
                    })
            }
        }
    };
}

/// Account role. Every user is exactly one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Driver,
    Resident,
}

impl UserRole {
    pub const ALL: &'static [UserRole] = &[UserRole::Driver, UserRole::Resident];

    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Driver => "driver",
            UserRole::Resident => "resident",
        }
    }
}

text_enum!(UserRole, "role");

/// What a driver is currently doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DriverStatus {
    #[default]
    Inactive,
    EnRoute,
    Delivering,
}

impl DriverStatus {
    pub const ALL: &'static [DriverStatus] = &[
        DriverStatus::Inactive,
        DriverStatus::EnRoute,
        DriverStatus::Delivering,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DriverStatus::Inactive => "inactive",
            DriverStatus::EnRoute => "en_route",
            DriverStatus::Delivering => "delivering",
        }
    }
}

text_enum!(DriverStatus, "driver status");

/// Kind of event a notification reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    Requested,
    Confirmed,
    Arrived,
    Cancelled,
    System,
}

impl NotificationType {
    pub const ALL: &'static [NotificationType] = &[
        NotificationType::Requested,
        NotificationType::Confirmed,
        NotificationType::Arrived,
        NotificationType::Cancelled,
        NotificationType::System,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::Requested => "requested",
            NotificationType::Confirmed => "confirmed",
            NotificationType::Arrived => "arrived",
            NotificationType::Cancelled => "cancelled",
            NotificationType::System => "system",
        }
    }

    /// Street-targeted types that also land in every driver's inbox.
    pub const DRIVER_STREET_TYPES: &'static [NotificationType] =
        &[NotificationType::Requested, NotificationType::Confirmed];

    /// Types a given role may filter its inbox by.
    pub fn inbox_filters(role: UserRole) -> &'static [NotificationType] {
        match role {
            UserRole::Driver => Self::DRIVER_STREET_TYPES,
            UserRole::Resident => &[
                NotificationType::Requested,
                NotificationType::Confirmed,
                NotificationType::Arrived,
            ],
        }
    }
}

text_enum!(NotificationType, "notification type");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NotificationCategory {
    #[default]
    General,
    Schedule,
    Service,
    System,
}

impl NotificationCategory {
    pub const ALL: &'static [NotificationCategory] = &[
        NotificationCategory::General,
        NotificationCategory::Schedule,
        NotificationCategory::Service,
        NotificationCategory::System,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationCategory::General => "general",
            NotificationCategory::Schedule => "schedule",
            NotificationCategory::Service => "service",
            NotificationCategory::System => "system",
        }
    }
}

text_enum!(NotificationCategory, "notification category");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NotificationPriority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

impl NotificationPriority {
    pub const ALL: &'static [NotificationPriority] = &[
        NotificationPriority::Low,
        NotificationPriority::Normal,
        NotificationPriority::High,
        NotificationPriority::Urgent,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationPriority::Low => "low",
            NotificationPriority::Normal => "normal",
            NotificationPriority::High => "high",
            NotificationPriority::Urgent => "urgent",
        }
    }
}

text_enum!(NotificationPriority, "notification priority");

/// A street that stops can be scheduled on.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Street {
    pub name: String,
    #[serde(skip)]
    pub created_at: DateTime<Utc>,
}

/// A user in the system. Driver and resident fields are `None` for the
/// other role.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(rename = "type")]
    pub role: UserRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<DriverStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub street_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn is_driver(&self) -> bool {
        self.role == UserRole::Driver
    }

    pub fn is_resident(&self) -> bool {
        self.role == UserRole::Resident
    }

    /// One-line driver status, e.g. `Bob Yi is currently en_route at Laventille`.
    pub fn status_summary(&self) -> String {
        format!(
            "{} is currently {} at {}",
            self.full_name(),
            self.status.unwrap_or_default(),
            self.current_location.as_deref().unwrap_or("unknown")
        )
    }

    /// The inbox identity of this user.
    pub fn viewer(&self) -> Viewer {
        Viewer {
            user_id: self.id,
            role: self.role,
            street_name: self.street_name.clone(),
        }
    }
}

impl std::fmt::Display for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "<{} {} {} ({})>",
            self.role,
            self.id,
            self.full_name(),
            self.username
        )
    }
}

/// Public JSON shape of a user.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(flatten)]
    pub user: User,
    pub full_name: String,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        let full_name = user.full_name();
        Self { user, full_name }
    }
}

/// Derived lifecycle of a stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopStatus {
    Scheduled,
    Completed,
}

/// A scheduled or completed collection visit by a driver to a street.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Stop {
    pub id: Uuid,
    pub driver_id: Uuid,
    pub street_name: String,
    pub scheduled_date: NaiveDate,
    pub has_arrived: bool,
    pub arrived_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Stop {
    pub fn status(&self) -> StopStatus {
        if self.has_arrived {
            StopStatus::Completed
        } else {
            StopStatus::Scheduled
        }
    }
}

impl std::fmt::Display for Stop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.status() {
            StopStatus::Scheduled => write!(
                f,
                "Stop scheduled for {} on {}",
                self.street_name, self.scheduled_date
            ),
            StopStatus::Completed => write!(
                f,
                "Stop was made at {} on {}",
                self.street_name, self.scheduled_date
            ),
        }
    }
}

/// JSON shape of a stop, with its derived status.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StopView {
    #[serde(flatten)]
    pub stop: Stop,
    pub status: StopStatus,
    pub summary: String,
}

impl From<Stop> for StopView {
    fn from(stop: Stop) -> Self {
        Self {
            status: stop.status(),
            summary: stop.to_string(),
            stop,
        }
    }
}

/// A resident's pending ask for a stop on their street.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct StopRequest {
    pub id: Uuid,
    pub resident_id: Uuid,
    pub street_name: String,
    pub created_at: DateTime<Utc>,
}

/// Who a notification is addressed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationTarget {
    Global,
    Street(String),
    User { id: Uuid, role: UserRole },
}

/// The identity an inbox is computed for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Viewer {
    pub user_id: Uuid,
    pub role: UserRole,
    pub street_name: Option<String>,
}

/// A notification record. Read state lives per viewer in `notification_reads`.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Uuid,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub category: NotificationCategory,
    pub priority: NotificationPriority,
    pub recipient_id: Option<Uuid>,
    #[serde(rename = "recipientType")]
    pub recipient_role: Option<UserRole>,
    pub street_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Notification {
    /// A recipient wins over a street; a street wins over global.
    pub fn target(&self) -> NotificationTarget {
        match (self.recipient_id, &self.street_name) {
            (Some(id), _) => NotificationTarget::User {
                id,
                role: self.recipient_role.unwrap_or(UserRole::Resident),
            },
            (None, Some(street)) => NotificationTarget::Street(street.clone()),
            (None, None) => NotificationTarget::Global,
        }
    }

    pub fn is_global(&self) -> bool {
        self.recipient_id.is_none() && self.street_name.is_none()
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|exp| exp <= now)
    }

    /// Mirrors the inbox predicate in `NotificationService::inbox`.
    pub fn is_visible_to(&self, viewer: &Viewer, now: DateTime<Utc>) -> bool {
        if self.is_expired_at(now) {
            return false;
        }
        match self.target() {
            NotificationTarget::Global => true,
            NotificationTarget::User { id, .. } => id == viewer.user_id,
            NotificationTarget::Street(street) => match viewer.role {
                UserRole::Resident => viewer.street_name.as_deref() == Some(street.as_str()),
                UserRole::Driver => {
                    NotificationType::DRIVER_STREET_TYPES.contains(&self.notification_type)
                }
            },
        }
    }

    /// Whole minutes since creation, never negative.
    pub fn age_in_minutes(&self, now: DateTime<Utc>) -> i64 {
        (now - self.created_at).num_minutes().max(0)
    }

    /// Relative creation time: `Just now`, `5 minutes ago`, `2 hours ago`, `3 days ago`.
    pub fn format_created_at(&self, now: DateTime<Utc>) -> String {
        let age = now - self.created_at;
        let (amount, unit) = if age.num_seconds() < 60 {
            return "Just now".to_string();
        } else if age.num_minutes() < 60 {
            (age.num_minutes(), "minute")
        } else if age.num_hours() < 24 {
            (age.num_hours(), "hour")
        } else {
            (age.num_days(), "day")
        };
        let plural = if amount == 1 { "" } else { "s" };
        format!("{amount} {unit}{plural} ago")
    }
}

impl std::fmt::Display for Notification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[Created {}]\t{}",
            self.created_at.format("%Y-%m-%dT%H:%M:%S"),
            self.message
        )
    }
}

/// A notification as seen by one viewer, with that viewer's read receipt.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct InboxItem {
    #[sqlx(flatten)]
    pub notification: Notification,
    pub read_at: Option<DateTime<Utc>>,
}

impl InboxItem {
    pub fn is_read(&self) -> bool {
        self.read_at.is_some()
    }

    pub fn into_view(self, now: DateTime<Utc>) -> NotificationView {
        NotificationView {
            is_read: self.is_read(),
            read_at: self.read_at,
            is_global: self.notification.is_global(),
            age_in_minutes: self.notification.age_in_minutes(now),
            formatted_created_at: self.notification.format_created_at(now),
            notification: self.notification,
        }
    }
}

/// JSON shape of an inbox entry.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationView {
    #[serde(flatten)]
    pub notification: Notification,
    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub is_global: bool,
    pub age_in_minutes: i64,
    pub formatted_created_at: String,
}

/// Inbox filter, validated against the viewer's role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InboxFilter {
    #[default]
    All,
    Only(NotificationType),
}

impl InboxFilter {
    /// Parse `all` or one of the types the role may filter by.
    pub fn parse(raw: &str, role: UserRole) -> Result<Self, AppError> {
        let raw = raw.trim().to_ascii_lowercase();
        if raw.is_empty() || raw == "all" {
            return Ok(InboxFilter::All);
        }
        let allowed = NotificationType::inbox_filters(role);
        allowed
            .iter()
            .copied()
            .find(|t| t.as_str() == raw)
            .map(InboxFilter::Only)
            .ok_or_else(|| {
                let mut valid = vec!["all"];
                valid.extend(allowed.iter().map(|t| t.as_str()));
                AppError::Validation(format!(
                    "Invalid filter '{}' for {}. Valid filters: {}",
                    raw,
                    role,
                    valid.join(", ")
                ))
            })
    }

    pub fn notification_type(&self) -> Option<NotificationType> {
        match self {
            InboxFilter::All => None,
            InboxFilter::Only(t) => Some(*t),
        }
    }
}
