//! Stop service: drivers schedule visits to streets and mark them done.
//!
//! Every state change writes a street-targeted notification in the same
//! transaction, so residents never see a stop without its announcement.

use chrono::{NaiveDate, NaiveDateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use curbside_common::db::is_unique_violation;
use curbside_common::error::AppError;
use curbside_common::types::{
    Notification, NotificationCategory, NotificationPriority, NotificationTarget,
    NotificationType, Stop, UserRole,
};

use crate::account::AccountService;
use crate::notification::{NewNotification, NotificationService};
use crate::stop_request::StopRequestService;
use crate::street::StreetService;

pub struct StopService;

/// What `mark_arrival` changed.
#[derive(Debug, Clone)]
pub struct ArrivalOutcome {
    pub stop: Stop,
    pub notification: Notification,
    pub requests_cleared: u64,
}

/// Parse a `YYYY-MM-DD` date. A full `YYYY-MM-DDTHH:MM:SS` timestamp is
/// accepted and truncated to its date.
pub fn parse_scheduled_date(raw: &str) -> Result<NaiveDate, AppError> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S").map(|dt| dt.date()))
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|dt| dt.date()))
        .map_err(|_| {
            AppError::Validation(format!(
                "Invalid date '{}'. Expected YYYY-MM-DD",
                raw
            ))
        })
}

impl StopService {
    /// Schedule a stop and announce it to the street.
    pub async fn schedule(
        pool: &PgPool,
        driver_id: Uuid,
        street_name: &str,
        scheduled_date: NaiveDate,
    ) -> Result<Stop, AppError> {
        let driver = AccountService::get_with_role(pool, driver_id, UserRole::Driver).await?;

        let mut tx = pool.begin().await?;

        let street = StreetService::get_or_create(&mut tx, street_name).await?;

        let stop: Stop = sqlx::query_as(
            r#"
            INSERT INTO stops (id, driver_id, street_name, scheduled_date)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(driver.id)
        .bind(&street.name)
        .bind(scheduled_date)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict(format!(
                    "A stop is already scheduled for '{}' on {}",
                    street.name, scheduled_date
                ))
            } else {
                e.into()
            }
        })?;

        let announcement = NewNotification::new(
            NotificationType::Confirmed,
            "Stop Scheduled",
            format!(
                "A stop was successfully scheduled by '{}' at street '{}' for '{}'.",
                driver.full_name(),
                street.name,
                scheduled_date
            ),
            NotificationTarget::Street(street.name.clone()),
        )
        .category(NotificationCategory::Schedule);
        NotificationService::insert(&mut tx, &announcement).await?;

        tx.commit().await?;

        tracing::info!(
            stop_id = %stop.id,
            driver_id = %driver.id,
            street = %stop.street_name,
            date = %stop.scheduled_date,
            "Stop scheduled"
        );

        Ok(stop)
    }

    /// Record the driver's arrival, notify the street and clear its pending requests.
    pub async fn mark_arrival(
        pool: &PgPool,
        driver_id: Uuid,
        stop_id: Uuid,
    ) -> Result<ArrivalOutcome, AppError> {
        let driver = AccountService::get_with_role(pool, driver_id, UserRole::Driver).await?;

        let mut tx = pool.begin().await?;

        let stop: Stop = sqlx::query_as("SELECT * FROM stops WHERE id = $1 FOR UPDATE")
            .bind(stop_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Stop {} not found", stop_id)))?;

        if stop.driver_id != driver.id {
            return Err(AppError::Forbidden(
                "Only the scheduling driver can update this stop".to_string(),
            ));
        }
        if stop.has_arrived {
            return Err(AppError::Conflict(format!(
                "Stop {} has already been completed",
                stop_id
            )));
        }

        let stop: Stop = sqlx::query_as(
            "UPDATE stops SET has_arrived = TRUE, arrived_at = $1 WHERE id = $2 RETURNING *",
        )
        .bind(Utc::now())
        .bind(stop_id)
        .fetch_one(&mut *tx)
        .await?;

        let announcement = NewNotification::new(
            NotificationType::Arrived,
            "Driver Arrived",
            format!("'{}' has arrived at your street.", driver.full_name()),
            NotificationTarget::Street(stop.street_name.clone()),
        )
        .category(NotificationCategory::Service)
        .priority(NotificationPriority::High);
        let notification = NotificationService::insert(&mut tx, &announcement).await?;

        let requests_cleared = StopRequestService::delete_for_street(&mut tx, &stop.street_name).await?;

        tx.commit().await?;

        tracing::info!(
            stop_id = %stop.id,
            driver_id = %driver.id,
            street = %stop.street_name,
            requests_cleared,
            "Driver arrived at stop"
        );

        Ok(ArrivalOutcome {
            stop,
            notification,
            requests_cleared,
        })
    }

    /// Delete a stop. Residents are told when a pending visit is called off.
    pub async fn cancel(pool: &PgPool, driver_id: Uuid, stop_id: Uuid) -> Result<Stop, AppError> {
        let driver = AccountService::get_with_role(pool, driver_id, UserRole::Driver).await?;

        let mut tx = pool.begin().await?;

        let stop: Stop = sqlx::query_as("SELECT * FROM stops WHERE id = $1 FOR UPDATE")
            .bind(stop_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Stop {} not found", stop_id)))?;

        if stop.driver_id != driver.id {
            return Err(AppError::Forbidden(
                "Only the scheduling driver can cancel this stop".to_string(),
            ));
        }

        sqlx::query("DELETE FROM stops WHERE id = $1")
            .bind(stop_id)
            .execute(&mut *tx)
            .await?;

        if !stop.has_arrived {
            let announcement = NewNotification::new(
                NotificationType::Cancelled,
                "Stop Cancelled",
                format!(
                    "The stop by '{}' at street '{}' for '{}' was cancelled.",
                    driver.full_name(),
                    stop.street_name,
                    stop.scheduled_date
                ),
                NotificationTarget::Street(stop.street_name.clone()),
            )
            .category(NotificationCategory::Schedule);
            NotificationService::insert(&mut tx, &announcement).await?;
        }

        tx.commit().await?;

        tracing::info!(
            stop_id = %stop.id,
            driver_id = %driver.id,
            street = %stop.street_name,
            "Stop cancelled"
        );

        Ok(stop)
    }

    pub async fn get(pool: &PgPool, stop_id: Uuid) -> Result<Stop, AppError> {
        let stop: Stop = sqlx::query_as("SELECT * FROM stops WHERE id = $1")
            .bind(stop_id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Stop {} not found", stop_id)))?;
        Ok(stop)
    }

    /// All stops, most recently created first.
    pub async fn list(pool: &PgPool) -> Result<Vec<Stop>, AppError> {
        let stops: Vec<Stop> = sqlx::query_as("SELECT * FROM stops ORDER BY created_at DESC, id")
            .fetch_all(pool)
            .await?;
        Ok(stops)
    }

    /// A driver's stops in date order.
    pub async fn list_by_driver(pool: &PgPool, driver_id: Uuid) -> Result<Vec<Stop>, AppError> {
        let stops: Vec<Stop> = sqlx::query_as(
            "SELECT * FROM stops WHERE driver_id = $1 ORDER BY scheduled_date, street_name",
        )
        .bind(driver_id)
        .fetch_all(pool)
        .await?;
        Ok(stops)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_date() {
        assert_eq!(
            parse_scheduled_date("2025-09-14").unwrap(),
            NaiveDate::from_ymd_opt(2025, 9, 14).unwrap()
        );
        assert_eq!(
            parse_scheduled_date(" 2024-01-15 ").unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
        );
    }

    #[test]
    fn test_parse_timestamp_keeps_date() {
        assert_eq!(
            parse_scheduled_date("2025-09-20T08:30:00").unwrap(),
            NaiveDate::from_ymd_opt(2025, 9, 20).unwrap()
        );
        assert_eq!(
            parse_scheduled_date("2025-09-20 08:30:00").unwrap(),
            NaiveDate::from_ymd_opt(2025, 9, 20).unwrap()
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for raw in ["", "tomorrow", "2025-13-01", "14/09/2025"] {
            assert!(
                matches!(parse_scheduled_date(raw), Err(AppError::Validation(_))),
                "{raw}"
            );
        }
    }
}
