//! Stop requests. A street holds at most one pending request; it is
//! cleared when a driver arrives there.

use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use curbside_common::error::AppError;
use curbside_common::types::{NotificationTarget, NotificationType, StopRequest, UserRole};

use crate::account::AccountService;
use crate::notification::{NewNotification, NotificationService};

pub struct StopRequestService;

impl StopRequestService {
    /// File a request for the resident's street and notify drivers.
    pub async fn create(pool: &PgPool, resident_id: Uuid) -> Result<StopRequest, AppError> {
        let resident = AccountService::get_with_role(pool, resident_id, UserRole::Resident).await?;
        let street_name = resident.street_name.clone().ok_or_else(|| {
            AppError::Validation(format!("Resident {} has no street", resident_id))
        })?;

        let mut tx = pool.begin().await?;

        let request: StopRequest = sqlx::query_as(
            r#"
            INSERT INTO stop_requests (id, resident_id, street_name)
            VALUES ($1, $2, $3)
            ON CONFLICT (street_name) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(resident.id)
        .bind(&street_name)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::Conflict("Request already exists for this street".to_string()))?;

        let announcement = NewNotification::new(
            NotificationType::Requested,
            "Stop Requested",
            format!(
                "'{}' has requested a stop for street '{}'.",
                resident.full_name(),
                street_name
            ),
            NotificationTarget::Street(street_name.clone()),
        );
        NotificationService::insert(&mut tx, &announcement).await?;

        tx.commit().await?;

        tracing::info!(
            request_id = %request.id,
            resident_id = %resident.id,
            street = %street_name,
            "Stop requested"
        );

        Ok(request)
    }

    pub async fn list_by_street(
        pool: &PgPool,
        street_name: &str,
    ) -> Result<Vec<StopRequest>, AppError> {
        let requests: Vec<StopRequest> = sqlx::query_as(
            "SELECT * FROM stop_requests WHERE street_name = $1 ORDER BY created_at DESC, id",
        )
        .bind(street_name)
        .fetch_all(pool)
        .await?;
        Ok(requests)
    }

    /// Remove every pending request for a street. Returns the number removed.
    pub async fn delete_for_street(
        conn: &mut PgConnection,
        street_name: &str,
    ) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM stop_requests WHERE street_name = $1")
            .bind(street_name)
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected())
    }
}
