//! Street service: the set of streets stops can be scheduled on.

use sqlx::{PgConnection, PgPool};

use curbside_common::db::is_unique_violation;
use curbside_common::error::AppError;
use curbside_common::types::Street;

const MAX_STREET_NAME_LEN: usize = 255;

pub struct StreetService;

impl StreetService {
    /// Trim and validate a street name.
    pub fn normalize_name(name: &str) -> Result<String, AppError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::Validation("Street name is required".to_string()));
        }
        if name.chars().count() > MAX_STREET_NAME_LEN {
            return Err(AppError::Validation(format!(
                "Street name must be at most {} characters",
                MAX_STREET_NAME_LEN
            )));
        }
        Ok(name.to_string())
    }

    /// Create a new street. Fails with `Conflict` if it already exists.
    pub async fn create(pool: &PgPool, name: &str) -> Result<Street, AppError> {
        let name = Self::normalize_name(name)?;

        let street: Street =
            sqlx::query_as("INSERT INTO streets (name) VALUES ($1) RETURNING *")
                .bind(&name)
                .fetch_one(pool)
                .await
                .map_err(|e| {
                    if is_unique_violation(&e) {
                        AppError::Conflict(format!("Street '{}' already exists", name))
                    } else {
                        e.into()
                    }
                })?;

        tracing::info!(street = %street.name, "Street created");
        Ok(street)
    }

    /// Fetch a street, creating it if missing. Runs on the caller's connection
    /// so it can join a transaction.
    pub async fn get_or_create(conn: &mut PgConnection, name: &str) -> Result<Street, AppError> {
        let name = Self::normalize_name(name)?;

        let inserted: Option<Street> = sqlx::query_as(
            "INSERT INTO streets (name) VALUES ($1) ON CONFLICT (name) DO NOTHING RETURNING *",
        )
        .bind(&name)
        .fetch_optional(&mut *conn)
        .await?;

        if let Some(street) = inserted {
            tracing::info!(street = %street.name, "Street created on demand");
            return Ok(street);
        }

        let street: Street = sqlx::query_as("SELECT * FROM streets WHERE name = $1")
            .bind(&name)
            .fetch_one(&mut *conn)
            .await?;
        Ok(street)
    }

    pub async fn get(pool: &PgPool, name: &str) -> Result<Option<Street>, AppError> {
        let street: Option<Street> = sqlx::query_as("SELECT * FROM streets WHERE name = $1")
            .bind(name.trim())
            .fetch_optional(pool)
            .await?;
        Ok(street)
    }

    /// All streets, alphabetically.
    pub async fn list(pool: &PgPool) -> Result<Vec<Street>, AppError> {
        let streets: Vec<Street> = sqlx::query_as("SELECT * FROM streets ORDER BY name")
            .fetch_all(pool)
            .await?;
        Ok(streets)
    }
}
