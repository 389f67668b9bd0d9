//! Account service: registration, login and profile lookups for drivers
//! and residents.
//!
//! Both roles live in the `users` table. Drivers carry a status and a
//! free-text location; residents are bound to the street they live on.

use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use curbside_common::db::is_unique_violation;
use curbside_common::error::AppError;
use curbside_common::types::{DriverStatus, User, UserRole};

use crate::password::{hash_password_blocking, verify_password_blocking};
use crate::street::StreetService;

const MAX_USERNAME_LEN: usize = 20;

/// Service layer for user accounts.
pub struct AccountService;

/// Parameters for registering a new account.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterParams {
    pub username: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    /// `driver` or `resident`
    pub role: String,
    /// Required for residents, ignored for drivers
    #[serde(default)]
    pub street: Option<String>,
}

impl RegisterParams {
    fn validate(&self) -> Result<(), AppError> {
        let username = self.username.trim();
        if username.is_empty() {
            return Err(AppError::Validation("username is required".to_string()));
        }
        if username.chars().count() > MAX_USERNAME_LEN {
            return Err(AppError::Validation(format!(
                "username must be at most {} characters",
                MAX_USERNAME_LEN
            )));
        }
        if self.password.is_empty() {
            return Err(AppError::Validation("password is required".to_string()));
        }
        if self.first_name.trim().is_empty() || self.last_name.trim().is_empty() {
            return Err(AppError::Validation(
                "firstName and lastName are required".to_string(),
            ));
        }
        Ok(())
    }
}

impl AccountService {
    /// Register a driver or resident.
    pub async fn register(pool: &PgPool, params: &RegisterParams) -> Result<User, AppError> {
        params.validate()?;
        let role: UserRole = params.role.parse()?;

        let street_name = match role {
            UserRole::Driver => None,
            UserRole::Resident => {
                let requested = params
                    .street
                    .as_deref()
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .ok_or_else(|| {
                        AppError::Validation(
                            "street is required for resident registration".to_string(),
                        )
                    })?;
                let street = StreetService::get(pool, requested).await?.ok_or_else(|| {
                    AppError::Validation(format!("Street '{}' does not exist", requested))
                })?;
                Some(street.name)
            }
        };
        let status = (role == UserRole::Driver).then_some(DriverStatus::Inactive);
        let password_hash = hash_password_blocking(params.password.clone()).await?;
        let username = params.username.trim();

        let user: User = sqlx::query_as(
            r#"
            INSERT INTO users (id, username, password_hash, first_name, last_name, role, status, street_name)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(username)
        .bind(&password_hash)
        .bind(params.first_name.trim())
        .bind(params.last_name.trim())
        .bind(role.as_str())
        .bind(status.map(|s| s.as_str()))
        .bind(&street_name)
        .fetch_one(pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict(format!("User '{}' already exists", username))
            } else {
                e.into()
            }
        })?;

        tracing::info!(
            user_id = %user.id,
            username = %user.username,
            role = %user.role,
            "User registered"
        );

        Ok(user)
    }

    /// Check credentials. Returns `None` for an unknown user or a wrong password.
    pub async fn authenticate(
        pool: &PgPool,
        username: &str,
        password: &str,
    ) -> Result<Option<User>, AppError> {
        let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE username = $1")
            .bind(username.trim())
            .fetch_optional(pool)
            .await?;

        let Some(user) = user else {
            tracing::debug!(username, "Login attempt for unknown user");
            return Ok(None);
        };

        if verify_password_blocking(password.to_string(), user.password_hash.clone()).await? {
            Ok(Some(user))
        } else {
            tracing::debug!(user_id = %user.id, "Login attempt with wrong password");
            Ok(None)
        }
    }

    pub async fn find(pool: &PgPool, user_id: Uuid) -> Result<Option<User>, AppError> {
        let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(pool)
            .await?;
        Ok(user)
    }

    pub async fn get(pool: &PgPool, user_id: Uuid) -> Result<User, AppError> {
        Self::find(pool, user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))
    }

    /// Fetch a user that must have the given role; any other role reads as missing.
    pub async fn get_with_role(
        pool: &PgPool,
        user_id: Uuid,
        role: UserRole,
    ) -> Result<User, AppError> {
        match Self::find(pool, user_id).await? {
            Some(user) if user.role == role => Ok(user),
            _ => Err(AppError::NotFound(match role {
                UserRole::Driver => format!("Driver {} not found", user_id),
                UserRole::Resident => format!("Resident {} not found", user_id),
            })),
        }
    }

    /// List users, optionally restricted to one role.
    pub async fn list(pool: &PgPool, role: Option<UserRole>) -> Result<Vec<User>, AppError> {
        let users: Vec<User> = sqlx::query_as(
            "SELECT * FROM users WHERE ($1::text IS NULL OR role = $1) ORDER BY created_at, username",
        )
        .bind(role.map(|r| r.as_str()))
        .fetch_all(pool)
        .await?;
        Ok(users)
    }

    /// Update a driver's status and/or location. Omitted fields keep their value.
    pub async fn update_driver_status(
        pool: &PgPool,
        driver_id: Uuid,
        status: Option<DriverStatus>,
        location: Option<&str>,
    ) -> Result<User, AppError> {
        let location = location.map(str::trim).filter(|l| !l.is_empty());

        let driver: User = sqlx::query_as(
            r#"
            UPDATE users
            SET status = COALESCE($1, status),
                current_location = COALESCE($2, current_location)
            WHERE id = $3 AND role = 'driver'
            RETURNING *
            "#,
        )
        .bind(status.map(|s| s.as_str()))
        .bind(location)
        .bind(driver_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Driver {} not found", driver_id)))?;

        tracing::info!(
            driver_id = %driver_id,
            status = %driver.status.unwrap_or_default(),
            location = driver.current_location.as_deref().unwrap_or("unknown"),
            "Driver status updated"
        );

        Ok(driver)
    }
}
