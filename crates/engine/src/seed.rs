//! Demo data for a fresh database.

use chrono::NaiveDate;
use sqlx::PgPool;

use curbside_common::error::AppError;
use curbside_common::types::{DriverStatus, User};

use crate::account::{AccountService, RegisterParams};
use crate::stop::StopService;
use crate::street::StreetService;

const STREETS: &[&str] = &["Randy Street", "Author Street", "Murray Drive", "Charles Avenue"];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub streets: usize,
    pub drivers: usize,
    pub residents: usize,
    pub stops: usize,
}

/// Wipe every table, keeping the schema.
pub async fn reset(pool: &PgPool) -> Result<(), AppError> {
    sqlx::query(
        "TRUNCATE notification_reads, notifications, stop_requests, stops, users, streets CASCADE",
    )
    .execute(pool)
    .await?;
    tracing::warn!("All tables truncated");
    Ok(())
}

/// Populate the demo streets, accounts and stops. Stops go through
/// `StopService` so their notifications exist too.
pub async fn seed(pool: &PgPool) -> Result<SeedSummary, AppError> {
    let mut summary = SeedSummary::default();

    for name in STREETS {
        StreetService::create(pool, name).await?;
        summary.streets += 1;
    }

    let bob = driver(pool, "bob", "bobpass", "Bob", "Yi").await?;
    AccountService::update_driver_status(pool, bob.id, Some(DriverStatus::EnRoute), Some("Laventille"))
        .await?;
    let tucker = driver(pool, "tuck", "tuckpass", "Tucker", "Moore").await?;
    AccountService::update_driver_status(pool, tucker.id, Some(DriverStatus::Inactive), Some("Home"))
        .await?;
    summary.drivers = 2;

    resident(pool, "rick", "rickpass", "Rick", "Smith", "Randy Street").await?;
    resident(pool, "amy", "amypass", "Amy", "Persad", "Author Street").await?;
    summary.residents = 2;

    StopService::schedule(pool, bob.id, "Randy Street", date(2025, 9, 14)?).await?;
    StopService::schedule(pool, tucker.id, "Randy Street", date(2025, 9, 20)?).await?;
    let visited = StopService::schedule(pool, bob.id, "Author Street", date(2025, 9, 14)?).await?;
    StopService::mark_arrival(pool, bob.id, visited.id).await?;
    summary.stops = 3;

    tracing::info!(?summary, "Database seeded");
    Ok(summary)
}

async fn driver(
    pool: &PgPool,
    username: &str,
    password: &str,
    first_name: &str,
    last_name: &str,
) -> Result<User, AppError> {
    AccountService::register(
        pool,
        &RegisterParams {
            username: username.to_string(),
            password: password.to_string(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            role: "driver".to_string(),
            street: None,
        },
    )
    .await
}

async fn resident(
    pool: &PgPool,
    username: &str,
    password: &str,
    first_name: &str,
    last_name: &str,
    street: &str,
) -> Result<User, AppError> {
    AccountService::register(
        pool,
        &RegisterParams {
            username: username.to_string(),
            password: password.to_string(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            role: "resident".to_string(),
            street: Some(street.to_string()),
        },
    )
    .await
}

fn date(year: i32, month: u32, day: u32) -> Result<NaiveDate, AppError> {
    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| AppError::Internal(format!("Invalid seed date {year}-{month}-{day}")))
}
