//! Command handlers. Results go to stdout, logs to stderr.

use sqlx::PgPool;
use uuid::Uuid;

use curbside_common::db::migrate;
use curbside_common::error::AppError;
use curbside_common::types::{DriverStatus, InboxFilter, UserProfile, UserRole};
use curbside_engine::account::{AccountService, RegisterParams};
use curbside_engine::notification::{InboxQuery, NotificationService};
use curbside_engine::seed;
use curbside_engine::stop::{StopService, parse_scheduled_date};
use curbside_engine::stop_request::StopRequestService;
use curbside_engine::street::StreetService;

pub async fn init(pool: &PgPool) -> anyhow::Result<()> {
    migrate(pool).await?;
    seed::reset(pool).await?;
    let summary = seed::seed(pool).await?;
    println!(
        "Database initialized. {} streets, {} drivers, {} residents, {} stops.",
        summary.streets, summary.drivers, summary.residents, summary.stops
    );
    Ok(())
}

pub async fn street_list(pool: &PgPool, json: bool) -> anyhow::Result<()> {
    let streets = StreetService::list(pool).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&streets)?);
    } else {
        for street in streets {
            println!("{}", street.name);
        }
    }
    Ok(())
}

pub async fn driver_list(pool: &PgPool, json: bool) -> anyhow::Result<()> {
    let drivers = AccountService::list(pool, Some(UserRole::Driver)).await?;
    if json {
        let profiles: Vec<UserProfile> = drivers.into_iter().map(UserProfile::from).collect();
        println!("{}", serde_json::to_string_pretty(&profiles)?);
    } else {
        for driver in drivers {
            println!("{}", driver);
        }
    }
    Ok(())
}

/// The street must already exist; the CLI never creates streets implicitly.
pub async fn driver_schedule(
    pool: &PgPool,
    driver_id: Uuid,
    street: &str,
    scheduled_date: &str,
) -> anyhow::Result<()> {
    let date = parse_scheduled_date(scheduled_date)?;
    let street = StreetService::get(pool, street)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Street '{}' not found.", street.trim())))?;

    StopService::schedule(pool, driver_id, &street.name, date).await?;
    println!("Successfully scheduled a stop to '{}'.", street.name);
    Ok(())
}

pub async fn driver_stops(pool: &PgPool, driver_id: Uuid) -> anyhow::Result<()> {
    AccountService::get_with_role(pool, driver_id, UserRole::Driver).await?;
    let stops = StopService::list_by_driver(pool, driver_id).await?;
    if stops.is_empty() {
        println!("No stops scheduled.");
    }
    for stop in stops {
        println!(
            "[Created {}]\t{}) {}",
            stop.created_at.format("%Y-%m-%dT%H:%M:%S"),
            stop.id,
            stop
        );
    }
    Ok(())
}

pub async fn driver_complete(pool: &PgPool, driver_id: Uuid, stop_id: Uuid) -> anyhow::Result<()> {
    let outcome = StopService::mark_arrival(pool, driver_id, stop_id).await?;
    println!(
        "Arrival recorded and residents notified. Cleared {} pending request(s) for '{}'.",
        outcome.requests_cleared, outcome.stop.street_name
    );
    Ok(())
}

pub async fn driver_update(
    pool: &PgPool,
    driver_id: Uuid,
    status: Option<&str>,
    location: Option<&str>,
) -> anyhow::Result<()> {
    let status = status.map(str::parse::<DriverStatus>).transpose()?;
    let driver = AccountService::update_driver_status(pool, driver_id, status, location).await?;
    println!("Successfully updated your status. {}", driver.status_summary());
    Ok(())
}

pub async fn driver_status(pool: &PgPool, driver_id: Uuid) -> anyhow::Result<()> {
    let driver = AccountService::get_with_role(pool, driver_id, UserRole::Driver).await?;
    println!("{}", driver.status_summary());
    Ok(())
}

/// Print a driver's or resident's inbox, newest first. Unread entries are starred.
pub async fn inbox(pool: &PgPool, user_id: Uuid, role: UserRole, filter: &str) -> anyhow::Result<()> {
    let user = AccountService::get_with_role(pool, user_id, role).await?;
    let query = InboxQuery {
        filter: InboxFilter::parse(filter, role)?,
        ..InboxQuery::default()
    };

    let items = NotificationService::inbox(pool, &user.viewer(), &query).await?;
    if items.is_empty() {
        println!("Inbox is empty.");
    }
    for item in items {
        let marker = if item.is_read() { " " } else { "*" };
        println!("{} {}", marker, item.notification);
    }
    Ok(())
}

pub async fn resident_request(pool: &PgPool, resident_id: Uuid) -> anyhow::Result<()> {
    let request = StopRequestService::create(pool, resident_id).await?;
    println!("Request was made for '{}'.", request.street_name);
    Ok(())
}

pub async fn auth_list(pool: &PgPool, role: Option<&str>) -> anyhow::Result<()> {
    let role = role.map(str::parse::<UserRole>).transpose()?;
    let users = AccountService::list(pool, role).await?;
    if users.is_empty() {
        println!("Users not found.");
    }
    for user in users {
        println!("{}", user);
    }
    Ok(())
}

pub async fn auth_register(pool: &PgPool, params: RegisterParams) -> anyhow::Result<()> {
    let user = AccountService::register(pool, &params).await?;
    println!("Registration successful. {}", user);
    Ok(())
}

pub async fn notifications_purge(pool: &PgPool) -> anyhow::Result<()> {
    let purged = NotificationService::purge_expired(pool).await?;
    println!("Purged {} expired notification(s).", purged);
    Ok(())
}
