//! `curbside` operator CLI. Works directly against the database.

mod commands;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use curbside_common::db::create_pool;
use curbside_common::types::UserRole;
use curbside_engine::account::RegisterParams;

#[derive(Parser, Debug)]
#[command(name = "curbside", version, about = "Curbside waste-collection operations CLI")]
struct Cli {
    /// PostgreSQL connection string
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    database_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Apply migrations, wipe all data and load the demo data set
    Init,
    /// Street commands
    Street {
        #[command(subcommand)]
        command: StreetCommand,
    },
    /// Driver commands
    Driver {
        #[command(subcommand)]
        command: DriverCommand,
    },
    /// Resident commands
    Resident {
        #[command(subcommand)]
        command: ResidentCommand,
    },
    /// Account commands
    Auth {
        #[command(subcommand)]
        command: AuthCommand,
    },
    /// Notification maintenance
    Notifications {
        #[command(subcommand)]
        command: NotificationsCommand,
    },
}

#[derive(Subcommand, Debug)]
enum StreetCommand {
    /// List streets
    List {
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand, Debug)]
enum DriverCommand {
    /// List drivers
    List {
        #[arg(long)]
        json: bool,
    },
    /// Schedule a stop for a street
    Schedule {
        driver_id: Uuid,
        street: String,
        /// YYYY-MM-DD
        scheduled_date: String,
    },
    /// View a driver's stops
    Stops { driver_id: Uuid },
    /// Record arrival at a stop and notify the street's residents
    Complete { driver_id: Uuid, stop_id: Uuid },
    /// Update status and/or location
    Update {
        driver_id: Uuid,
        /// One of: inactive, en_route, delivering
        #[arg(long)]
        status: Option<String>,
        /// Free-text location
        #[arg(long = "where")]
        location: Option<String>,
    },
    /// Show a driver's status and location
    Status { driver_id: Uuid },
    /// View a driver's inbox
    Inbox {
        driver_id: Uuid,
        /// all, requested or confirmed
        #[arg(long, default_value = "all")]
        filter: String,
    },
}

#[derive(Subcommand, Debug)]
enum ResidentCommand {
    /// Request a stop for the resident's street
    Request { resident_id: Uuid },
    /// View a resident's inbox
    Inbox {
        resident_id: Uuid,
        /// all, requested, confirmed or arrived
        #[arg(long, default_value = "all")]
        filter: String,
    },
}

#[derive(Subcommand, Debug)]
enum AuthCommand {
    /// List users
    List {
        /// driver or resident
        #[arg(long)]
        role: Option<String>,
    },
    /// Create an account
    Register {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        firstname: String,
        #[arg(long)]
        lastname: String,
        #[arg(long, default_value = "resident")]
        role: String,
        /// Required for resident accounts
        #[arg(long)]
        street: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum NotificationsCommand {
    /// Delete expired notifications
    Purge,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("curbside_cli=info,curbside_engine=warn")),
        )
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("[ERROR]: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    tracing::debug!(command = ?cli.command, "Running command");
    let pool = create_pool(&cli.database_url, 5).await?;

    match cli.command {
        Commands::Init => commands::init(&pool).await,
        Commands::Street {
            command: StreetCommand::List { json },
        } => commands::street_list(&pool, json).await,
        Commands::Driver { command } => match command {
            DriverCommand::List { json } => commands::driver_list(&pool, json).await,
            DriverCommand::Schedule {
                driver_id,
                street,
                scheduled_date,
            } => commands::driver_schedule(&pool, driver_id, &street, &scheduled_date).await,
            DriverCommand::Stops { driver_id } => commands::driver_stops(&pool, driver_id).await,
            DriverCommand::Complete { driver_id, stop_id } => {
                commands::driver_complete(&pool, driver_id, stop_id).await
            }
            DriverCommand::Update {
                driver_id,
                status,
                location,
            } => {
                commands::driver_update(&pool, driver_id, status.as_deref(), location.as_deref())
                    .await
            }
            DriverCommand::Status { driver_id } => commands::driver_status(&pool, driver_id).await,
            DriverCommand::Inbox { driver_id, filter } => {
                commands::inbox(&pool, driver_id, UserRole::Driver, &filter).await
            }
        },
        Commands::Resident { command } => match command {
            ResidentCommand::Request { resident_id } => {
                commands::resident_request(&pool, resident_id).await
            }
            ResidentCommand::Inbox {
                resident_id,
                filter,
            } => {
                commands::inbox(&pool, resident_id, UserRole::Resident, &filter).await
            }
        },
        Commands::Auth { command } => match command {
            AuthCommand::List { role } => commands::auth_list(&pool, role.as_deref()).await,
            AuthCommand::Register {
                username,
                password,
                firstname,
                lastname,
                role,
                street,
            } => {
                commands::auth_register(
                    &pool,
                    RegisterParams {
                        username,
                        password,
                        first_name: firstname,
                        last_name: lastname,
                        role,
                        street,
                    },
                )
                .await
            }
        },
        Commands::Notifications {
            command: NotificationsCommand::Purge,
        } => commands::notifications_purge(&pool).await,
    }
}
