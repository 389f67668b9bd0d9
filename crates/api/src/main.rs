//! Curbside API server binary entrypoint.

use std::time::Duration;

use sqlx::PgPool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use curbside_common::config::AppConfig;
use curbside_common::db::{create_pool, migrate};
use curbside_common::redis_pool::create_redis_pool;
use curbside_engine::notification::NotificationService;

use curbside_api::routes::create_router;
use curbside_api::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("curbside_api=debug,curbside_engine=debug,tower_http=debug")
        }))
        .init();

    tracing::info!("Starting Curbside API server...");

    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url, config.db_max_connections).await?;
    migrate(&pool).await?;
    tracing::info!("Database pool created and migrations applied");

    let redis = create_redis_pool(&config.redis_url).await?;
    tracing::info!("Redis connection established");

    let purge_task = (config.notification_purge_interval_secs > 0).then(|| {
        tokio::spawn(purge_expired_loop(
            pool.clone(),
            Duration::from_secs(config.notification_purge_interval_secs),
        ))
    });

    let addr = config.bind_addr;
    let state = AppState::new(pool, redis, config);

    let app = create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    tracing::info!("API server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tokio::select! {
        result = axum::serve(listener, app) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "Server exited with error");
            }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received Ctrl+C, shutting down...");
        }
    }

    if let Some(task) = purge_task {
        task.abort();
    }

    tracing::info!("Curbside API server stopped");
    Ok(())
}

/// Periodically delete expired notifications.
async fn purge_expired_loop(pool: PgPool, every: Duration) {
    let mut interval = tokio::time::interval(every);
    loop {
        interval.tick().await;
        if let Err(e) = NotificationService::purge_expired(&pool).await {
            tracing::warn!(error = %e, "Expired notification sweep failed");
        }
    }
}
