use crate::api::api_error::ApiError;
use crate::config::{AdminSeed, DEFAULT_ADMIN_PASSWORD};
use crate::db::user::admin_exists;
use crate::models::user::Role;
use crate::services::accounts::create_account;
use sqlx::sqlite::SqlitePool;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{self};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::{fmt, prelude::*};

/// Console + daily JSON file logging. Keep the guard alive for the life of
/// the process or buffered file lines are lost.
pub fn init_logging(log_dir: &str) -> WorkerGuard {
    let file_appender = rolling::daily(log_dir, "rateshelf.log");
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_filter = EnvFilter::new("info");

    let stdout_layer = fmt::layer()
        .with_target(false)
        .with_file(true)
        .with_thread_ids(true)
        .with_timer(UtcTime::rfc_3339())
        .with_line_number(true)
        .compact()
        .with_filter(console_filter);

    let file_layer = fmt::layer()
        .json()
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_thread_ids(true)
        .with_writer(non_blocking_file)
        .with_filter(file_filter);

    tracing_subscriber::registry()
        .with(stdout_layer)
        .with(file_layer)
        .init();

    guard
}

pub async fn ensure_admin_user(db: &SqlitePool, seed: &AdminSeed) -> Result<(), ApiError> {
    let admin_exists: i64 = admin_exists(db).await?;

    if admin_exists == 0 {
        create_account(
            db,
            "Administrator",
            &seed.email,
            &seed.username.to_lowercase(),
            &seed.password,
            Role::Admin,
        )
        .await?;

        info!("Admin user created: username='{}'", seed.username);
        if seed.password == DEFAULT_ADMIN_PASSWORD {
            tracing::warn!("Admin account uses the default password; set ADMIN_PASSWORD");
        }
    }

    Ok(())
}

pub async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::warn!("shutdown signal received");
}
