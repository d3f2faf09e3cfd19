use std::sync::Arc;

use anyhow::Context;
use dotenv::dotenv;
use rateshelf::{
    AppState, app,
    config::Config,
    db,
    services::startup::{ensure_admin_user, init_logging, shutdown_signal},
};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let config = Arc::new(Config::from_env()?);
    let _log_guard = init_logging(&config.log_dir);

    let db_pool = db::init_db_pool(&config.database_url)
        .await
        .context("Err connecting to database")?;

    ensure_admin_user(&db_pool, &config.admin).await?;

    let state = AppState::new(db_pool, Arc::clone(&config)).await?;

    let listener = TcpListener::bind(format!("{}:{}", &config.host, &config.port)).await?;
    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
