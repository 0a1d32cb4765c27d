//! Turnkeeper API server entry point.

use sqlx::postgres::PgPoolOptions;
use turnkeeper_api::config::AppConfig;
use turnkeeper_api::error::AppError;
use turnkeeper_api::routes;
use turnkeeper_api::state::AppState;
use turnkeeper_api::telemetry;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let otlp_endpoint = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT").ok();
    let _telemetry = telemetry::init("turnkeeper-api", otlp_endpoint.as_deref())?;

    tracing::info!("Starting Turnkeeper API server");

    let config = AppConfig::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.database_url)
        .await?;
    turnkeeper_state_store::MIGRATOR.run(&pool).await?;

    let app = routes::app(AppState::from_pool(&pool, config.prompt_ttl));

    let addr = config.bind_addr()?;
    tracing::info!(%addr, prompt_ttl_secs = config.prompt_ttl.num_seconds(), "Listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
    }
}
