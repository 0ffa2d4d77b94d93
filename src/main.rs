//! Bananal ERP - API server entry point.
//!
//! # Architecture
//!
//! - **Web Framework**: Axum (async HTTP server)
//! - **Database**: PostgreSQL with sqlx (async queries)
//! - **Authentication**: operator bearer tokens with SHA-256 hashing
//! - **Format**: JSON requests/responses
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment variables
//! 2. Create database connection pool
//! 3. Run database migrations
//! 4. Start the certificate monitor
//! 5. Build the HTTP router and serve on the configured port

use bananal_erp::{app, config, db, services::certificado_service};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // RUST_LOG controls verbosity, "info" by default
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = config::Config::from_env()?;
    tracing::info!(port = config.server_port, "configuration loaded");

    let pool = db::create_pool(&config.database_url, config.database_max_connections).await?;
    tracing::info!(max_connections = config.database_max_connections, "database pool created");

    db::run_migrations(&pool).await?;
    tracing::info!("database migrations complete");

    if config.certificate_check_interval_secs > 0 {
        tokio::spawn(certificado_service::executar_monitor(
            pool.clone(),
            config.certificate_check_interval_secs,
            config.certificate_alert_days,
        ));
    } else {
        tracing::info!("certificate monitor disabled");
    }

    let addr = format!("0.0.0.0:{}", config.server_port);
    let state = app::AppState::new(pool, config)?;
    let router = app::build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("server listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("shutdown signal received");
        })
        .await?;

    Ok(())
}
