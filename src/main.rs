use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use journal_backend::{
    admin_init,
    config::{Config, LoggingConfig, StoreBackend},
    middleware::cleanup_task,
    migrate, server,
    store::{MemoryStore, PgStore, Store},
};
use sqlx::postgres::PgPoolOptions;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Install the global subscriber; the guard must outlive the program when logging to a file.
fn init_tracing(logging: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("journal_backend={},tower_http=info", logging.level)));

    let (writer, guard) = match &logging.file {
        Some(path) => {
            let path = std::path::Path::new(path);
            let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
            let name = path.file_name().map(|n| n.to_os_string()).unwrap_or_else(|| "journal-backend.log".into());
            let appender = tracing_appender::rolling::daily(dir.unwrap_or_else(|| std::path::Path::new(".")), name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (tracing_subscriber::fmt::writer::BoxMakeWriter::new(writer), Some(guard))
        }
        None => (tracing_subscriber::fmt::writer::BoxMakeWriter::new(std::io::stdout), None),
    };

    let fmt_layer = if logging.format == "json" {
        tracing_subscriber::fmt::layer().json().with_writer(writer).boxed()
    } else {
        tracing_subscriber::fmt::layer().compact().with_writer(writer).boxed()
    };

    tracing_subscriber::registry().with(filter).with(fmt_layer).init();
    guard
}

async fn open_store(config: &Config) -> anyhow::Result<Arc<dyn Store>> {
    match config.database.backend {
        StoreBackend::Memory => {
            info!("Using in-memory store; data is lost on shutdown");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreBackend::Postgres => {
            let url = config
                .database
                .connection_url()
                .context("Invalid database connection parameters")?;

            let pool = PgPoolOptions::new()
                .max_connections(config.database.max_connections)
                .min_connections(config.database.min_connections)
                .acquire_timeout(Duration::from_secs(config.database.connect_timeout))
                .connect(&url)
                .await
                .map_err(|e| {
                    error!("Failed to connect to database: {}", e);
                    e
                })
                .context("Database connection failed")?;

            info!("Database connection established");

            migrate::run_migrations(&pool)
                .await
                .context("Database migrations failed")?;

            Ok(Arc::new(PgStore::new(pool)))
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;
    let _log_guard = init_tracing(&config.logging);

    info!("Starting journal backend...");

    let store = open_store(&config).await?;

    admin_init::ensure_admin_user(store.as_ref(), &config)
        .await
        .context("Admin bootstrap failed")?;

    let state = server::AppState::new(config, store).context("Failed to build application state")?;

    if state.config.features.rate_limiting {
        tokio::spawn(cleanup_task(state.rate_limiter.clone()));
    }

    if let Err(e) = server::start_server(state).await {
        error!("Server error: {}", e);
        return Err(e.into());
    }

    info!("Server shutdown complete");
    Ok(())
}
