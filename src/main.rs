use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use daysweep::config::Config;
use daysweep::jobs::{DailyResetJob, DailyScheduler};
use daysweep::notifications::SmtpMailer;
use daysweep::AppState;

#[derive(Parser, Debug)]
#[command(name = "daysweep")]
#[command(author, version, about = "A self-hosted todo service with a nightly summary-and-reset cycle", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "daysweep.toml")]
    config: PathBuf,

    /// Override log level
    #[arg(short, long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(&cli.config)?;

    // Initialize logging
    let log_level = cli
        .log_level
        .as_ref()
        .unwrap_or(&config.logging.level)
        .clone();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Daysweep v{}", env!("CARGO_PKG_VERSION"));

    // Ensure data directory exists
    std::fs::create_dir_all(&config.server.data_dir)?;

    // Initialize database
    let db = daysweep::db::init(&config.server.data_dir).await?;

    // Ensure default admin user exists
    daysweep::api::auth::ensure_admin_user(&db, &config.auth).await?;

    // Resolve the app time zone (invalid names fall back to UTC with a warning)
    let timezone = config.timezone();

    // Create app state
    let state = Arc::new(AppState::new(config.clone(), db.clone()));

    // Wire up the daily summarize-then-purge job
    let transport = Arc::new(SmtpMailer::new(config.mail.clone()));
    let job = Arc::new(DailyResetJob::new(db.clone(), config.clone(), transport));
    let mut scheduler = DailyScheduler::new(job, timezone);
    if config.daily_reset.enabled {
        scheduler.start();
    } else {
        tracing::info!("Daily reset disabled; scheduler not started");
    }

    // Create API router
    let app = daysweep::api::create_router(state);

    // Start API server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("API server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.shutdown();

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
