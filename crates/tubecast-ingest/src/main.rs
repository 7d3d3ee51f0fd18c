//! Tubecast Ingest - channel monitoring entry point
//!
//! Operational wrapper around the ingestion engine. Scheduling is an
//! external concern; whatever triggers a run (cron, queue consumer) shells
//! out to `tubecast-ingest run --user-id <id>`.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use tubecast_common::logging::{init_logging, LogConfig, LogLevel};
use tubecast_ingest::config::MonitorConfig;
use tubecast_ingest::monitor::ChannelMonitor;
use tubecast_ingest::store::postgres::PgStore;
use tubecast_ingest::youtube::SourceProvider;

#[derive(Parser, Debug)]
#[command(name = "tubecast-ingest")]
#[command(author, version, about = "Tubecast channel monitoring tool")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Parser, Debug)]
enum Command {
    /// Monitor a user's sources and enqueue generation jobs
    Run {
        /// User to monitor
        #[arg(short, long)]
        user_id: String,
    },

    /// Apply pending database migrations
    Migrate,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env before anything reads the environment.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let log_config = LogConfig::from_env()
        .unwrap_or_default()
        .with_file_prefix("tubecast-ingest");
    let log_config = if cli.verbose {
        log_config.with_level(LogLevel::Debug)
    } else {
        log_config
    };
    init_logging(&log_config)?;

    let database_url =
        std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let store = PgStore::connect(&database_url)
        .await
        .context("Failed to connect to the record store")?;

    match cli.command {
        Command::Run { user_id } => {
            let config = MonitorConfig::from_env();
            let provider =
                SourceProvider::from_config(&config).context("Failed to build video provider")?;

            let monitor = ChannelMonitor::new(Arc::new(store), Arc::new(provider), config);
            let jobs = monitor.run(&user_id).await?;

            info!(%user_id, jobs = jobs.len(), "monitoring run complete");
            for job in &jobs {
                info!(job_id = %job.id, source_id = ?job.source_id, "queued generation job");
            }
        },
        Command::Migrate => {
            store.migrate().await?;
            info!("migrations applied");
        },
    }

    Ok(())
}
