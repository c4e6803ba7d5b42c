use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tracing::{error, info};

use mrp_approval as app;
use app::scheduler::{JobKind, Scheduler};
use app::services::{MrpWorkflow, WorkflowSettings};

#[derive(Parser)]
#[command(name = "mrp-approval", about = "Manufacturing request approval workflow", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the scheduled sweeps until interrupted
    Serve,
    /// Run a single sweep and print its report
    RunJob {
        #[arg(value_enum)]
        kind: JobKind,
    },
    /// Apply pending database migrations
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = app::config::load_config().context("failed to load configuration")?;
    app::logging::init_tracing(cfg.log_level(), cfg.log_json);

    let db_pool = app::db::establish_connection_from_app_config(&cfg).await?;
    if cfg.auto_migrate || matches!(cli.command, Commands::Migrate) {
        app::db::run_migrations(&db_pool).await.map_err(|e| {
            error!("Failed running migrations: {}", e);
            e
        })?;
    }
    if matches!(cli.command, Commands::Migrate) {
        info!("Migrations applied");
        return Ok(());
    }

    let (event_tx, event_rx) = mpsc::channel(cfg.event_channel_capacity);
    let event_sender = app::events::EventSender::new(event_tx);
    tokio::spawn(app::events::process_events(event_rx));

    let settings = WorkflowSettings {
        auto_submit_delay: cfg.jobs.auto_submit_delay(),
        ..Default::default()
    };
    let workflow = MrpWorkflow::with_database(Arc::new(db_pool))
        .with_event_sender(event_sender)
        .with_settings(settings);
    let scheduler = Scheduler::new(workflow, cfg.jobs.clone());

    match cli.command {
        Commands::Serve if cfg.jobs.enabled => scheduler.run().await,
        Commands::Serve => info!("Scheduled jobs are disabled; nothing to do"),
        Commands::RunJob { kind } => {
            let report = scheduler.run_job(kind).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Migrate => {}
    }
    Ok(())
}
