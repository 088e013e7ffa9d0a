//! Entry point for the scheduler's services and smoke-test producers.
//! Grounded on `rustpress-cli/src/main.rs`'s init/parse/dispatch shape and
//! `rustpress-server/src/main.rs`'s fatal-error-exits-nonzero pattern.

mod config;
mod producer;
mod shutdown;

use clap::{Parser, Subcommand};
use config::Config;
use scheduler_broker::Topology;
use shutdown::{listen_for_shutdown_signals, ShutdownController};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "scheduler-cli", author, version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the command ingest service until shutdown.
    Ingest,
    /// Run the due-dispatch service until shutdown.
    Dispatch,
    /// Apply pending schema migrations and exit.
    Migrate,
    /// One-shot database + broker connectivity check.
    Health,
    /// Publish test commands/events directly, bypassing the engine.
    Producer {
        #[command(subcommand)]
        command: ProducerCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ProducerCommand {
    /// Publish one ScheduleRequest command.
    Request {
        #[arg(long)]
        job_type: String,
        #[arg(long, default_value = "{}")]
        payload: String,
        #[arg(long)]
        at: Option<chrono::DateTime<chrono::Utc>>,
        #[arg(long)]
        rrule: Option<String>,
        #[arg(long)]
        delay: Option<i64>,
    },
    /// Publish one ScheduleCancel command.
    Cancel {
        #[arg(long)]
        id: Uuid,
    },
    /// Publish N synthetic ScheduleDue events directly onto the event
    /// exchange, for smoke-testing downstream consumers.
    Due {
        #[arg(long)]
        job_type: String,
        #[arg(long, default_value = "{}")]
        payload: String,
        #[arg(long, default_value_t = 1)]
        count: u32,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("scheduler=info,sqlx=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!(error = %e, "fatal error");
        return Err(e);
    }
    Ok(())
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Ingest => run_ingest().await,
        Command::Dispatch => run_dispatch().await,
        Command::Migrate => run_migrate().await,
        Command::Health => run_health().await,
        Command::Producer { command } => producer::run(command).await,
    }
}

async fn pg_pool(config: &Config) -> anyhow::Result<sqlx::PgPool> {
    PgPoolOptions::new()
        .min_connections(config.db_pool_min)
        .max_connections(config.db_pool_max)
        .connect(&config.pg_dsn)
        .await
        .map_err(Into::into)
}

async fn run_ingest() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    let pool = pg_pool(&config).await?;
    let repo: Arc<dyn scheduler_database::JobRepository> =
        Arc::new(scheduler_database::PgJobRepository::new(pool));
    let clock: Arc<dyn scheduler_core::Clock> = Arc::new(scheduler_core::SystemClock);

    let connection = scheduler_broker::connect(&config.rabbit_url).await?;
    let channel = connection.create_channel().await?;
    let topology = Topology::default();
    scheduler_broker::declare_topology(&channel, &topology).await?;

    let controller = ShutdownController::new(config.shutdown_timeout);
    tokio::spawn(listen_for_shutdown_signals(controller.clone()));

    scheduler_ingest::run(
        &channel,
        &topology.inbox_queue,
        config.ingest_prefetch,
        repo,
        clock,
        controller.subscribe(),
        controller.timeout(),
    )
    .await?;

    Ok(())
}

async fn run_dispatch() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    let pool = pg_pool(&config).await?;
    let repo: Arc<dyn scheduler_database::JobRepository> =
        Arc::new(scheduler_database::PgJobRepository::new(pool));
    let clock: Arc<dyn scheduler_core::Clock> = Arc::new(scheduler_core::SystemClock);

    let connection = scheduler_broker::connect(&config.rabbit_url).await?;
    let channel = connection.create_channel().await?;
    let topology = Topology::default();
    scheduler_broker::declare_topology(&channel, &topology).await?;

    let publish_channel = connection.create_channel().await?;
    let publisher = Arc::new(
        scheduler_broker::JsonPublisher::new(publish_channel, topology.event_exchange.clone())
            .await?,
    );

    let controller = ShutdownController::new(config.shutdown_timeout);
    tokio::spawn(listen_for_shutdown_signals(controller.clone()));

    scheduler_dispatch::run(
        repo,
        publisher,
        clock,
        scheduler_dispatch::DispatchConfig {
            lock_batch: config.lock_batch,
            tick_interval: config.tick_interval,
        },
        controller.subscribe(),
        controller.timeout(),
    )
    .await?;

    Ok(())
}

async fn run_migrate() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    let pool = pg_pool(&config).await?;
    let migrator = scheduler_database::Migrator::new();
    let applied = migrator.run(&pool).await?;
    tracing::info!(count = applied.len(), "migration run complete");
    Ok(())
}

async fn run_health() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    let pool = pg_pool(&config).await?;
    let report = scheduler_health::check(&pool, &config.rabbit_url).await;
    println!("{}", serde_json::to_string_pretty(&report)?);

    if !report.is_healthy() {
        std::process::exit(1);
    }
    Ok(())
}
