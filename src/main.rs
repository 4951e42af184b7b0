//! Process entry point: parses the CLI surface (§6), loads `AppConfig`,
//! wires the repositories/service/broker together, and dispatches to the
//! `api`, `worker`, or `seed` subcommand. Exit code 0 on clean shutdown,
//! 1 on configuration error — the same convention the teacher's
//! `arguments.rs`-driven binaries use, expressed here through
//! `clap::Parser` derive instead of hand-rolled flag scanning.

use clap::{Parser, Subcommand};
use pumpkinlog::broker::worker::EvaluationWorker;
use pumpkinlog::broker::{LapinEventPublisher, NullPublisher};
use pumpkinlog::config::AppConfig;
use pumpkinlog::context::CacheInvalidator;
use pumpkinlog::logger::{log, set_debug_enabled, LogTag};
use pumpkinlog::repository::{pool, Repositories};
use pumpkinlog::service::EvaluationService;
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "pumpkinlog", about = "Residency and tax-presence evaluation service")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level log lines.
    #[arg(long, global = true)]
    debug: bool,

    /// Enable a CPU profile for the lifetime of the process (no-op here;
    /// kept for CLI-surface parity with the original).
    #[arg(long, global = true)]
    profile: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the catalog/user-data HTTP API.
    Api {
        #[arg(long, default_value_t = 8080)]
        port: u16,
    },
    /// Consume presence events and recompute evaluations.
    Worker {
        #[arg(long, default_value_t = pumpkinlog::broker::PRESENCE_WORKER_QUEUE.to_string())]
        queue: String,
        #[arg(long, default_value_t = 4)]
        concurrency: usize,
    },
    /// Load a seed file of regions/rules/conditions.
    Seed {
        #[arg(long)]
        file: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    set_debug_enabled(cli.debug);

    if cli.profile {
        log(LogTag::System, "DEBUG", "profiling flag set (no-op in this build)");
    }

    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log(LogTag::System, "ERROR", &format!("{e}"));
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command) -> anyhow::Result<()> {
    match command {
        Command::Api { port } => run_api(port).await,
        Command::Worker { queue, concurrency } => run_worker(queue, concurrency).await,
        Command::Seed { file } => run_seed(file).await,
    }
}

#[cfg(feature = "web")]
async fn run_api(port: u16) -> anyhow::Result<()> {
    let config = AppConfig::load_with_broker(false)?;
    let pool = pool::connect(&config.database_dsn).await?;
    let repos = Repositories::new_postgres(pool);

    let connection = connect_broker(&config).await?;
    let publish_channel = connection.create_channel().await?;
    pumpkinlog::broker::declare_topology(&publish_channel).await?;
    let publisher = Arc::new(LapinEventPublisher::new(publish_channel.clone()));

    let service = Arc::new(EvaluationService::new(repos.clone(), publisher));
    let invalidator = Arc::new(CacheInvalidator::new(repos.clone()));

    let state = pumpkinlog::api::AppState {
        repos,
        service,
        invalidator,
        broker_channel: Some(publish_channel),
    };

    let app = pumpkinlog::api::router(state);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    log(LogTag::Api, "SUCCESS", &format!("listening on 0.0.0.0:{port}"));

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

#[cfg(not(feature = "web"))]
async fn run_api(_port: u16) -> anyhow::Result<()> {
    anyhow::bail!("binary built without the `web` feature")
}

async fn run_worker(queue: String, concurrency: usize) -> anyhow::Result<()> {
    let config = AppConfig::load_with_broker(false)?;
    let pool = pool::connect(&config.database_dsn).await?;
    let repos = Repositories::new_postgres(pool);

    let connection = connect_broker(&config).await?;
    let publisher = Arc::new(NullPublisher);
    let service = Arc::new(EvaluationService::new(repos, publisher));

    let worker = EvaluationWorker::new(&connection, queue, concurrency, service).await?;

    let (stop_tx, stop_rx) = tokio::sync::watch::channel(false);
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        let _ = stop_tx.send(true);
    });

    worker.run(stop_rx).await?;
    Ok(())
}

async fn run_seed(file: String) -> anyhow::Result<()> {
    let config = AppConfig::load(false)?;
    let pool = pool::connect(&config.database_dsn).await?;
    let repos = Repositories::new_postgres(pool);
    pumpkinlog::seed::run(&repos, &file).await?;
    Ok(())
}

async fn connect_broker(config: &AppConfig) -> anyhow::Result<lapin::Connection> {
    let url = config
        .rabbitmq_url
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("RABBITMQ_URL is required"))?;
    let connection =
        lapin::Connection::connect(url, lapin::ConnectionProperties::default()).await?;
    Ok(connection)
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    log(LogTag::System, "INFO", "shutdown signal received");
}
