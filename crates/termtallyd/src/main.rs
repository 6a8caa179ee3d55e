//! termtallyd - The termtally background service
//!
//! This is the main entry point for the termtallyd service.
//! It wires together all the components:
//! - Configuration loading
//! - Logging (stderr and a daily rolling file)
//! - Store initialization
//! - Command-based session reader
//! - Poll loop scheduler

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use termtally_config::{MonitorConfig, load_config};
use termtally_core::{Scheduler, ShutdownReport};
use termtally_host_api::SessionReader;
use termtally_host_cmd::CommandReader;
use termtally_store::{AuditEvent, AuditEventType, SqliteStore, Store};
use termtally_util::{
    DATABASE_FILENAME, default_config_path, format_datetime_full, is_mock_time_active,
};
use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const LOG_FILE_NAME: &str = "termtallyd.log";

/// termtallyd - Per-user terminal session time tally
#[derive(Parser, Debug)]
#[command(name = "termtallyd")]
#[command(about = "Polls remote hosts for terminal sessions and tallies per-user connected time", long_about = None)]
struct Args {
    /// Configuration file path (default: ~/.config/termtally/config.toml)
    #[arg(short, long, env = "TERMTALLY_CONFIG", default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Data directory override (or set TERMTALLY_DATA_DIR env var)
    #[arg(short, long, env = "TERMTALLY_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Run a single poll cycle, commit, and exit
    #[arg(long)]
    once: bool,
}

/// Main service state
struct Service {
    config: MonitorConfig,
    store: Arc<dyn Store>,
    reader: Arc<dyn SessionReader>,
}

impl Service {
    fn new(args: &Args, config: MonitorConfig) -> Result<Self> {
        let data_dir = args
            .data_dir
            .clone()
            .unwrap_or_else(|| config.service.data_dir.clone());
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory {:?}", data_dir))?;

        let db_path = data_dir.join(DATABASE_FILENAME);
        let store: Arc<dyn Store> = Arc::new(
            SqliteStore::open_with_timeout(&db_path, config.service.store_busy_timeout)
                .with_context(|| format!("Failed to open store at {:?}", db_path))?,
        );

        if !store.is_healthy() {
            anyhow::bail!("Store at {:?} is not usable", db_path);
        }
        info!(db_path = %db_path.display(), "Store initialized");

        // Log service start
        store
            .append_audit(AuditEvent::new(AuditEventType::ServiceStarted))
            .context("Failed to write to store")?;
        store
            .append_audit(AuditEvent::new(AuditEventType::ConfigLoaded {
                host_count: config.hosts.len(),
            }))
            .context("Failed to write to store")?;

        let reader: Arc<dyn SessionReader> = Arc::new(CommandReader::new(config.reader.clone()));

        Ok(Self {
            config,
            store,
            reader,
        })
    }

    async fn run(self, once: bool) -> Result<()> {
        let mut scheduler = Scheduler::new(&self.config, self.store.clone(), self.reader.clone());

        let report = if once {
            let (_tx, rx) = watch::channel(false);
            scheduler.run_cycle(&rx).await;
            scheduler.shutdown()
        } else {
            let (tx, rx) = watch::channel(false);
            Self::watch_signals(tx)?;
            info!("Service running");
            scheduler.run(rx).await
        };

        Self::log_shutdown(&report);

        // Log shutdown
        if let Err(e) = self
            .store
            .append_audit(AuditEvent::new(AuditEventType::ServiceStopped))
        {
            warn!(error = %e, "Failed to log service shutdown");
        }

        info!("Shutdown complete");
        Ok(())
    }

    /// Flip the shutdown flag on SIGTERM, SIGINT or SIGHUP
    fn watch_signals(tx: watch::Sender<bool>) -> Result<()> {
        let mut sigterm =
            signal(SignalKind::terminate()).context("Failed to create SIGTERM handler")?;
        let mut sigint =
            signal(SignalKind::interrupt()).context("Failed to create SIGINT handler")?;
        let mut sighup =
            signal(SignalKind::hangup()).context("Failed to create SIGHUP handler")?;

        tokio::spawn(async move {
            tokio::select! {
                _ = sigterm.recv() => info!("Received SIGTERM, shutting down gracefully"),
                _ = sigint.recv() => info!("Received SIGINT, shutting down gracefully"),
                _ = sighup.recv() => info!("Received SIGHUP, shutting down gracefully"),
            }
            let _ = tx.send(true);
        });

        Ok(())
    }

    fn log_shutdown(report: &ShutdownReport) {
        info!(
            finalized = report.finalized,
            committed = report.committed,
            pending = report.pending,
            "Shutting down termtallyd"
        );
    }
}

/// Log to stderr and to a daily rolling file in `log_dir`
fn init_logging(log_dir: &Path, log_level: &str) -> Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory {:?}", log_dir))?;

    let file_appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_NAME);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
        .init();

    Ok(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = load_config(&args.config)
        .with_context(|| format!("Failed to load config from {:?}", args.config))?;

    let _log_guard = init_logging(&config.service.log_dir, &args.log_level)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        config_path = %args.config.display(),
        host_count = config.hosts.len(),
        interval = ?config.service.poll_interval,
        "termtallyd starting"
    );

    if is_mock_time_active() {
        warn!(now = %format_datetime_full(&termtally_util::now()), "Mock time is active");
    }

    let service = Service::new(&args, config)?;
    service.run(args.once).await
}
