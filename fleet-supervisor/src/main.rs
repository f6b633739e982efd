use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tokio::signal::unix::{SignalKind, signal};
use tracing::{info, warn};

use fleet_supervisor::Supervisor;

/// Supervising daemon for one fleet component
#[derive(Parser)]
#[command(name = "fleet-supervisor", about = "Supervise the programs of one fleet component")]
struct Args {
    /// Component directory holding config/supervisor.yaml
    #[arg(default_value = ".")]
    component_dir: PathBuf,

    /// Serve the control socket without starting the programs
    #[arg(long)]
    no_start: bool,

    /// Allow running as root (not recommended)
    #[arg(long)]
    allow_root: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    if fleet_unix::process::current_uid() == 0 {
        if !args.allow_root {
            eprintln!("Error: Running as root is not allowed.");
            eprintln!("Use --allow-root to override.");
            std::process::exit(1);
        }
        warn!("Running as root with --allow-root");
    }

    let component_dir = std::fs::canonicalize(&args.component_dir)
        .with_context(|| format!("Component directory {:?} not found", args.component_dir))?;
    let supervisor = Supervisor::load(&component_dir)?;

    info!("Starting supervisor for {}", component_dir.display());

    let pid_file = supervisor.pid_file_path();
    fleet_unix::PidFileStore::new().write(&pid_file, std::process::id())?;

    if !args.no_start {
        let started = supervisor.start_programs().await;
        info!("Started {} program(s)", started);
    }

    let server = supervisor.server();
    let shutdown_tx = server.shutdown_handle();
    let socket_path = supervisor.socket_path();

    // SIGTERM/SIGINT stop the programs before the supervisor exits
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    let state = supervisor.state();
    tokio::spawn(async move {
        tokio::select! {
            _ = sigterm.recv() => info!("Received SIGTERM"),
            _ = sigint.recv() => info!("Received SIGINT"),
        }
        if let Err(e) = fleet_supervisor::process::stop_all(state).await {
            warn!("Failed to stop all programs: {}", e);
        }
        let _ = shutdown_tx.send(()).await;
    });

    info!("Supervisor listening on {:?}", socket_path);
    server.run().await?;

    if let Err(e) = fleet_unix::PidFileStore::new().clear(&pid_file) {
        warn!("Failed to clear supervisor pid file: {}", e);
    }
    info!("Supervisor for {} exited", component_dir.display());

    Ok(())
}
