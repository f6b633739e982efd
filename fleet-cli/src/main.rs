mod commands;

use std::path::Path;

use chrono::{DateTime, Utc};
use clap::Parser;
use tabled::settings::Style;
use tabled::{Table, Tabled};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::commands::Commands;
use fleet_cli::errors::{CliError, Result};
use fleet_cli::exit_codes::ExitCodes;
use fleet_cli::{
    ComponentInstance, ComponentStatusProbe, PreStopHooks, SignalDispatcher, SignalKind,
    StopContext, StopController, SupervisorClient, SupervisorCommand,
};
use fleet_protocol::admin::{AdminRpcClient, ClusterRef};
use fleet_protocol::protocol::ProgramInfo;

/// Fleet - lifecycle control for fleet components
#[derive(Parser, Debug)]
#[command(name = "fleet")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let codes = ExitCodes::default();
    let code = match run(&codes).await {
        Ok(code) => code,
        Err(e) => {
            report(&e);
            e.exit_code(&codes)
        }
    };
    if code != codes.success {
        std::process::exit(code);
    }
}

fn report(e: &CliError) {
    if !e.is_reported() {
        eprintln!("Error: {}", e);
    }
}

/// Run the command and return the process exit code.
async fn run(codes: &ExitCodes) -> Result<i32> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn,fleet=info,fleet_cli=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Stop { dir, kind, quiet } => {
            let component = ComponentInstance::detect(&dir, kind)?;
            let ctx = StopContext::new(component)
                .quiet(quiet)
                .with_exit_codes(*codes);
            Ok(handle_stop(&ctx, SupervisorClient::new()).await)
        }

        Commands::Status { dir } => {
            handle_status(&dir).await?;
            Ok(codes.success)
        }

        Commands::Signal {
            pid_file,
            signal,
            name,
        } => handle_signal(&pid_file, signal, &name, codes),

        Commands::Admin {
            address,
            command,
            cluster_id,
            cluster_name,
            document,
            timeout,
        } => {
            let document = serde_json::from_str(&document).map_err(CliError::Document)?;
            let cluster = ClusterRef {
                id: cluster_id,
                name: cluster_name.unwrap_or_else(|| address.clone()),
                address,
            };
            let response = AdminRpcClient::new(timeout)
                .invoke(&cluster, &command, document)
                .await?;
            let pretty =
                serde_json::to_string_pretty(&response.document).map_err(CliError::Document)?;
            println!("{pretty}");
            Ok(codes.success)
        }
    }
}

/// Stop one component; failures map through the context's exit codes.
async fn handle_stop<S>(ctx: &StopContext, supervisor: S) -> i32
where
    S: ComponentStatusProbe + SupervisorCommand,
{
    let controller = StopController::new(supervisor, PreStopHooks::with_defaults());
    match controller.stop(ctx).await {
        Ok(outcome) => {
            debug!("Stop of {} finished: {:?}", ctx.component.directory.display(), outcome);
            ctx.exit_codes.success
        }
        Err(e) => {
            let code = e.exit_code(&ctx.exit_codes);
            report(&CliError::Stop(e));
            code
        }
    }
}

/// Signal the process in `pid_file`. A process that is already gone has
/// been warned about and is not a failure.
fn handle_signal(
    pid_file: &Path,
    signal: SignalKind,
    name: &str,
    codes: &ExitCodes,
) -> Result<i32> {
    match SignalDispatcher::new().signal_pid_file(name, pid_file, signal) {
        Ok(()) => info!("Sent {:?} to the {} in {}", signal, name, pid_file.display()),
        Err(e) if e.is_recoverable() => {}
        Err(e) => return Err(e.into()),
    }
    Ok(codes.success)
}

async fn handle_status(dir: &Path) -> Result<()> {
    let programs = SupervisorClient::new()
        .programs(dir)
        .await
        .map_err(CliError::Stop)?;

    let Some(info) = programs else {
        println!("No supervisor running in {}", dir.display());
        return Ok(());
    };

    if info.programs.is_empty() {
        println!("No programs configured in {}", info.component_dir.display());
        return Ok(());
    }

    print_program_table(&info.programs, Utc::now());
    Ok(())
}

#[derive(Tabled)]
struct ProgramRow {
    #[tabled(rename = "NAME")]
    name: String,
    #[tabled(rename = "PORT")]
    port: u16,
    #[tabled(rename = "PID")]
    pid: String,
    #[tabled(rename = "STATUS")]
    status: String,
    #[tabled(rename = "UPTIME")]
    uptime: String,
}

fn format_program_row(info: &ProgramInfo, now: DateTime<Utc>) -> ProgramRow {
    let status = match (info.pid, info.exit_code) {
        (Some(_), _) => "running".to_string(),
        (None, Some(code)) => format!("exited ({})", code),
        (None, None) => "stopped".to_string(),
    };
    let uptime = match (info.pid, info.started_at) {
        (Some(_), Some(started_at)) => format_uptime(started_at, now),
        _ => "-".to_string(),
    };
    ProgramRow {
        name: info.name.clone(),
        port: info.port,
        pid: info.pid.map(|p| p.to_string()).unwrap_or_else(|| "-".to_string()),
        status,
        uptime,
    }
}

fn print_program_table(programs: &[ProgramInfo], now: DateTime<Utc>) {
    let rows: Vec<ProgramRow> = programs.iter().map(|p| format_program_row(p, now)).collect();
    let table = Table::new(rows).with(Style::blank()).to_string();
    println!("{table}");
}

fn format_uptime(started_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = now.signed_duration_since(started_at).num_seconds().max(0);
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m", secs / 60)
    } else if secs < 86400 {
        format!("{}h", secs / 3600)
    } else {
        format!("{}d", secs / 86400)
    }
}

#[cfg(test)]
mod tests;
