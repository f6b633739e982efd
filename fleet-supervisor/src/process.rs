use chrono::Utc;
use nix::sys::signal::Signal;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::{Child, Command};
use tracing::{debug, error, info, warn};

use fleet_unix::process::detach_session;
use fleet_unix::{Delivery, PidFileError, PidFileStore, send_signal};

use crate::config::ProgramConfig;
use crate::errors::{Result, SupervisorError};
use crate::state::{ProcessHandle, ProgramStatus, SharedState};

/// Resolve the executable: relative paths with a separator are taken
/// relative to the component directory, bare names go through `PATH`.
fn resolve_program(program: &str, component_dir: &Path) -> PathBuf {
    let path = Path::new(program);
    if path.is_relative() && program.contains('/') {
        component_dir.join(path)
    } else {
        path.to_path_buf()
    }
}

fn output_stdio(config: &ProgramConfig, component_dir: &Path) -> Result<(Stdio, Stdio)> {
    let Some(path) = config.log_file_path(component_dir) else {
        return Ok((Stdio::null(), Stdio::null()));
    };
    let open = || {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| SupervisorError::LogFile {
                path: path.clone(),
                source,
            })
    };
    let stdout = open()?;
    let stderr = stdout.try_clone().map_err(|source| SupervisorError::LogFile {
        path: path.clone(),
        source,
    })?;
    Ok((Stdio::from(stdout), Stdio::from(stderr)))
}

/// Spawn the program called `name` and start monitoring it.
/// Returns the new pid.
pub async fn spawn_program(state: SharedState, name: &str) -> Result<u32> {
    let (config, component_dir) = {
        let state = state.read();
        let program = state
            .programs
            .get(name)
            .ok_or_else(|| SupervisorError::ProgramNotFound(name.to_string()))?;
        if program.status.is_live() {
            return Err(SupervisorError::AlreadyRunning(name.to_string()));
        }
        (program.config.clone(), state.component_dir.clone())
    };

    // Validated configs never have an empty command
    let Some((program, args)) = config.command.split_first() else {
        return Err(SupervisorError::Config(format!(
            "program '{}' has an empty command",
            name
        )));
    };

    info!("Starting program {}: {} {:?}", name, program, args);

    let (stdout, stderr) = output_stdio(&config, &component_dir)?;
    let mut cmd = Command::new(resolve_program(program, &component_dir));
    cmd.args(args)
        .current_dir(&component_dir)
        .stdin(Stdio::null())
        .stdout(stdout)
        .stderr(stderr);
    // SAFETY: detach_session only calls setsid(2), which is async-signal-safe
    unsafe {
        cmd.pre_exec(detach_session);
    }

    let mut child = cmd.spawn().map_err(|source| SupervisorError::ProcessSpawn {
        program: name.to_string(),
        source,
    })?;
    let pid = child.id().ok_or_else(|| SupervisorError::ProcessSpawn {
        program: name.to_string(),
        source: std::io::Error::other("process exited before its pid was read"),
    })?;
    debug!("Program {} spawned with PID {}", name, pid);

    // A child whose pid cannot be recorded is killed, never left untracked
    let pid_file = config.pid_file_path(&component_dir);
    if let Some(path) = &pid_file
        && let Err(e) = PidFileStore::new().write(path, pid)
    {
        error!("Failed to record PID {} of program {}, killing it", pid, name);
        if let Err(kill_err) = child.kill().await {
            warn!("Failed to kill program {}: {}", name, kill_err);
        }
        return Err(e.into());
    }

    let mut guard = state.write();
    let monitor = tokio::spawn(monitor_process(
        state.clone(),
        name.to_string(),
        child,
        pid_file,
    ));
    if let Some(program) = guard.programs.get_mut(name) {
        program.status = ProgramStatus::Running;
        program.pid = Some(pid);
        program.started_at = Some(Utc::now());
        program.exit_code = None;
    }
    guard
        .processes
        .insert(name.to_string(), ProcessHandle { pid, monitor });

    Ok(pid)
}

/// Reap the child, record how it ended and clear its pid file.
async fn monitor_process(
    state: SharedState,
    name: String,
    mut child: Child,
    pid_file: Option<PathBuf>,
) {
    let exit_code = match child.wait().await {
        Ok(status) => status.code(),
        Err(e) => {
            error!("Error waiting for program {}: {}", name, e);
            None
        }
    };

    if let Some(path) = &pid_file {
        match PidFileStore::new().clear(path) {
            Ok(()) | Err(PidFileError::Missing(_)) => {}
            Err(e) => warn!("Failed to clear pid file of {}: {}", name, e),
        }
    }

    let mut state = state.write();
    if let Some(program) = state.programs.get_mut(&name) {
        if program.status == ProgramStatus::Stopping {
            info!("Program {} stopped", name);
            program.status = ProgramStatus::Stopped;
        } else {
            warn!("Program {} exited with code {:?}", name, exit_code);
            program.status = ProgramStatus::Exited;
        }
        program.pid = None;
        program.exit_code = exit_code;
    }
}

/// Stop the program called `name`: send its stop signal, wait up to its
/// stop timeout, then SIGKILL. Stopping a program that is not running is
/// a no-op.
pub async fn stop_program(state: SharedState, name: &str) -> Result<()> {
    let (handle, previous, signal, timeout) = {
        let mut state = state.write();
        let program = state
            .programs
            .get(name)
            .ok_or_else(|| SupervisorError::ProgramNotFound(name.to_string()))?;
        if !program.status.is_live() {
            return Ok(());
        }
        let previous = program.status;
        let signal = program.config.stop_signal();
        let timeout = program.config.stop_timeout;
        let Some(handle) = state.processes.remove(name) else {
            // Another stop owns the handle
            return Ok(());
        };
        if let Some(program) = state.programs.get_mut(name) {
            program.status = ProgramStatus::Stopping;
        }
        (handle, previous, signal, timeout)
    };

    info!("Stopping program {} (PID {}) with {}", name, handle.pid, signal);
    let delivery = match send_signal(handle.pid, signal) {
        Ok(delivery) => delivery,
        Err(source) => {
            restore(&state, name, handle, previous);
            return Err(SupervisorError::Signal {
                program: name.to_string(),
                source,
            });
        }
    };
    if delivery == Delivery::NoSuchProcess {
        debug!("Program {} was already gone", name);
    }

    let mut handle = handle;
    if tokio::time::timeout(timeout, &mut handle.monitor).await.is_err() {
        warn!("Program {} did not stop gracefully, force killing", name);
        if let Err(source) = send_signal(handle.pid, Signal::SIGKILL) {
            restore(&state, name, handle, previous);
            return Err(SupervisorError::Signal {
                program: name.to_string(),
                source,
            });
        }
        if let Err(e) = handle.monitor.await {
            warn!("Monitor of program {} failed: {}", name, e);
        }
    }

    Ok(())
}

/// Put back a handle whose stop could not be signalled, so the program
/// stays tracked and a later stop tries again.
fn restore(state: &SharedState, name: &str, handle: ProcessHandle, previous: ProgramStatus) {
    if handle.monitor.is_finished() {
        return;
    }
    let mut state = state.write();
    if let Some(program) = state.programs.get_mut(name)
        && program.status == ProgramStatus::Stopping
    {
        program.status = previous;
    }
    state.processes.insert(name.to_string(), handle);
}

/// Start every configured program. Failures are logged and do not
/// prevent the remaining programs from starting.
pub async fn start_all(state: SharedState) -> usize {
    let names: Vec<String> = state.read().programs.keys().cloned().collect();
    let mut started = 0;
    for name in names {
        match spawn_program(state.clone(), &name).await {
            Ok(_) => started += 1,
            Err(SupervisorError::AlreadyRunning(_)) => {}
            Err(e) => error!("Failed to start program {}: {}", name, e),
        }
    }
    started
}

/// Stop every live program, last started first.
pub async fn stop_all(state: SharedState) -> Result<()> {
    let mut names: Vec<(String, Option<chrono::DateTime<Utc>>)> = state
        .read()
        .programs
        .values()
        .filter(|p| p.status.is_live())
        .map(|p| (p.config.name.clone(), p.started_at))
        .collect();
    names.sort_by(|a, b| b.1.cmp(&a.1));

    let mut first_error = None;
    for (name, _) in names {
        if let Err(e) = stop_program(state.clone(), &name).await {
            error!("Failed to stop program {}: {}", name, e);
            first_error.get_or_insert(e);
        }
    }
    first_error.map_or(Ok(()), Err)
}
