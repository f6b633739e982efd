use super::*;
use chrono::TimeZone;
use fleet_cli::errors::{SignalError, StopError};
use fleet_cli::exit_codes::{FILE_MISSING, SUCCESS};
use fleet_cli::ComponentKind;
use fleet_protocol::protocol::StatusSnapshot;
use std::path::PathBuf;
use std::time::Duration;

fn program(pid: Option<u32>, exit_code: Option<i32>) -> ProgramInfo {
    ProgramInfo {
        name: "server-1".to_string(),
        port: 17010,
        pid,
        started_at: Some(Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap()),
        exit_code,
    }
}

#[test]
fn stop_defaults_to_current_directory() {
    let cli = Cli::try_parse_from(["fleet", "stop"]).unwrap();
    match cli.command {
        Commands::Stop { dir, kind, quiet } => {
            assert_eq!(dir, PathBuf::from("."));
            assert_eq!(kind, None);
            assert!(!quiet);
        }
        other => panic!("Expected stop, got {:?}", other),
    }
}

#[test]
fn stop_accepts_kind_and_quiet() {
    let cli = Cli::try_parse_from([
        "fleet",
        "stop",
        "/opt/fleet/lb",
        "--kind",
        "load-balancer",
        "--quiet",
    ])
    .unwrap();
    match cli.command {
        Commands::Stop { dir, kind, quiet } => {
            assert_eq!(dir, PathBuf::from("/opt/fleet/lb"));
            assert_eq!(kind, Some(ComponentKind::LoadBalancer));
            assert!(quiet);
        }
        other => panic!("Expected stop, got {:?}", other),
    }
}

#[test]
fn unknown_kind_is_a_usage_error() {
    let err = Cli::try_parse_from(["fleet", "stop", "--kind", "database"]).unwrap_err();
    assert_eq!(err.exit_code(), fleet_cli::exit_codes::USAGE);
}

#[test]
fn signal_parses_signal_kind() {
    let cli = Cli::try_parse_from(["fleet", "signal", "/tmp/x.pid", "reload"]).unwrap();
    match cli.command {
        Commands::Signal { signal, name, .. } => {
            assert_eq!(signal, SignalKind::Reload);
            assert_eq!(name, "process");
        }
        other => panic!("Expected signal, got {:?}", other),
    }
}

#[test]
fn admin_parses_timeout_and_document() {
    let cli = Cli::try_parse_from([
        "fleet",
        "admin",
        "127.0.0.1:17010",
        "security.ssl.get-list",
        "--timeout",
        "500ms",
        "--document",
        r#"{"cluster_id": 1}"#,
    ])
    .unwrap();
    match cli.command {
        Commands::Admin {
            timeout,
            cluster_id,
            document,
            ..
        } => {
            assert_eq!(timeout, Duration::from_millis(500));
            assert_eq!(cluster_id, 1);
            assert_eq!(document, r#"{"cluster_id": 1}"#);
        }
        other => panic!("Expected admin, got {:?}", other),
    }
}

#[test]
fn running_row_shows_pid_and_uptime() {
    let now = Utc.with_ymd_and_hms(2026, 1, 1, 14, 30, 0).unwrap();
    let row = format_program_row(&program(Some(4242), None), now);
    assert_eq!(row.pid, "4242");
    assert_eq!(row.status, "running");
    assert_eq!(row.uptime, "2h");
}

#[test]
fn exited_row_shows_exit_code() {
    let now = Utc::now();
    let row = format_program_row(&program(None, Some(3)), now);
    assert_eq!(row.pid, "-");
    assert_eq!(row.status, "exited (3)");
    assert_eq!(row.uptime, "-");

    let row = format_program_row(&program(None, None), now);
    assert_eq!(row.status, "stopped");
}

#[test]
fn uptime_units() {
    let start = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
    assert_eq!(format_uptime(start, start + chrono::Duration::seconds(42)), "42s");
    assert_eq!(format_uptime(start, start + chrono::Duration::minutes(5)), "5m");
    assert_eq!(format_uptime(start, start + chrono::Duration::days(3)), "3d");
    assert_eq!(format_uptime(start, start - chrono::Duration::seconds(5)), "0s");
}

/// Supervisor that reports one live program and refuses to stop it.
struct RefusingSupervisor;

impl ComponentStatusProbe for RefusingSupervisor {
    async fn status(
        &self,
        _component: &ComponentInstance,
    ) -> std::result::Result<StatusSnapshot, StopError> {
        Ok([(17010, Some(4242))].into_iter().collect())
    }
}

impl SupervisorCommand for RefusingSupervisor {
    async fn stop(&self, _component: &ComponentInstance) -> std::result::Result<(), StopError> {
        Err(StopError::Supervisor("refused".to_string()))
    }
}

fn custom_codes() -> ExitCodes {
    ExitCodes {
        generic: 42,
        file_missing: 43,
        ..ExitCodes::default()
    }
}

#[tokio::test]
async fn stop_failure_uses_context_exit_codes() {
    let dir = tempfile::tempdir().unwrap();
    let component = ComponentInstance::new(ComponentKind::Server, dir.path());
    let ctx = StopContext::new(component).with_exit_codes(custom_codes());

    assert_eq!(handle_stop(&ctx, RefusingSupervisor).await, 42);
}

#[tokio::test]
async fn stop_hook_failure_uses_context_exit_codes() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join(fleet_cli::hooks::LB_AGENT_CONFIG);
    std::fs::create_dir_all(config.parent().unwrap()).unwrap();
    std::fs::write(&config, r#"{"pid_file": "lb.pid"}"#).unwrap();
    let component = ComponentInstance::new(ComponentKind::LoadBalancer, dir.path());
    let ctx = StopContext::new(component).with_exit_codes(custom_codes());

    assert_eq!(handle_stop(&ctx, RefusingSupervisor).await, 43);
}

#[tokio::test]
async fn stop_of_idle_component_is_success() {
    let dir = tempfile::tempdir().unwrap();
    let component = ComponentInstance::new(ComponentKind::Server, dir.path());
    let ctx = StopContext::new(component).with_exit_codes(custom_codes());

    assert_eq!(handle_stop(&ctx, SupervisorClient::new()).await, SUCCESS);
}

#[test]
fn cli_error_maps_through_given_codes() {
    let err = CliError::Signal(SignalError::FileMissing {
        path: PathBuf::from("/srv/lb/pidfile"),
    });
    assert_eq!(err.exit_code(&custom_codes()), 43);
    assert_eq!(err.exit_code(&ExitCodes::default()), FILE_MISSING);
}

#[test]
fn signal_to_vanished_process_succeeds_and_clears_file() {
    let dir = tempfile::tempdir().unwrap();
    let pid_file = dir.path().join("pidfile");
    let mut child = std::process::Command::new("true").spawn().unwrap();
    let pid = child.id();
    child.wait().unwrap();
    std::fs::write(&pid_file, pid.to_string()).unwrap();

    let code = handle_signal(&pid_file, SignalKind::Terminate, "process", &custom_codes()).unwrap();

    assert_eq!(code, SUCCESS);
    assert_eq!(std::fs::read_to_string(&pid_file).unwrap(), "");
}

#[test]
fn signal_with_missing_file_is_still_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = handle_signal(
        &dir.path().join("pidfile"),
        SignalKind::Terminate,
        "process",
        &ExitCodes::default(),
    )
    .unwrap_err();
    assert_eq!(err.exit_code(&ExitCodes::default()), FILE_MISSING);
    assert!(err.is_reported());
}
