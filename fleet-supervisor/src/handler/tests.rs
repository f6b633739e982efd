use super::*;
use crate::config::{ProgramConfig, SupervisorConfig};
use crate::process::spawn_program;
use crate::state::new_shared_state;
use tokio::sync::mpsc;

fn sleeper_config() -> SupervisorConfig {
    SupervisorConfig {
        programs: vec![
            ProgramConfig::new("web", vec!["sleep".into(), "30".into()], 17010),
            ProgramConfig::new("idle", vec!["sleep".into(), "30".into()], 17011),
        ],
        ..SupervisorConfig::default()
    }
}

fn snapshot_of(response: Response) -> fleet_protocol::protocol::StatusSnapshot {
    match response {
        Response::Ok {
            data: Some(ResponseData::Status(snapshot)),
            ..
        } => snapshot,
        other => panic!("Expected status data, got {:?}", other),
    }
}

#[tokio::test]
async fn ping_answers_pong() {
    let dir = tempfile::tempdir().unwrap();
    let state = new_shared_state(dir.path().to_path_buf(), &sleeper_config());
    let (tx, _rx) = mpsc::channel(1);

    let response = handle_request(Request::Ping, state, tx).await;
    assert_eq!(response, Response::ok_with_message("pong"));
}

#[tokio::test]
async fn status_lists_every_configured_port() {
    let dir = tempfile::tempdir().unwrap();
    let state = new_shared_state(dir.path().to_path_buf(), &sleeper_config());
    let (tx, _rx) = mpsc::channel(1);

    let pid = spawn_program(state.clone(), "web").await.unwrap();
    let snapshot = snapshot_of(handle_request(Request::Status, state.clone(), tx.clone()).await);

    assert_eq!(snapshot.port_to_pid.len(), 2);
    assert_eq!(snapshot.port_to_pid[&17010], Some(pid));
    assert_eq!(snapshot.port_to_pid[&17011], None);

    handle_request(Request::Stop, state, tx).await;
}

#[tokio::test]
async fn list_programs_reports_supervisor_info() {
    let dir = tempfile::tempdir().unwrap();
    let state = new_shared_state(dir.path().to_path_buf(), &sleeper_config());
    let (tx, _rx) = mpsc::channel(1);

    match handle_request(Request::ListPrograms, state, tx).await {
        Response::Ok {
            data: Some(ResponseData::Programs(info)),
            ..
        } => {
            assert_eq!(info.pid, std::process::id());
            assert_eq!(info.component_dir, dir.path());
            let names: Vec<_> = info.programs.iter().map(|p| p.name.as_str()).collect();
            assert_eq!(names, vec!["idle", "web"]);
        }
        other => panic!("Expected program list, got {:?}", other),
    }
}

#[tokio::test]
async fn stop_stops_programs_and_requests_shutdown() {
    let dir = tempfile::tempdir().unwrap();
    let state = new_shared_state(dir.path().to_path_buf(), &sleeper_config());
    let (tx, mut rx) = mpsc::channel(1);

    spawn_program(state.clone(), "web").await.unwrap();
    spawn_program(state.clone(), "idle").await.unwrap();

    let response = handle_request(Request::Stop, state.clone(), tx).await;
    assert!(matches!(response, Response::Ok { .. }));
    assert!(rx.try_recv().is_ok());
    assert!(!state.read().snapshot().has_running());
}

#[tokio::test]
async fn shutdown_leaves_programs_alone() {
    let dir = tempfile::tempdir().unwrap();
    let state = new_shared_state(dir.path().to_path_buf(), &sleeper_config());
    let (tx, mut rx) = mpsc::channel(1);

    spawn_program(state.clone(), "web").await.unwrap();
    handle_request(Request::Shutdown, state.clone(), tx.clone()).await;
    assert!(rx.try_recv().is_ok());
    assert!(state.read().snapshot().has_running());

    crate::process::stop_all(state).await.unwrap();
}
