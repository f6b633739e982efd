use super::*;
use crate::component::ComponentKind;
use fleet_protocol::protocol::Request;
use fleet_protocol::server::{Server, ShutdownTx};

#[tokio::test]
async fn no_supervisor_means_empty_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let component = ComponentInstance::new(ComponentKind::Server, dir.path());

    let snapshot = SupervisorClient::new().status(&component).await.unwrap();
    assert_eq!(snapshot, StatusSnapshot::empty());
    assert!(SupervisorClient::new().programs(dir.path()).await.unwrap().is_none());
    SupervisorClient::new().stop(&component).await.unwrap();
}

#[tokio::test]
async fn stale_socket_means_empty_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    // A socket file nobody listens on any more
    drop(std::os::unix::net::UnixListener::bind(dir.path().join("supervisor.sock")).unwrap());
    let component = ComponentInstance::new(ComponentKind::AdminUi, dir.path());

    let snapshot = SupervisorClient::new().status(&component).await.unwrap();
    assert!(!snapshot.has_running());
}

#[tokio::test]
async fn supervisor_error_response_propagates() {
    let dir = tempfile::tempdir().unwrap();
    let server = Server::new(
        dir.path().join("supervisor.sock"),
        |_: Request, _: ShutdownTx| async { Response::error("state unavailable") },
    );
    let shutdown = server.shutdown_handle();
    let task = tokio::spawn(server.run());
    for _ in 0..50 {
        if dir.path().join("supervisor.sock").exists() {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }

    let component = ComponentInstance::new(ComponentKind::Server, dir.path());
    let err = SupervisorClient::new().status(&component).await.unwrap_err();
    assert!(matches!(err, StopError::Supervisor(ref m) if m == "state unavailable"));

    shutdown.send(()).await.unwrap();
    task.await.unwrap().unwrap();
}
