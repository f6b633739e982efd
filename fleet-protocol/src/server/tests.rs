use super::*;
use crate::client::Client;

#[test]
fn peer_allowed_same_uid_or_root() {
    assert!(peer_allowed(1000, 1000));
    assert!(peer_allowed(0, 1000));
    assert!(!peer_allowed(1001, 1000));
}

async fn wait_for_socket(path: &std::path::Path) {
    for _ in 0..100 {
        if Client::is_supervisor_running(path).await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("server did not come up at {:?}", path);
}

#[tokio::test]
async fn serves_requests_and_shuts_down() {
    let tmp = tempfile::tempdir().unwrap();
    let sock = tmp.path().join("supervisor.sock");

    let server = Server::new(sock.clone(), |request: Request, shutdown_tx: ShutdownTx| async move {
        match request {
            Request::Ping => Response::ok_with_message("pong"),
            Request::Shutdown => {
                let _ = shutdown_tx.send(()).await;
                Response::ok_with_message("bye")
            }
            other => Response::error(format!("unsupported: {}", other.variant_name())),
        }
    });
    let server_task = tokio::spawn(server.run());
    wait_for_socket(&sock).await;

    let client = Client::connect(&sock).await.unwrap();
    assert_eq!(
        client.status().await.unwrap(),
        Response::error("unsupported: Status")
    );
    assert_eq!(client.shutdown().await.unwrap(), Response::ok_with_message("bye"));
    drop(client);

    server_task.await.unwrap().unwrap();
    assert!(!sock.exists(), "socket file should be removed on shutdown");
}

#[tokio::test]
async fn rejects_symlinked_socket_path() {
    let tmp = tempfile::tempdir().unwrap();
    let target = tmp.path().join("target.sock");
    let link = tmp.path().join("link.sock");
    std::fs::write(&target, b"").unwrap();
    std::os::unix::fs::symlink(&target, &link).unwrap();

    let server = Server::new(link, |_: Request, _: ShutdownTx| async { Response::ok() });
    assert!(matches!(
        server.run().await,
        Err(ServerError::SocketSymlink { .. })
    ));
    assert!(target.exists());
}

#[tokio::test]
async fn oversized_request_gets_error_response() {
    use tokio::io::AsyncReadExt;

    let tmp = tempfile::tempdir().unwrap();
    let sock = tmp.path().join("supervisor.sock");
    let server = Server::new(sock.clone(), |_: Request, _: ShutdownTx| async { Response::ok() });
    let shutdown = server.shutdown_handle();
    let server_task = tokio::spawn(server.run());
    wait_for_socket(&sock).await;

    let mut stream = UnixStream::connect(&sock).await.unwrap();
    stream
        .write_all(&((MAX_MESSAGE_SIZE + 1) as u32).to_be_bytes())
        .await
        .unwrap();

    let mut len_buf = [0u8; 4];
    stream.read_exact(&mut len_buf).await.unwrap();
    let mut payload = vec![0u8; u32::from_be_bytes(len_buf) as usize];
    stream.read_exact(&mut payload).await.unwrap();
    let envelope = crate::protocol::decode_response(&payload).unwrap();
    assert_eq!(envelope.id, 0);
    assert!(matches!(envelope.response, Response::Error { .. }));

    shutdown.send(()).await.unwrap();
    server_task.await.unwrap().unwrap();
}
