use super::*;
use crate::protocol::{
    ResponseData, ResponseEnvelope, StatusSnapshot, decode_envelope, encode_response,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixListener;

/// Helper: spin up a mock server that reads one envelope and replies.
fn mock_server_one_shot(
    listener: UnixListener,
    make_response: impl FnOnce(RequestEnvelope) -> ResponseEnvelope + Send + 'static,
) {
    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();

        let mut len_buf = [0u8; 4];
        stream.read_exact(&mut len_buf).await.unwrap();
        let msg_len = u32::from_be_bytes(len_buf) as usize;
        let mut payload = vec![0u8; msg_len];
        stream.read_exact(&mut payload).await.unwrap();

        let envelope = decode_envelope(&payload).unwrap();
        let bytes = encode_response(&make_response(envelope)).unwrap();
        stream.write_all(&bytes).await.unwrap();
        stream.shutdown().await.unwrap();
    });
}

#[tokio::test]
async fn request_id_monotonically_increases() {
    let tmp = tempfile::tempdir().unwrap();
    let sock = tmp.path().join("test.sock");
    let listener = UnixListener::bind(&sock).unwrap();

    let server = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut ids = Vec::new();

        for _ in 0..3 {
            let mut len_buf = [0u8; 4];
            stream.read_exact(&mut len_buf).await.unwrap();
            let msg_len = u32::from_be_bytes(len_buf) as usize;
            let mut payload = vec![0u8; msg_len];
            stream.read_exact(&mut payload).await.unwrap();

            let envelope = decode_envelope(&payload).unwrap();
            ids.push(envelope.id);

            let resp = ResponseEnvelope {
                id: envelope.id,
                response: Response::ok_with_message("pong"),
            };
            stream.write_all(&encode_response(&resp).unwrap()).await.unwrap();
        }
        ids
    });

    let client = Client::connect(&sock).await.unwrap();
    for _ in 0..3 {
        client.ping().await.unwrap();
    }

    assert_eq!(server.await.unwrap(), vec![1, 2, 3]);
}

#[tokio::test]
async fn status_returns_snapshot_from_server() {
    let tmp = tempfile::tempdir().unwrap();
    let sock = tmp.path().join("test.sock");
    let listener = UnixListener::bind(&sock).unwrap();

    mock_server_one_shot(listener, |envelope| {
        assert_eq!(envelope.request, Request::Status);
        let snapshot: StatusSnapshot = [(17010, Some(1234))].into_iter().collect();
        ResponseEnvelope {
            id: envelope.id,
            response: Response::ok_with_data(ResponseData::Status(snapshot)),
        }
    });

    let client = Client::connect(&sock).await.unwrap();
    let response = client.status().await.unwrap();

    match response {
        Response::Ok {
            data: Some(ResponseData::Status(snapshot)),
            ..
        } => assert_eq!(snapshot.port_to_pid.get(&17010), Some(&Some(1234))),
        other => panic!("Expected status data, got {:?}", other),
    }
}

#[tokio::test]
async fn disconnection_detected_for_inflight_request() {
    let tmp = tempfile::tempdir().unwrap();
    let sock = tmp.path().join("test.sock");
    let listener = UnixListener::bind(&sock).unwrap();

    // Server accepts, reads the request, then disconnects without replying
    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut len_buf = [0u8; 4];
        let _ = stream.read_exact(&mut len_buf).await;
        let msg_len = u32::from_be_bytes(len_buf) as usize;
        let mut payload = vec![0u8; msg_len];
        let _ = stream.read_exact(&mut payload).await;
        drop(stream);
    });

    let client = Client::connect(&sock).await.unwrap();
    let result = client.stop().await;

    assert!(matches!(result, Err(ClientError::Disconnected)));
}

#[tokio::test]
async fn connect_to_missing_socket_is_not_listening() {
    let tmp = tempfile::tempdir().unwrap();
    let sock = tmp.path().join("missing.sock");

    let err = match Client::connect(&sock).await {
        Err(e) => e,
        Ok(_) => panic!("connect should fail"),
    };
    assert!(err.is_not_listening());
    assert!(!Client::is_supervisor_running(&sock).await);
}

#[tokio::test]
async fn connect_to_stale_socket_is_not_listening() {
    let tmp = tempfile::tempdir().unwrap();
    let sock = tmp.path().join("stale.sock");
    // Bind and drop: the socket file stays behind with nobody listening
    drop(UnixListener::bind(&sock).unwrap());

    let err = match Client::connect(&sock).await {
        Err(e) => e,
        Ok(_) => panic!("connect should fail"),
    };
    assert!(err.is_not_listening());
}
