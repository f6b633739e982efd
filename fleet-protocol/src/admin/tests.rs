use super::*;
use serde_json::json;
use tokio::net::TcpListener;

/// Helper: accept one connection, decode the request, reply with `respond`.
async fn mock_admin_service(
    respond: impl FnOnce(AdminRequest) -> AdminResponse + Send + 'static,
) -> ClusterRef {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap().to_string();

    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let Frame::Payload(payload) = read_frame(&mut stream, MAX_MESSAGE_SIZE).await.unwrap() else {
            panic!("expected a request frame");
        };
        let request: AdminRequest = serde_json::from_slice(&payload).unwrap();
        let frame = encode_json_frame(&respond(request)).unwrap();
        stream.write_all(&frame).await.unwrap();
    });

    ClusterRef {
        id: 1,
        name: "dev".to_string(),
        address,
    }
}

#[tokio::test]
async fn invoke_returns_response_document() {
    let cluster = mock_admin_service(|request| {
        assert_eq!(request.cluster_id, 1);
        assert_eq!(request.command, "security.ssl.get-list");
        AdminResponse::ok(json!({"definition_list": [{"id": "7", "name": "partner-a"}]}))
    })
    .await;

    let response = AdminRpcClient::default()
        .invoke(&cluster, "security.ssl.get-list", json!({}))
        .await
        .unwrap();

    assert_eq!(response.status, AdminStatus::Ok);
    assert_eq!(response.document["definition_list"][0]["name"], "partner-a");
}

#[tokio::test]
async fn invoke_forwards_request_document() {
    let cluster = mock_admin_service(|request| AdminResponse::ok(request.document)).await;

    let document = json!({"data": {"id": "42", "is_active": true}});
    let response = AdminRpcClient::default()
        .invoke(&cluster, "security.ssl.get", document.clone())
        .await
        .unwrap();

    assert_eq!(response.document, document);
}

#[tokio::test]
async fn service_error_status_becomes_error() {
    let cluster = mock_admin_service(|_| AdminResponse::error("no such definition")).await;

    let err = AdminRpcClient::default()
        .invoke(&cluster, "security.ssl.delete", json!({"data": {"id": "9"}}))
        .await
        .unwrap_err();

    match err {
        AdminRpcError::Service { command, message } => {
            assert_eq!(command, "security.ssl.delete");
            assert_eq!(message, "no such definition");
        }
        other => panic!("Expected Service error, got {:?}", other),
    }
}

#[tokio::test]
async fn unreachable_cluster_is_connect_error() {
    // Bind then drop to get a port with nothing listening
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap().to_string();
    drop(listener);

    let cluster = ClusterRef {
        id: 2,
        name: "gone".to_string(),
        address,
    };
    let err = AdminRpcClient::default()
        .invoke(&cluster, "ping", Value::Null)
        .await
        .unwrap_err();

    assert!(matches!(err, AdminRpcError::Connect { .. }));
}

#[tokio::test]
async fn silent_service_times_out() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap().to_string();
    tokio::spawn(async move {
        let (_stream, _) = listener.accept().await.unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;
    });

    let cluster = ClusterRef {
        id: 3,
        name: "slow".to_string(),
        address,
    };
    let err = AdminRpcClient::new(Duration::from_millis(100))
        .invoke(&cluster, "ping", Value::Null)
        .await
        .unwrap_err();

    assert!(matches!(err, AdminRpcError::Timeout { .. }));
}

#[test]
fn response_without_document_defaults_to_null() {
    let response: AdminResponse = serde_json::from_str(r#"{"status": "ok"}"#).unwrap();
    assert_eq!(response, AdminResponse::ok(Value::Null));
}
