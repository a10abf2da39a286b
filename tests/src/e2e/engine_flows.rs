//! Engine against a real WebSocket server.

use rpc_engine::{ConnectionState, EngineConfig, RpcEngine, RpcError};
use serde_json::{json, Value};

use super::server::{unused_port, wait_for_metrics, MockServer};

#[tokio::test]
async fn test_out_of_order_responses_reach_their_callers() {
    let server = MockServer::bind().await;
    let engine = RpcEngine::connect(server.config()).unwrap();
    let mut conn = server.accept().await;
    engine.wait_for_connected().await.unwrap();

    let calls: Vec<_> = (0..5)
        .map(|i| {
            let engine = engine.clone();
            tokio::spawn(async move { engine.send("select", json!(format!("thing:{i}"))).await })
        })
        .collect();

    let mut requests = Vec::new();
    for _ in 0..5 {
        requests.push(conn.next_request().await);
    }
    for request in requests.iter().rev() {
        let thing = request["params"][0].clone();
        conn.reply(&request["id"], json!({ "id": thing })).await;
    }

    for (i, call) in calls.into_iter().enumerate() {
        assert_eq!(
            call.await.unwrap().unwrap(),
            json!({ "id": format!("thing:{i}") })
        );
    }
    engine.close().await.unwrap();
}

#[tokio::test]
async fn test_calls_before_handshake_are_held_and_drained() {
    let server = MockServer::bind().await;
    let engine = RpcEngine::connect(server.config()).unwrap();

    let first = {
        let engine = engine.clone();
        tokio::spawn(async move { engine.send("info", Value::Null).await })
    };
    wait_for_metrics(&engine, |m| m.requests_queued == 1).await;
    let second = {
        let engine = engine.clone();
        tokio::spawn(async move { engine.send("select", json!("person")).await })
    };
    wait_for_metrics(&engine, |m| m.requests_queued == 2).await;
    assert_ne!(engine.state(), ConnectionState::Connected);

    let mut conn = server.accept().await;
    let a = conn.next_request().await;
    let b = conn.next_request().await;
    assert_eq!(a, json!({ "id": "1", "method": "info", "params": [] }));
    assert_eq!(b, json!({ "id": "2", "method": "select", "params": ["person"] }));

    conn.reply(&b["id"], json!([])).await;
    conn.reply(&a["id"], json!({ "ns": {} })).await;
    assert_eq!(second.await.unwrap().unwrap(), json!([]));
    assert_eq!(first.await.unwrap().unwrap(), json!({ "ns": {} }));
}

#[tokio::test]
async fn test_remote_errors_are_classified_per_caller() {
    let server = MockServer::bind().await;
    let engine = RpcEngine::connect(server.config()).unwrap();
    let mut conn = server.accept().await;
    engine.wait_for_connected().await.unwrap();

    let signin = {
        let engine = engine.clone();
        tokio::spawn(async move { engine.send("signin", json!({ "user": "x", "pass": "y" })).await })
    };
    let signin_request = conn.next_request().await;
    let ok = {
        let engine = engine.clone();
        tokio::spawn(async move { engine.send("ping", Value::Null).await })
    };
    let ok_request = conn.next_request().await;

    conn.reply_error(&signin_request["id"], -32000, "There was a problem with authentication")
        .await;
    conn.reply(&ok_request["id"], json!("pong")).await;

    assert!(matches!(
        signin.await.unwrap(),
        Err(RpcError::Authentication { .. })
    ));
    assert_eq!(ok.await.unwrap().unwrap(), json!("pong"));
}

#[tokio::test]
async fn test_unsolicited_frames_do_not_disturb_callers() {
    let server = MockServer::bind().await;
    let engine = RpcEngine::connect(server.config()).unwrap();
    let mut conn = server.accept().await;
    engine.wait_for_connected().await.unwrap();

    let call = {
        let engine = engine.clone();
        tokio::spawn(async move { engine.send("query", json!("SELECT 1")).await })
    };
    let request = conn.next_request().await;

    conn.send_text(r#"{"method":"notify","params":["live"]}"#).await;
    conn.send_text("garbage").await;
    conn.reply(&json!("424242"), json!("nobody")).await;
    conn.reply(&request["id"], json!([1])).await;

    assert_eq!(call.await.unwrap().unwrap(), json!([1]));
    let metrics = engine.metrics();
    assert_eq!(metrics.unsolicited_frames, 2);
    assert_eq!(metrics.malformed_frames, 1);
}

#[tokio::test]
async fn test_server_close_rejects_outstanding_calls() {
    let server = MockServer::bind().await;
    let engine = RpcEngine::connect(server.config()).unwrap();
    let mut conn = server.accept().await;
    engine.wait_for_connected().await.unwrap();

    let call = {
        let engine = engine.clone();
        tokio::spawn(async move { engine.send("select", json!("person")).await })
    };
    conn.next_request().await;
    conn.close().await;

    assert!(matches!(call.await.unwrap(), Err(RpcError::ConnectionClosed)));
    assert!(matches!(
        engine.send("select", json!("person")).await,
        Err(RpcError::NotConnected)
    ));
}

#[tokio::test]
async fn test_client_close_reaches_server() {
    let server = MockServer::bind().await;
    let engine = RpcEngine::connect(server.config()).unwrap();
    let mut conn = server.accept().await;
    engine.wait_for_connected().await.unwrap();

    engine.close().await.unwrap();
    assert!(conn.next_message().await.is_none());
    assert_eq!(engine.state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn test_unreachable_endpoint_fails_held_calls() {
    let port = unused_port().await;
    let engine = RpcEngine::connect(EngineConfig::new("127.0.0.1", port)).unwrap();

    assert!(matches!(
        engine.send("ping", Value::Null).await,
        Err(RpcError::NotConnected)
    ));
    assert!(matches!(
        engine.wait_for_connected().await,
        Err(RpcError::NotConnected)
    ));
    assert_eq!(engine.state(), ConnectionState::Disconnected);
}
