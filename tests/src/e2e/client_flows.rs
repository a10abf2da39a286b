//! Client façade against a real WebSocket server.

use rpc_client::{Client, ClientError, ClientOptions, QueryResult, RpcError};
use rpc_engine::WebSocketTransport;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::server::{MockServer, ServerConnection};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Person {
    id: String,
    name: String,
}

fn options(server: &MockServer) -> ClientOptions {
    ClientOptions::new("127.0.0.1", server.port())
        .credentials("root", "root")
        .namespace("test", "app")
}

/// Answer the sign-in and `use` requests every connection starts with.
async fn complete_bootstrap(conn: &mut ServerConnection) {
    let signin = conn.next_request().await;
    assert_eq!(signin["method"], json!("signin"));
    assert_eq!(
        signin["params"],
        json!([{ "NS": "test", "DB": "app", "user": "root", "pass": "root" }])
    );
    conn.reply(&signin["id"], json!("token")).await;

    let use_ns = conn.next_request().await;
    assert_eq!(use_ns["method"], json!("use"));
    assert_eq!(use_ns["params"], json!(["test", "app"]));
    conn.reply(&use_ns["id"], Value::Null).await;
}

#[tokio::test]
async fn test_crud_round_trip() {
    let server = MockServer::bind().await;
    let client = Client::connect_with_transport(
        options(&server),
        WebSocketTransport::new(server.endpoint()),
    )
    .unwrap();
    let mut conn = server.accept().await;
    complete_bootstrap(&mut conn).await;

    let created = {
        let client = client.clone();
        tokio::spawn(async move {
            client
                .create_as::<Vec<Person>>("person", json!({ "name": "Tobie" }))
                .await
        })
    };
    let request = conn.next_request().await;
    assert_eq!(request["method"], json!("create"));
    assert_eq!(request["params"], json!(["person", { "name": "Tobie" }]));
    conn.reply(&request["id"], json!([{ "id": "person:1", "name": "Tobie" }]))
        .await;
    assert_eq!(
        created.await.unwrap().unwrap(),
        vec![Person {
            id: "person:1".into(),
            name: "Tobie".into()
        }]
    );

    let deleted = {
        let client = client.clone();
        tokio::spawn(async move { client.delete("person:1").await })
    };
    let request = conn.next_request().await;
    assert_eq!(request["method"], json!("delete"));
    assert_eq!(request["params"], json!(["person:1"]));
    conn.reply(&request["id"], json!([])).await;
    assert_eq!(deleted.await.unwrap().unwrap(), json!([]));

    client.close().await.unwrap();
}

#[tokio::test]
async fn test_query_results_decode() {
    let server = MockServer::bind().await;
    let client = Client::connect_with_transport(
        options(&server),
        WebSocketTransport::new(server.endpoint()),
    )
    .unwrap();
    let mut conn = server.accept().await;
    complete_bootstrap(&mut conn).await;

    let query = {
        let client = client.clone();
        tokio::spawn(async move {
            client
                .query_as::<Person>("SELECT * FROM person WHERE name = $name", Some(json!({ "name": "Tobie" })))
                .await
        })
    };
    let request = conn.next_request().await;
    assert_eq!(request["method"], json!("query"));
    assert_eq!(request["params"][1], json!({ "name": "Tobie" }));
    conn.reply(
        &request["id"],
        json!([{ "result": [{ "id": "person:1", "name": "Tobie" }], "status": "OK", "time": "52µs" }]),
    )
    .await;

    let results: Vec<QueryResult<Person>> = query.await.unwrap().unwrap();
    assert_eq!(results.len(), 1);
    assert!(results[0].is_ok());
    assert_eq!(results[0].result[0].name, "Tobie");
}

#[tokio::test]
async fn test_authentication_failure_surfaces_as_typed_error() {
    let server = MockServer::bind().await;
    let client = Client::connect_with_transport(
        ClientOptions::new("127.0.0.1", server.port()),
        WebSocketTransport::new(server.endpoint()),
    )
    .unwrap();
    let mut conn = server.accept().await;

    let signin = {
        let client = client.clone();
        tokio::spawn(async move { client.signin(json!({ "user": "root", "pass": "wrong" })).await })
    };
    let request = conn.next_request().await;
    assert_eq!(request["method"], json!("signin"));
    conn.reply_error(&request["id"], -32000, "There was a problem with authentication")
        .await;

    let err = signin.await.unwrap().unwrap_err();
    assert!(matches!(
        err,
        ClientError::Rpc(RpcError::Authentication { .. })
    ));
}
