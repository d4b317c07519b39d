// End-to-end tests over real sockets: an axum server speaking GraphQL over
// HTTP POST and the graphql-ws subprotocol on the same /graphql route.

use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use dagit::config::{DagitConfig, TransportMode};
use dagit::link::{HttpLink, LinkChain, LinkError};
use dagit::transport::{GRAPHQL_WS_PROTOCOL, TungsteniteConnector};
use dagit::{bootstrap, ConnectionStatus, Document, FetchPolicy, Operation};
use futures::StreamExt;
use serde_json::{json, Value};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

async fn within<F: Future>(future: F) -> F::Output {
    tokio::time::timeout(Duration::from_secs(10), future)
        .await
        .expect("timed out")
}

async fn graphql_http(Json(body): Json<Value>) -> Json<Value> {
    Json(json!({
        "data": {
            "transport": "http",
            "operationName": body["operationName"],
        }
    }))
}

async fn graphql_ws(ws: WebSocketUpgrade) -> Response {
    ws.protocols([GRAPHQL_WS_PROTOCOL])
        .on_upgrade(handle_socket)
}

async fn handle_socket(mut socket: WebSocket) {
    while let Some(Ok(msg)) = socket.recv().await {
        let Message::Text(text) = msg else { continue };
        let Ok(message) = serde_json::from_str::<Value>(&text) else {
            continue;
        };

        let replies = match message["type"].as_str() {
            Some("connection_init") => vec![json!({"type": "connection_ack"})],
            Some("start") => {
                let id = message["id"].clone();
                vec![
                    json!({"type": "ka"}),
                    json!({
                        "type": "data",
                        "id": id,
                        "payload": {"data": {"transport": "websocket"}}
                    }),
                    json!({"type": "complete", "id": id}),
                ]
            }
            Some("connection_terminate") => break,
            _ => Vec::new(),
        };

        for reply in replies {
            if socket.send(Message::Text(reply.to_string())).await.is_err() {
                return;
            }
        }
    }
}

async fn broken() -> impl IntoResponse {
    (StatusCode::BAD_GATEWAY, "upstream unavailable")
}

/// Serve the test router on an ephemeral port and return its origin
async fn spawn_server() -> String {
    let app = Router::new()
        .route("/graphql", get(graphql_ws).post(graphql_http))
        .route("/broken/graphql", post(broken));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn config_for(origin: &str, mode: TransportMode) -> DagitConfig {
    let mut config = DagitConfig::default();
    config.server.origin = origin.to_string();
    config.transport.mode = mode;
    config
}

// ── websocket mode ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_websocket_mode_sends_queries_over_socket() {
    let origin = spawn_server().await;
    let config = config_for(&origin, TransportMode::WebSocket);
    let mut document = Document::with_root("root");
    let dashboard = bootstrap(&config, &mut document, Arc::new(TungsteniteConnector)).unwrap();

    assert_eq!(dashboard.status.status(), ConnectionStatus::Disconnected);

    let result = within(dashboard.client.query(
        Operation::new("query Version { version }"),
        FetchPolicy::NetworkOnly,
    ))
    .await
    .unwrap();
    assert_eq!(result.data, Some(json!({"transport": "websocket"})));
    assert_eq!(dashboard.status.status(), ConnectionStatus::Connected);

    dashboard.websocket.close();
    let mut status = dashboard.status.handle();
    within(status.wait_for(ConnectionStatus::Disconnected))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_websocket_subscription_completes() {
    let origin = spawn_server().await;
    let config = config_for(&origin, TransportMode::WebSocket);
    let mut document = Document::with_root("root");
    let dashboard = bootstrap(&config, &mut document, Arc::new(TungsteniteConnector)).unwrap();

    let events: Vec<_> = within(
        dashboard
            .client
            .subscribe(Operation::new("subscription Runs { runs }"))
            .collect::<Vec<_>>(),
    )
    .await;

    assert_eq!(events.len(), 1);
    assert_eq!(
        events[0].as_ref().unwrap().data,
        Some(json!({"transport": "websocket"}))
    );
}

// ── split mode ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_split_mode_routes_by_operation_kind() {
    let origin = spawn_server().await;
    let config = config_for(&origin, TransportMode::Split);
    let mut document = Document::with_root("root");
    let dashboard = bootstrap(&config, &mut document, Arc::new(TungsteniteConnector)).unwrap();

    let query = within(dashboard.client.query(
        Operation::new("query Version { version }").with_name("Version"),
        FetchPolicy::NetworkOnly,
    ))
    .await
    .unwrap();
    assert_eq!(
        query.data,
        Some(json!({"transport": "http", "operationName": "Version"}))
    );
    // Queries over HTTP leave the lazy socket closed
    assert_eq!(dashboard.status.status(), ConnectionStatus::Disconnected);

    let mutation = within(
        dashboard
            .client
            .mutate(Operation::new("mutation Launch { launch }")),
    )
    .await
    .unwrap();
    assert_eq!(mutation.data.unwrap()["transport"], "http");

    let mut events = dashboard
        .client
        .subscribe(Operation::new("subscription Runs { runs }"));
    let event = within(events.next()).await.unwrap().unwrap();
    assert_eq!(event.data, Some(json!({"transport": "websocket"})));
    assert_eq!(dashboard.status.status(), ConnectionStatus::Connected);
}

// ── http failures ────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_http_error_status_is_a_network_error() {
    let origin = spawn_server().await;
    let uri = format!("{}/broken/graphql", origin).parse().unwrap();
    let chain = LinkChain::from_links(vec![Arc::new(HttpLink::new(uri))]);

    let result = within(chain.execute(Operation::new("{ version }")).next())
        .await
        .unwrap();
    assert_eq!(
        result,
        Err(LinkError::Network {
            status: Some(502),
            message: "upstream unavailable".to_string(),
        })
    );
}

#[tokio::test]
async fn test_unreachable_http_endpoint_is_a_network_error() {
    let uri = "http://127.0.0.1:1/graphql".parse().unwrap();
    let chain = LinkChain::from_links(vec![Arc::new(HttpLink::new(uri))]);

    let result = within(chain.execute(Operation::new("{ version }")).next())
        .await
        .unwrap();
    assert!(matches!(result, Err(LinkError::Network { status: None, .. })));
}
