//! HTTP behavior of the chat client against a scripted local endpoint.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use suara_chat::{ChatBackend, ChatError, HttpChatClient, Message, ModelCatalog};

#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Option<Value>>>);

async fn ok_handler(State(captured): State<Captured>, Json(body): Json<Value>) -> Json<Value> {
    *captured.0.lock().unwrap() = Some(body);
    Json(json!({"choices": [{"message": {"content": "Hai!"}}]}))
}

async fn empty_handler() -> Json<Value> {
    Json(json!({"choices": []}))
}

async fn quota_handler() -> (StatusCode, Json<Value>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"details": "Quota exceeded for provider"})),
    )
}

async fn error_handler() -> (StatusCode, Json<Value>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"details": "upstream exploded"})),
    )
}

async fn spawn_server() -> (String, Captured) {
    let captured = Captured::default();
    let app = Router::new()
        .route("/ok", post(ok_handler))
        .route("/empty", post(empty_handler))
        .route("/quota", post(quota_handler))
        .route("/fail", post(error_handler))
        .with_state(captured.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), captured)
}

fn default_model() -> suara_chat::ModelInfo {
    ModelCatalog::default().default_model().unwrap().clone()
}

#[tokio::test]
async fn success_parses_reply_and_sends_expected_shape() {
    let (base, captured) = spawn_server().await;
    let client = HttpChatClient::new(format!("{base}/ok"));

    let history = vec![Message::user("halo"), Message::assistant("hai")];
    let reply = client
        .send("apa kabar", &history, &default_model())
        .await
        .unwrap();
    assert_eq!(reply, "Hai!");

    let body = captured.0.lock().unwrap().clone().unwrap();
    assert_eq!(body["message"], "apa kabar");
    assert_eq!(body["model"], "gemini-2.0-flash");
    assert_eq!(body["provider"], "gemini");
    assert_eq!(body["history"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn history_is_windowed_to_ten_entries() {
    let (base, captured) = spawn_server().await;
    let client = HttpChatClient::new(format!("{base}/ok"));

    let history: Vec<Message> = (0..30).map(|i| Message::user(format!("m{i}"))).collect();
    client
        .send("halo", &history, &default_model())
        .await
        .unwrap();

    let body = captured.0.lock().unwrap().clone().unwrap();
    let sent = body["history"].as_array().unwrap();
    assert_eq!(sent.len(), 10);
    assert_eq!(sent[0]["content"], "m20");
}

#[tokio::test]
async fn missing_content_yields_fallback_reply_not_error() {
    let (base, _) = spawn_server().await;
    let client = HttpChatClient::new(format!("{base}/empty"));

    let reply = client.send("halo", &[], &default_model()).await.unwrap();
    assert_eq!(reply, suara_chat::client::EMPTY_REPLY_FALLBACK);
}

#[tokio::test]
async fn quota_detail_maps_to_quota_outcome() {
    let (base, _) = spawn_server().await;
    let client = HttpChatClient::new(format!("{base}/quota"));

    let err = client.send("halo", &[], &default_model()).await.unwrap_err();
    assert!(matches!(err, ChatError::QuotaExhausted { .. }));
}

#[tokio::test]
async fn other_failures_map_to_connection_outcome() {
    let (base, _) = spawn_server().await;
    let client = HttpChatClient::new(format!("{base}/fail"));

    let err = client.send("halo", &[], &default_model()).await.unwrap_err();
    assert!(matches!(err, ChatError::Connection(detail) if detail.contains("upstream")));
}

#[tokio::test]
async fn unreachable_endpoint_maps_to_connection_outcome() {
    let client = HttpChatClient::new("http://127.0.0.1:9/chat");
    let err = client.send("halo", &[], &default_model()).await.unwrap_err();
    assert!(matches!(err, ChatError::Connection(_)));
}
