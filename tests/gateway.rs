//! Gateway forwarding against stub backends and a stub Bot API.

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use axum::{
    Json, Router,
    extract::Path,
    http::{HeaderMap, StatusCode, header},
    routing::{delete, post},
};
use secrecy::SecretString;
use serde_json::{Value, json};

use tgb_microsuite::gateway::{
    CONNECT_FAILURE, Command, GREETING, Gateway, HISTORY_CLEARED, RagApiClient, STATUS_FAILURE,
    TIMEOUT_FAILURE, TelegramApi, Update,
};

const SERVICE_KEY: &str = "tgb_service_key";

async fn spawn(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn authorized(headers: &HeaderMap) -> bool {
    let expected = format!("Bearer {}", SERVICE_KEY);
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        == Some(expected.as_str())
}

/// Echoes questions back and accepts history deletion.
async fn echo_backend() -> String {
    let app = Router::new()
        .route(
            "/api/v1/chat/invoke",
            post(|headers: HeaderMap, Json(body): Json<Value>| async move {
                if !authorized(&headers) {
                    return Err(StatusCode::UNAUTHORIZED);
                }
                Ok(Json(json!({
                    "answer": format!("{} asked: {}", body["user_id"].as_str().unwrap_or("?"), body["user_query"].as_str().unwrap_or("")),
                    "original_query": body["user_query"],
                })))
            }),
        )
        .route(
            "/api/v1/memory/history/{user_id}",
            delete(|Path(_user_id): Path<String>| async { StatusCode::NO_CONTENT }),
        );
    spawn(app).await
}

async fn failing_backend() -> String {
    let app = Router::new().route(
        "/api/v1/chat/invoke",
        post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
    );
    spawn(app).await
}

async fn slow_backend() -> String {
    let app = Router::new().route(
        "/api/v1/chat/invoke",
        post(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Json(json!({ "answer": "too late", "original_query": "" }))
        }),
    );
    spawn(app).await
}

/// A base URL nothing listens on.
async fn closed_port() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

/// Bot API stub that records every `sendMessage` body.
async fn telegram_stub(sent: Arc<Mutex<Vec<Value>>>) -> String {
    let app = Router::new()
        .route(
            "/botTOKEN/sendMessage",
            post(move |Json(body): Json<Value>| {
                let sent = sent.clone();
                async move {
                    let chat_id = body["chat_id"].clone();
                    sent.lock().unwrap().push(body);
                    Json(json!({
                        "ok": true,
                        "result": { "message_id": 1, "chat": { "id": chat_id } }
                    }))
                }
            }),
        )
        .route(
            "/botTOKEN/sendChatAction",
            post(|| async { Json(json!({ "ok": true, "result": true })) }),
        );
    spawn(app).await
}

fn gateway(telegram_url: &str, backend_url: &str, timeout: Duration) -> Gateway {
    let telegram = TelegramApi::new(telegram_url, "TOKEN", Duration::from_secs(1)).unwrap();
    let rag = RagApiClient::new(backend_url, SecretString::from(SERVICE_KEY), timeout).unwrap();
    Gateway::new(telegram, rag, Duration::from_secs(1))
}

fn text_update(user_id: i64, chat_id: i64, text: &str) -> Update {
    serde_json::from_value(json!({
        "update_id": 1,
        "message": {
            "message_id": 7,
            "chat": { "id": chat_id },
            "from": { "id": user_id, "first_name": "Ada" },
            "text": text
        }
    }))
    .unwrap()
}

#[tokio::test]
async fn answer_is_relayed_to_the_chat() {
    let sent = Arc::new(Mutex::new(Vec::new()));
    let telegram = telegram_stub(sent.clone()).await;
    let backend = echo_backend().await;
    let gateway = gateway(&telegram, &backend, Duration::from_secs(5));

    gateway
        .handle_update(&text_update(42, 1000, "what is RAG?"))
        .await;

    let sent = sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0]["chat_id"], 1000);
    assert_eq!(sent[0]["text"], "42 asked: what is RAG?");
}

#[tokio::test]
async fn commands_are_answered() {
    let backend = echo_backend().await;
    let gateway = gateway("http://127.0.0.1:9", &backend, Duration::from_secs(5));

    assert_eq!(gateway.reply_to(Command::Start, 42).await, GREETING);
    assert_eq!(gateway.reply_to(Command::Clear, 42).await, HISTORY_CLEARED);
}

#[tokio::test]
async fn error_status_gets_the_generic_apology() {
    let backend = failing_backend().await;
    let gateway = gateway("http://127.0.0.1:9", &backend, Duration::from_secs(5));

    let reply = gateway.reply_to(Command::Ask("hello"), 42).await;
    assert_eq!(reply, STATUS_FAILURE);
}

#[tokio::test]
async fn wrong_service_key_is_a_status_failure() {
    let backend = echo_backend().await;
    let telegram = TelegramApi::new("http://127.0.0.1:9", "TOKEN", Duration::from_secs(1)).unwrap();
    let rag = RagApiClient::new(
        &backend,
        SecretString::from("tgb_wrong"),
        Duration::from_secs(5),
    )
    .unwrap();
    let gateway = Gateway::new(telegram, rag, Duration::from_secs(1));

    let reply = gateway.reply_to(Command::Ask("hello"), 42).await;
    assert_eq!(reply, STATUS_FAILURE);
}

#[tokio::test]
async fn slow_backend_times_out() {
    let backend = slow_backend().await;
    let gateway = gateway("http://127.0.0.1:9", &backend, Duration::from_millis(200));

    let reply = gateway.reply_to(Command::Ask("hello"), 42).await;
    assert_eq!(reply, TIMEOUT_FAILURE);
}

#[tokio::test]
async fn unreachable_backend_gets_the_connection_apology() {
    let backend = closed_port().await;
    let gateway = gateway("http://127.0.0.1:9", &backend, Duration::from_secs(5));

    let reply = gateway.reply_to(Command::Ask("hello"), 42).await;
    assert_eq!(reply, CONNECT_FAILURE);
}

#[tokio::test]
async fn malformed_bot_api_reply_does_not_reveal_the_token() {
    let app = Router::new().route(
        "/bot123456:SECRET_BOT_TOKEN/sendMessage",
        post(|| async { "<html>bad gateway</html>" }),
    );
    let url = spawn(app).await;
    let telegram = TelegramApi::new(&url, "123456:SECRET_BOT_TOKEN", Duration::from_secs(1)).unwrap();

    let err = telegram.send_message(1000, "hi").await.unwrap_err();
    let message = err.to_string();
    assert!(message.contains("malformed response"));
    assert!(!message.contains("SECRET_BOT_TOKEN"));
}

#[tokio::test]
async fn non_text_updates_are_ignored() {
    let sent = Arc::new(Mutex::new(Vec::new()));
    let telegram = telegram_stub(sent.clone()).await;
    let backend = echo_backend().await;
    let gateway = gateway(&telegram, &backend, Duration::from_secs(5));

    let photo: Update = serde_json::from_value(json!({
        "update_id": 2,
        "message": { "message_id": 8, "chat": { "id": 1000 }, "photo": [] }
    }))
    .unwrap();
    gateway.handle_update(&photo).await;

    assert!(sent.lock().unwrap().is_empty());
}
