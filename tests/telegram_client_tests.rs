//! `TelegramClient` against a local Bot API stub.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::Uri;
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use bankroll_bot::bot::{ChatPlatform, TelegramClient};
use serde_json::{json, Value};

const TOKEN: &str = "123:test";

type Seen = Arc<Mutex<Vec<(String, Value)>>>;

async fn bot_api(State(seen): State<Seen>, uri: Uri, body: Bytes) -> Response {
    let path = uri.path().to_string();
    if path.starts_with("/file/") {
        return b"ticket-bytes".to_vec().into_response();
    }
    let payload = serde_json::from_slice(&body).unwrap_or(Value::Null);
    seen.lock().unwrap().push((path, payload));
    Json(json!({"ok": true, "result": true})).into_response()
}

async fn stub() -> Result<(SocketAddr, Seen)> {
    let seen: Seen = Arc::default();
    let app = Router::new().fallback(bot_api).with_state(seen.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok((addr, seen))
}

fn client(addr: SocketAddr) -> Result<TelegramClient> {
    let api_url = reqwest::Url::parse(&format!("http://{addr}"))?;
    Ok(TelegramClient::new(TOKEN).with_api_url(api_url))
}

#[tokio::test]
async fn test_answer_callback_sends_query_id() -> Result<()> {
    let (addr, seen) = stub().await?;

    client(addr)?
        .answer_callback("cb-7", Some("Aposta excluída"), true)
        .await?;

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    let (path, payload) = &seen[0];
    assert!(path.to_lowercase().ends_with("/answercallbackquery"), "{path}");
    assert!(path.contains(TOKEN));
    assert_eq!(payload["callback_query_id"], "cb-7");
    assert_eq!(payload["text"], "Aposta excluída");
    assert_eq!(payload["show_alert"], true);
    Ok(())
}

#[tokio::test]
async fn test_files_are_fetched_from_configured_server() -> Result<()> {
    let (addr, _seen) = stub().await?;
    let client = client(addr)?;

    let url = client.file_url("photos/a.jpg");
    assert_eq!(url, format!("http://{addr}/file/bot{TOKEN}/photos/a.jpg"));
    assert_eq!(client.download_file("photos/a.jpg").await?, b"ticket-bytes".to_vec());
    Ok(())
}
