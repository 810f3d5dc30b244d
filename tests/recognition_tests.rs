//! Recognition client against a local stand-in for the microservice.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use bankroll_bot::config::RecognitionConfig;
use bankroll_bot::errors::{ErrorKind, ExtractionError};
use bankroll_bot::testkit::StaticSource;
use bankroll_bot::ticket::recognition::{RecognitionClient, EXTRACT_PATH};
use bankroll_bot::ticket::{ResolvedFile, TicketExtractor, TicketImage};
use serde_json::{json, Value};

const IMAGE_URL: &str = "https://files.test/photos/ticket.jpg";

#[derive(Clone, Copy)]
enum Reply {
    Ticket,
    ServerError,
    NotJson,
    Slow,
}

#[derive(Clone)]
struct Service {
    reply: Reply,
    hits: Arc<AtomicUsize>,
    bodies: Arc<Mutex<Vec<Value>>>,
}

async fn extract(State(service): State<Service>, Json(body): Json<Value>) -> Response {
    service.hits.fetch_add(1, Ordering::SeqCst);
    service.bodies.lock().unwrap().push(body);
    match service.reply {
        Reply::Ticket => Json(json!({"data": {"esporte": "soccer", "evento": "A vs B", "odd": 1.8}}))
            .into_response(),
        Reply::ServerError => (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response(),
        Reply::NotJson => "definitely not json".into_response(),
        Reply::Slow => {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Json(json!({})).into_response()
        }
    }
}

async fn start(reply: Reply) -> Result<(SocketAddr, Service)> {
    let service = Service {
        reply,
        hits: Arc::default(),
        bodies: Arc::default(),
    };
    let app = Router::new()
        .route(EXTRACT_PATH, post(extract))
        .with_state(service.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok((addr, service))
}

fn client(addr: SocketAddr, threshold: u32) -> RecognitionClient {
    let config = RecognitionConfig {
        base_url: Some(format!("http://{addr}")),
        timeout_secs: 1,
        circuit_breaker_threshold: threshold,
        circuit_breaker_reset_secs: 60,
    };
    RecognitionClient::new(&format!("http://{addr}/"), config)
}

fn image() -> TicketImage {
    TicketImage::new(
        ResolvedFile {
            path: "photos/ticket.jpg".to_string(),
            url: IMAGE_URL.to_string(),
        },
        Arc::new(StaticSource::new(b"image".to_vec())),
    )
}

#[tokio::test]
async fn test_ticket_returned_for_image_url() -> Result<()> {
    let (addr, service) = start(Reply::Ticket).await?;

    let ticket = client(addr, 5).extract(&image()).await?;

    assert_eq!(ticket.esporte.as_deref(), Some("soccer"));
    assert_eq!(ticket.odd, Some(1.8));
    assert_eq!(service.bodies.lock().unwrap()[0], json!({"imageUrl": IMAGE_URL}));
    Ok(())
}

#[tokio::test]
async fn test_non_success_status_fails_attempt() -> Result<()> {
    let (addr, service) = start(Reply::ServerError).await?;

    let err = client(addr, 5).extract(&image()).await.unwrap_err();

    assert!(matches!(err, ExtractionError::Upstream { ref reason, .. } if reason.contains("500")));
    assert_eq!(err.kind(), ErrorKind::UpstreamFailure);
    assert_eq!(service.hits.load(Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test]
async fn test_unreadable_body_is_malformed() -> Result<()> {
    let (addr, _service) = start(Reply::NotJson).await?;

    let err = client(addr, 5).extract(&image()).await.unwrap_err();

    assert!(matches!(err, ExtractionError::Malformed { .. }));
    Ok(())
}

#[tokio::test]
async fn test_slow_service_times_out() -> Result<()> {
    let (addr, _service) = start(Reply::Slow).await?;

    let err = client(addr, 5).extract(&image()).await.unwrap_err();

    assert!(matches!(err, ExtractionError::Timeout { secs: 1, .. }));
    assert_eq!(err.kind(), ErrorKind::UpstreamTimeout);
    Ok(())
}

#[tokio::test]
async fn test_breaker_opens_after_threshold() -> Result<()> {
    let (addr, service) = start(Reply::ServerError).await?;
    let client = client(addr, 2);

    for _ in 0..2 {
        assert!(matches!(
            client.extract(&image()).await,
            Err(ExtractionError::Upstream { .. })
        ));
    }

    let err = client.extract(&image()).await.unwrap_err();
    assert!(matches!(err, ExtractionError::CircuitOpen { .. }));
    assert_eq!(err.kind(), ErrorKind::UpstreamFailure);
    assert_eq!(service.hits.load(Ordering::SeqCst), 2);
    Ok(())
}
