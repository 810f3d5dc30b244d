//! # Webhook Gateway
//!
//! HTTP surface of the bot built on `axum`:
//! - `POST /api/telegram/webhook`: Telegram updates, acknowledged before any
//!   work is done
//! - `POST /api/telegram/sync`: re-render a bet message after an edit made
//!   through the REST API
//! - `GET /health`

use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::accounts::AccountLinker;
use crate::bets::BetLifecycle;
use crate::bot::{
    CallbackDispatcher, ChatPlatform, InboundUpdate, MessageController, UpdateRouter, WireUpdate,
};
use crate::config::Config;
use crate::dedup::UpdateDeduplicator;
use crate::errors::BetError;
use crate::storage_traits::{AccountStore, BetStore};
use crate::tasks::BackgroundTasks;
use crate::ticket::{TicketExtractor, TicketPipeline, TicketSource};

pub const SECRET_HEADER: &str = "x-telegram-bot-api-secret-token";
const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

/// Shared state of the HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub router: UpdateRouter,
    pub bets: BetLifecycle,
    pub messages: MessageController,
    pub tasks: BackgroundTasks,
    pub dedup: Arc<UpdateDeduplicator>,
    pub webhook_secret: Option<String>,
}

impl AppState {
    /// Wire every component from its collaborators
    pub fn new(
        config: &Config,
        chat: Arc<dyn ChatPlatform>,
        account_store: Arc<dyn AccountStore>,
        bet_store: Arc<dyn BetStore>,
        source: Arc<dyn TicketSource>,
        extractor: Arc<dyn TicketExtractor>,
        cancel: CancellationToken,
    ) -> Self {
        let accounts = AccountLinker::new(account_store);
        let bets = BetLifecycle::new(bet_store);
        let messages = MessageController::new(Arc::clone(&chat), config.delivery.clone());
        let pipeline = TicketPipeline::new(source, extractor);
        let callbacks = CallbackDispatcher::new(chat, accounts.clone(), bets.clone(), messages.clone());
        let router = UpdateRouter::new(accounts, bets.clone(), pipeline, messages.clone(), callbacks);

        Self {
            router,
            bets,
            messages,
            tasks: BackgroundTasks::new(config.max_concurrent_pipelines, cancel),
            dedup: Arc::new(UpdateDeduplicator::new(config.dedup_window)),
            webhook_secret: config.webhook_secret.clone(),
        }
    }

    fn secret_matches(&self, headers: &HeaderMap) -> bool {
        let Some(expected) = &self.webhook_secret else {
            return true;
        };
        headers
            .get(SECRET_HEADER)
            .is_some_and(|value| value.as_bytes() == expected.as_bytes())
    }
}

type JsonResponse = (StatusCode, Json<Value>);

fn ok() -> JsonResponse {
    (StatusCode::OK, Json(json!({ "ok": true })))
}

fn failure(status: StatusCode, message: &str) -> JsonResponse {
    (status, Json(json!({ "error": message })))
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/telegram/webhook", post(telegram_webhook))
        .route("/api/telegram/sync", post(sync_bet_message))
        .route("/health", get(health))
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn telegram_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> JsonResponse {
    if !state.secret_matches(&headers) {
        warn!("Webhook call with a missing or wrong secret token");
        return failure(StatusCode::FORBIDDEN, "invalid secret token");
    }

    let wire: WireUpdate = match serde_json::from_slice(&body) {
        Ok(wire) => wire,
        Err(e) => {
            warn!(error = %e, "Dropping unparseable webhook payload");
            return ok();
        }
    };

    if !state.dedup.first_delivery(wire.update_id) {
        info!(update_id = wire.update_id, "Duplicate webhook delivery dropped");
        return ok();
    }

    let update = wire.classify();
    if update == InboundUpdate::Unknown {
        debug!(update_id = wire.update_id, "Ignoring unsupported update");
        return ok();
    }

    let router = state.router.clone();
    state.tasks.spawn(wire.update_id, async move {
        router.route(update).await;
    });
    ok()
}

/// Body of the status-resync call
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRequest {
    pub bet_id: i64,
    pub message_id: i32,
    pub chat_id: i64,
}

async fn sync_bet_message(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<SyncRequest>, JsonRejection>,
) -> JsonResponse {
    if !state.secret_matches(&headers) {
        return failure(StatusCode::FORBIDDEN, "invalid secret token");
    }
    let Json(request) = match body {
        Ok(body) => body,
        Err(e) => {
            debug!(error = %e, "Rejected sync request body");
            return failure(StatusCode::BAD_REQUEST, "invalid request body");
        }
    };

    let bet = match state.bets.find(request.bet_id).await {
        Ok(bet) => bet,
        Err(BetError::NotFound(_)) => return failure(StatusCode::NOT_FOUND, "bet not found"),
        Err(e) => {
            error!(bet_id = request.bet_id, error = %e, "Bet lookup failed during sync");
            return failure(StatusCode::INTERNAL_SERVER_ERROR, "internal error");
        }
    };

    match state
        .messages
        .resync(request.chat_id, request.message_id, &bet)
        .await
    {
        Ok(_) => {
            info!(bet_id = bet.id, chat_id = request.chat_id, "Bet message resynced");
            ok()
        }
        Err(e) => {
            warn!(bet_id = bet.id, error = %e, "Failed to resync bet message");
            failure(StatusCode::BAD_GATEWAY, "chat update failed")
        }
    }
}

async fn shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Ctrl-C received"),
        _ = terminate => info!("SIGTERM received"),
        _ = cancel.cancelled() => info!("Shutdown requested"),
    }
    cancel.cancel();
}

/// Serve until a shutdown signal, then stop background work
pub async fn serve(bind_addr: &str, state: AppState, cancel: CancellationToken) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    info!(addr = %bind_addr, "Webhook server listening");

    let tasks = state.tasks.clone();
    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal(cancel))
        .await?;

    tasks.shutdown(SHUTDOWN_GRACE).await;
    info!("Webhook server stopped");
    Ok(())
}
