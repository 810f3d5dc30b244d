use std::sync::Arc;

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use tokio_util::sync::CancellationToken;
use tracing::info;

use bankroll_bot::bot::{ChatPlatform, TelegramClient};
use bankroll_bot::config::Config;
use bankroll_bot::db::{init_database_schema, PgStore};
use bankroll_bot::logging::init_tracing;
use bankroll_bot::server::{serve, AppState};
use bankroll_bot::ticket::{build_extractor, PlatformTicketSource};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    let config = Config::from_env().context("Failed to load configuration")?;
    init_tracing(config.json_logs).context("Failed to initialize logging")?;

    info!("Starting Bankroll Telegram Bot");

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to the database")?;
    init_database_schema(&pool).await?;

    let store = Arc::new(PgStore::new(pool));
    let mut telegram = TelegramClient::new(config.telegram_bot_token.clone());
    if let Some(api_url) = &config.telegram_api_url {
        let api_url = reqwest::Url::parse(api_url).context("Invalid TELEGRAM_API_URL")?;
        telegram = telegram.with_api_url(api_url);
    }
    let chat: Arc<dyn ChatPlatform> = Arc::new(telegram);
    let source = Arc::new(PlatformTicketSource::new(Arc::clone(&chat)));
    let extractor = build_extractor(&config);

    let cancel = CancellationToken::new();
    let state = AppState::new(
        &config,
        chat,
        store.clone(),
        store,
        source,
        extractor,
        cancel.clone(),
    );

    serve(&config.bind_addr, state, cancel).await?;
    Ok(())
}
