//! Chat Platform Client
//!
//! The narrow set of Telegram Bot API calls this bot needs, behind a trait
//! so controllers and tests can swap the transport.

use async_trait::async_trait;
use reqwest::{Client, Url};
use teloxide::prelude::*;
use teloxide::types::{CallbackQueryId, FileId, InlineKeyboardMarkup, MessageId};
use teloxide::{ApiError, RequestError};
use tracing::{debug, warn};

use crate::errors::ChatError;

#[async_trait]
pub trait ChatPlatform: Send + Sync {
    /// Send a message and return its id
    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: Option<InlineKeyboardMarkup>,
    ) -> Result<i32, ChatError>;

    /// Replace the text (and optionally the keyboard) of a message
    async fn edit_message_text(
        &self,
        chat_id: i64,
        message_id: i32,
        text: &str,
        keyboard: Option<InlineKeyboardMarkup>,
    ) -> Result<(), ChatError>;

    /// Replace only the inline keyboard of a message
    async fn edit_message_keyboard(
        &self,
        chat_id: i64,
        message_id: i32,
        keyboard: InlineKeyboardMarkup,
    ) -> Result<(), ChatError>;

    async fn delete_message(&self, chat_id: i64, message_id: i32) -> Result<(), ChatError>;

    /// Acknowledge a callback query, optionally with a toast or alert
    async fn answer_callback(
        &self,
        callback_id: &str,
        text: Option<&str>,
        show_alert: bool,
    ) -> Result<(), ChatError>;

    /// Resolve a file reference to its retrieval path
    async fn get_file(&self, file_id: &str) -> Result<String, ChatError>;

    /// Public URL of a resolved file path
    fn file_url(&self, path: &str) -> String;

    async fn download_file(&self, path: &str) -> Result<Vec<u8>, ChatError>;
}

fn map_request_error(err: RequestError) -> ChatError {
    match err {
        RequestError::Network(e) => ChatError::Network(e.to_string()),
        RequestError::Io(e) => ChatError::Network(e.to_string()),
        other => ChatError::Api(other.to_string()),
    }
}

/// Edits that change nothing are rejected by Telegram; the target state holds
fn ignore_not_modified(result: Result<(), RequestError>) -> Result<(), ChatError> {
    match result {
        Err(RequestError::Api(ApiError::MessageNotModified)) => {
            debug!("Message not modified, treating edit as applied");
            Ok(())
        }
        other => other.map_err(map_request_error),
    }
}

/// Telegram Bot API client built on `teloxide`
#[derive(Clone)]
pub struct TelegramClient {
    bot: Bot,
    http: Client,
}

impl TelegramClient {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            bot: Bot::new(token),
            http: Client::new(),
        }
    }

    /// Point the client at another Bot API server (self-hosted or a stub)
    pub fn with_api_url(mut self, api_url: Url) -> Self {
        self.bot = self.bot.set_api_url(api_url);
        self
    }
}

#[async_trait]
impl ChatPlatform for TelegramClient {
    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: Option<InlineKeyboardMarkup>,
    ) -> Result<i32, ChatError> {
        let mut request = self.bot.send_message(ChatId(chat_id), text);
        if let Some(keyboard) = keyboard {
            request = request.reply_markup(keyboard);
        }
        let message = request.await.map_err(map_request_error)?;
        Ok(message.id.0)
    }

    async fn edit_message_text(
        &self,
        chat_id: i64,
        message_id: i32,
        text: &str,
        keyboard: Option<InlineKeyboardMarkup>,
    ) -> Result<(), ChatError> {
        let mut request = self
            .bot
            .edit_message_text(ChatId(chat_id), MessageId(message_id), text);
        if let Some(keyboard) = keyboard {
            request = request.reply_markup(keyboard);
        }
        ignore_not_modified(request.await.map(|_| ()))
    }

    async fn edit_message_keyboard(
        &self,
        chat_id: i64,
        message_id: i32,
        keyboard: InlineKeyboardMarkup,
    ) -> Result<(), ChatError> {
        let result = self
            .bot
            .edit_message_reply_markup(ChatId(chat_id), MessageId(message_id))
            .reply_markup(keyboard)
            .await;
        ignore_not_modified(result.map(|_| ()))
    }

    async fn delete_message(&self, chat_id: i64, message_id: i32) -> Result<(), ChatError> {
        self.bot
            .delete_message(ChatId(chat_id), MessageId(message_id))
            .await
            .map(|_| ())
            .map_err(map_request_error)
    }

    async fn answer_callback(
        &self,
        callback_id: &str,
        text: Option<&str>,
        show_alert: bool,
    ) -> Result<(), ChatError> {
        let mut request = self
            .bot
            .answer_callback_query(CallbackQueryId(callback_id.to_string()));
        if let Some(text) = text {
            request = request.text(text).show_alert(show_alert);
        }
        request.await.map(|_| ()).map_err(map_request_error)
    }

    async fn get_file(&self, file_id: &str) -> Result<String, ChatError> {
        let file = self
            .bot
            .get_file(FileId(file_id.to_string()))
            .await
            .map_err(map_request_error)?;
        Ok(file.path)
    }

    fn file_url(&self, path: &str) -> String {
        let api_url = self.bot.api_url();
        format!(
            "{}/file/bot{}/{}",
            api_url.as_str().trim_end_matches('/'),
            self.bot.token(),
            path
        )
    }

    async fn download_file(&self, path: &str) -> Result<Vec<u8>, ChatError> {
        let response = self
            .http
            .get(self.file_url(path))
            .send()
            .await
            .map_err(|e| ChatError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "File download rejected");
            return Err(ChatError::Api(format!("file download returned HTTP {}", status.as_u16())));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ChatError::Network(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}
