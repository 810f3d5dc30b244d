//! # Interactive Message Controller
//!
//! Owns the chat message that represents a bet: the transient placeholder,
//! the summary with its keyboard, the `Primary ⇄ StatusMenu` swaps and the
//! terminal "deleted" notice.
//!
//! Delivery policy for a new bet message: send, retry once after a fixed
//! backoff, degrade to text-only, and finally rewrite the placeholder with
//! a minimal summary, so the user always ends up with a message naming the
//! bet id.

use std::sync::Arc;

use teloxide::types::InlineKeyboardMarkup;
use tracing::{debug, error, info, warn};

use super::callback_data::KeyboardView;
use super::client::ChatPlatform;
use super::ui_builder::{
    edit_button, empty_keyboard, format_bet_summary, format_fallback_summary, keyboard_for,
    primary_keyboard, status_menu_keyboard, EditButtonContext,
};
use crate::config::DeliveryConfig;
use crate::errors::{ChatError, DeliveryError};
use crate::localization::{t, t_args};
use crate::models::Bet;

/// A bet message currently shown in a chat
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutstandingMessage {
    pub chat_id: i64,
    pub message_id: i32,
    pub bet_id: i64,
    /// Keyboard currently attached; `None` for text-only fallbacks
    pub view: Option<KeyboardView>,
}

/// Outcome of an edit-button press
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOffer {
    /// The bet message keyboard now carries the editor link
    Upgraded,
    /// A separate message with the editor link was sent
    SentFallback,
    /// No editor is configured
    Unavailable,
}

#[derive(Clone)]
pub struct MessageController {
    chat: Arc<dyn ChatPlatform>,
    config: DeliveryConfig,
}

impl MessageController {
    pub fn new(chat: Arc<dyn ChatPlatform>, config: DeliveryConfig) -> Self {
        Self { chat, config }
    }

    fn edit_context(&self, bet_id: i64, coordinates: Option<(i64, i32)>, is_private: bool) -> EditButtonContext<'_> {
        EditButtonContext {
            bet_id,
            coordinates,
            is_private,
            webapp_base_url: self.config.webapp_base_url.as_deref(),
        }
    }

    /// Post the "processing" message; failures are logged and ignored
    pub async fn send_placeholder(&self, chat_id: i64) -> Option<i32> {
        match self.chat.send_message(chat_id, &t("ticket-processing"), None).await {
            Ok(message_id) => Some(message_id),
            Err(e) => {
                warn!(chat_id, error = %e, "Failed to send placeholder, continuing without it");
                None
            }
        }
    }

    /// Plain text reply; failures are logged and ignored
    pub async fn notify(&self, chat_id: i64, text: &str) {
        if let Err(e) = self.chat.send_message(chat_id, text, None).await {
            error!(chat_id, error = %e, "Failed to send chat message");
        }
    }

    /// Report a failed pipeline, reusing the placeholder when there is one
    pub async fn report_failure(&self, chat_id: i64, placeholder: Option<i32>, text: &str) {
        if let Some(message_id) = placeholder {
            match self.chat.edit_message_text(chat_id, message_id, text, None).await {
                Ok(()) => return,
                Err(e) => warn!(chat_id, message_id, error = %e, "Failed to edit placeholder"),
            }
        }
        self.notify(chat_id, text).await;
    }

    async fn send_with_retry(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: &InlineKeyboardMarkup,
    ) -> Result<i32, ChatError> {
        match self.chat.send_message(chat_id, text, Some(keyboard.clone())).await {
            Ok(id) => return Ok(id),
            Err(e) => warn!(chat_id, error = %e, "Send failed, retrying after backoff"),
        }
        tokio::time::sleep(self.config.retry_backoff).await;
        self.chat.send_message(chat_id, text, Some(keyboard.clone())).await
    }

    /// Deliver the summary of a freshly created bet
    pub async fn present_bet(
        &self,
        chat_id: i64,
        is_private: bool,
        bet: &Bet,
        placeholder: Option<i32>,
    ) -> Result<OutstandingMessage, DeliveryError> {
        let text = format_bet_summary(bet);
        let keyboard = primary_keyboard(&self.edit_context(bet.id, None, is_private));

        let (message_id, view) = match self.send_with_retry(chat_id, &text, &keyboard).await {
            Ok(id) => (id, Some(KeyboardView::Primary)),
            Err(e) => {
                warn!(chat_id, bet_id = bet.id, error = %e, "Retry failed, degrading to text-only");
                match self.chat.send_message(chat_id, &text, None).await {
                    Ok(id) => (id, None),
                    Err(last) => return self.fall_back_to_placeholder(chat_id, bet, placeholder, last).await,
                }
            }
        };

        if let Some(placeholder_id) = placeholder {
            if let Err(e) = self.chat.delete_message(chat_id, placeholder_id).await {
                debug!(chat_id, message_id = placeholder_id, error = %e, "Failed to delete placeholder");
            }
        }

        if view.is_some() && self.config.webapp_base_url.is_some() {
            let upgraded = primary_keyboard(&self.edit_context(bet.id, Some((chat_id, message_id)), is_private));
            if let Err(e) = self.chat.edit_message_keyboard(chat_id, message_id, upgraded).await {
                warn!(chat_id, message_id, error = %e, "Failed to attach editor link");
            }
        }

        info!(chat_id, message_id, bet_id = bet.id, "Bet message presented");
        Ok(OutstandingMessage {
            chat_id,
            message_id,
            bet_id: bet.id,
            view,
        })
    }

    async fn fall_back_to_placeholder(
        &self,
        chat_id: i64,
        bet: &Bet,
        placeholder: Option<i32>,
        last: ChatError,
    ) -> Result<OutstandingMessage, DeliveryError> {
        let Some(message_id) = placeholder else {
            error!(chat_id, bet_id = bet.id, error = %last, "Bet message could not be delivered");
            return Err(DeliveryError { bet_id: bet.id, last });
        };

        match self
            .chat
            .edit_message_text(chat_id, message_id, &format_fallback_summary(bet), None)
            .await
        {
            Ok(()) => {
                info!(chat_id, message_id, bet_id = bet.id, "Placeholder rewritten with fallback summary");
                Ok(OutstandingMessage {
                    chat_id,
                    message_id,
                    bet_id: bet.id,
                    view: None,
                })
            }
            Err(e) => {
                error!(chat_id, bet_id = bet.id, error = %e, "Bet message could not be delivered");
                Err(DeliveryError { bet_id: bet.id, last: e })
            }
        }
    }

    /// Swap the keyboard to the status list; the text is left untouched
    pub async fn show_status_menu(
        &self,
        chat_id: i64,
        message_id: i32,
        bet_id: i64,
    ) -> Result<OutstandingMessage, ChatError> {
        self.chat
            .edit_message_keyboard(chat_id, message_id, status_menu_keyboard(bet_id))
            .await?;
        Ok(OutstandingMessage {
            chat_id,
            message_id,
            bet_id,
            view: Some(KeyboardView::StatusMenu),
        })
    }

    /// Re-render the summary after a status change and restore `Primary`
    pub async fn apply_status_choice(
        &self,
        chat_id: i64,
        message_id: i32,
        is_private: bool,
        bet: &Bet,
    ) -> Result<OutstandingMessage, ChatError> {
        let keyboard = keyboard_for(
            KeyboardView::Primary,
            &self.edit_context(bet.id, Some((chat_id, message_id)), is_private),
        );
        self.chat
            .edit_message_text(chat_id, message_id, &format_bet_summary(bet), Some(keyboard))
            .await?;
        Ok(OutstandingMessage {
            chat_id,
            message_id,
            bet_id: bet.id,
            view: Some(KeyboardView::Primary),
        })
    }

    /// Back from the status list without touching the bet
    pub async fn restore_primary(
        &self,
        chat_id: i64,
        message_id: i32,
        is_private: bool,
        bet_id: i64,
    ) -> Result<OutstandingMessage, ChatError> {
        let keyboard = primary_keyboard(&self.edit_context(bet_id, Some((chat_id, message_id)), is_private));
        self.chat
            .edit_message_keyboard(chat_id, message_id, keyboard)
            .await?;
        Ok(OutstandingMessage {
            chat_id,
            message_id,
            bet_id,
            view: Some(KeyboardView::Primary),
        })
    }

    /// Rewrite the message into the terminal notice with no buttons
    pub async fn mark_deleted(
        &self,
        chat_id: i64,
        message_id: i32,
        bet_id: i64,
    ) -> Result<(), ChatError> {
        let text = t_args("bet-deleted", &[("id", &bet_id.to_string())]);
        self.chat
            .edit_message_text(chat_id, message_id, &text, Some(empty_keyboard()))
            .await
    }

    /// Offer the hosted editor for a bet
    pub async fn offer_edit(
        &self,
        chat_id: i64,
        message_id: Option<i32>,
        is_private: bool,
        bet_id: i64,
    ) -> Result<EditOffer, ChatError> {
        if self.config.webapp_base_url.is_none() {
            return Ok(EditOffer::Unavailable);
        }

        if let Some(message_id) = message_id {
            self.restore_primary(chat_id, message_id, is_private, bet_id).await?;
            return Ok(EditOffer::Upgraded);
        }

        let text = t_args("edit-fallback", &[("id", &bet_id.to_string())]);
        let fallback_id = self.chat.send_message(chat_id, &text, None).await?;
        let button = edit_button(&self.edit_context(bet_id, Some((chat_id, fallback_id)), is_private));
        self.chat
            .edit_message_keyboard(chat_id, fallback_id, InlineKeyboardMarkup::new(vec![vec![button]]))
            .await?;
        Ok(EditOffer::SentFallback)
    }

    /// Push freshly rendered text and the `Primary` keyboard into an existing message
    pub async fn resync(
        &self,
        chat_id: i64,
        message_id: i32,
        bet: &Bet,
    ) -> Result<OutstandingMessage, ChatError> {
        self.apply_status_choice(chat_id, message_id, chat_id > 0, bet).await
    }
}
