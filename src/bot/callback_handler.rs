//! Callback Action Dispatcher
//!
//! Routes inline-button presses on bet messages. Every route re-checks that
//! the presser is linked and owns the referenced bet before acting, and
//! every route ends by answering the callback query so the client clears
//! its loading indicator.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use super::callback_data::{CallbackAction, Effect, MessageState};
use super::client::ChatPlatform;
use super::message_controller::{EditOffer, MessageController};
use super::updates::IncomingCallback;
use crate::accounts::AccountLinker;
use crate::bets::BetLifecycle;
use crate::errors::BetError;
use crate::localization::{t, t_args};

/// Answer sent back for a callback query
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CallbackReply {
    pub text: Option<String>,
    pub show_alert: bool,
}

impl CallbackReply {
    fn silent() -> Self {
        Self::default()
    }

    fn toast(text: String) -> Self {
        Self {
            text: Some(text),
            show_alert: false,
        }
    }

    fn alert(key: &str) -> Self {
        Self {
            text: Some(t(key)),
            show_alert: true,
        }
    }
}

#[derive(Clone)]
pub struct CallbackDispatcher {
    chat: Arc<dyn ChatPlatform>,
    accounts: AccountLinker,
    bets: BetLifecycle,
    messages: MessageController,
}

impl CallbackDispatcher {
    pub fn new(
        chat: Arc<dyn ChatPlatform>,
        accounts: AccountLinker,
        bets: BetLifecycle,
        messages: MessageController,
    ) -> Self {
        Self {
            chat,
            accounts,
            bets,
            messages,
        }
    }

    /// Handle a callback query and answer it
    pub async fn handle(&self, callback: &IncomingCallback) -> CallbackReply {
        debug!(chat_user_id = callback.chat_user_id, data = %callback.data, "Received callback query");

        let reply = self.dispatch(callback).await;

        if let Err(e) = self
            .chat
            .answer_callback(&callback.id, reply.text.as_deref(), reply.show_alert)
            .await
        {
            warn!(callback_id = %callback.id, error = %e, "Failed to answer callback query");
        }
        reply
    }

    async fn dispatch(&self, callback: &IncomingCallback) -> CallbackReply {
        let Some(action) = CallbackAction::parse(&callback.data) else {
            warn!(data = %callback.data, "Unrecognized callback payload");
            return CallbackReply::alert("callback-invalid");
        };

        let identity = match self.accounts.resolve(callback.chat_user_id).await {
            Ok(Some(identity)) => identity,
            Ok(None) => return CallbackReply::alert("callback-not-linked"),
            Err(e) => {
                error!(chat_user_id = callback.chat_user_id, error = %e, "Identity lookup failed");
                return CallbackReply::alert("callback-error");
            }
        };
        let account_id = identity.account_id.as_str();
        let bet_id = action.bet_id();

        let bet = match self.bets.get(bet_id, account_id).await {
            Ok(bet) => bet,
            Err(BetError::NotFound(_)) => return CallbackReply::alert("callback-not-found"),
            Err(e) => {
                error!(bet_id, error = %e, "Bet lookup failed");
                return CallbackReply::alert("callback-error");
            }
        };

        let shown = callback.keyboard.unwrap_or_else(|| action.source_view());
        let Some(transition) = MessageState::Presented(shown).step(&action) else {
            debug!(bet_id, action = ?action, shown = ?shown, "Button does not belong to the keyboard on screen");
            return CallbackReply::alert("callback-stale");
        };
        debug!(bet_id, action = ?action, next = ?transition.next, "Dispatching callback action");

        match transition.effect {
            Effect::DeleteBet => {
                if let Err(e) = self.bets.delete(bet_id, account_id).await {
                    error!(bet_id, error = %e, "Failed to delete bet");
                    return CallbackReply::alert("callback-error");
                }
                if let Some((chat_id, message_id)) = callback.message {
                    if let Err(e) = self.messages.mark_deleted(chat_id, message_id, bet_id).await {
                        warn!(chat_id, message_id, error = %e, "Failed to rewrite deleted bet message");
                    }
                }
                CallbackReply::toast(t("callback-deleted"))
            }
            Effect::OfferEditor => {
                let chat_id = callback
                    .message
                    .map_or(callback.chat_user_id, |(chat_id, _)| chat_id);
                let message_id = callback.message.map(|(_, message_id)| message_id);
                match self
                    .messages
                    .offer_edit(chat_id, message_id, callback.is_private, bet_id)
                    .await
                {
                    Ok(EditOffer::Unavailable) => CallbackReply::alert("edit-unavailable"),
                    Ok(offer) => {
                        debug!(bet_id, offer = ?offer, "Editor offered");
                        CallbackReply::silent()
                    }
                    Err(e) => {
                        warn!(bet_id, error = %e, "Failed to offer editor");
                        CallbackReply::alert("callback-error")
                    }
                }
            }
            Effect::ShowStatusMenu => {
                let Some((chat_id, message_id)) = callback.message else {
                    return CallbackReply::alert("callback-error");
                };
                match self.messages.show_status_menu(chat_id, message_id, bet_id).await {
                    Ok(_) => CallbackReply::silent(),
                    Err(e) => {
                        warn!(chat_id, message_id, error = %e, "Failed to open status menu");
                        CallbackReply::alert("callback-error")
                    }
                }
            }
            Effect::ApplyStatus(status) => {
                let updated = match self.bets.update_status(bet_id, status, account_id).await {
                    Ok(updated) => updated,
                    Err(e) => {
                        error!(bet_id, error = %e, "Failed to update bet status");
                        return CallbackReply::alert("callback-error");
                    }
                };
                if let Some((chat_id, message_id)) = callback.message {
                    if let Err(e) = self
                        .messages
                        .apply_status_choice(chat_id, message_id, callback.is_private, &updated)
                        .await
                    {
                        warn!(chat_id, message_id, error = %e, "Failed to re-render bet message");
                    }
                }
                info!(bet_id, status = %status, "Status changed from chat");
                CallbackReply::toast(t_args(
                    "callback-status-updated",
                    &[("status", status.as_str())],
                ))
            }
            Effect::RestorePrimary => {
                let Some((chat_id, message_id)) = callback.message else {
                    return CallbackReply::silent();
                };
                if let Err(e) = self
                    .messages
                    .restore_primary(chat_id, message_id, callback.is_private, bet.id)
                    .await
                {
                    warn!(chat_id, message_id, error = %e, "Failed to restore primary keyboard");
                    return CallbackReply::alert("callback-error");
                }
                CallbackReply::silent()
            }
        }
    }
}
