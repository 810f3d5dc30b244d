//! Update Router
//!
//! Dispatches a classified update: commands to the account linker, images
//! to the ticket pipeline and callback queries to the dispatcher.

use tracing::{debug, error, info, warn};

use super::callback_handler::CallbackDispatcher;
use super::message_controller::MessageController;
use super::updates::{Command, InboundUpdate, IncomingMessage, MessageContent};
use crate::accounts::{normalize_account_id, AccountLinker, LinkOutcome};
use crate::bets::BetLifecycle;
use crate::errors::{ErrorKind, LinkError};
use crate::localization::{t, t_args};
use crate::ticket::TicketPipeline;

#[derive(Clone)]
pub struct UpdateRouter {
    accounts: AccountLinker,
    bets: BetLifecycle,
    pipeline: TicketPipeline,
    messages: MessageController,
    callbacks: CallbackDispatcher,
}

impl UpdateRouter {
    pub fn new(
        accounts: AccountLinker,
        bets: BetLifecycle,
        pipeline: TicketPipeline,
        messages: MessageController,
        callbacks: CallbackDispatcher,
    ) -> Self {
        Self {
            accounts,
            bets,
            pipeline,
            messages,
            callbacks,
        }
    }

    pub async fn route(&self, update: InboundUpdate) {
        match update {
            InboundUpdate::Message(message) => self.handle_message(message).await,
            InboundUpdate::CallbackQuery(callback) => {
                self.callbacks.handle(&callback).await;
            }
            InboundUpdate::Unknown => debug!("Ignoring unsupported update type"),
        }
    }

    async fn handle_message(&self, message: IncomingMessage) {
        match &message.content {
            MessageContent::Command(command) => self.handle_command(&message, command).await,
            MessageContent::Image { file_id, caption } => {
                self.handle_ticket(&message, file_id, caption.as_deref()).await
            }
            MessageContent::Text(_) if message.is_private => {
                self.messages.notify(message.chat_id, &t("help")).await
            }
            MessageContent::Text(_) | MessageContent::Other => {
                debug!(chat_id = message.chat_id, "Ignoring message without a ticket or command")
            }
        }
    }

    async fn handle_command(&self, message: &IncomingMessage, command: &Command) {
        let chat_id = message.chat_id;
        let reply = match command {
            Command::Start(None) => match self.accounts.resolve(message.chat_user_id).await {
                Ok(Some(identity)) => t_args("start-linked", &[("account", &identity.account_id)]),
                Ok(None) => t("start-unlinked"),
                Err(e) => {
                    warn!(chat_id, error = %e, "Identity lookup failed on /start");
                    t("start-unlinked")
                }
            },
            Command::Start(Some(account_id)) | Command::Link(Some(account_id)) => {
                self.link(message, account_id).await
            }
            Command::Link(None) => t("link-missing-id"),
            Command::Support(id) => {
                info!(chat_id, support_id = %id, "Support contact requested");
                t_args("support-contact", &[("id", id)])
            }
            Command::Unlink => match self.accounts.unlink(message.chat_user_id).await {
                Ok(()) => t("unlink-success"),
                Err(LinkError::NoBindingFound(_)) => t("unlink-none"),
                Err(e) => {
                    error!(chat_id, error = %e, "Unlink failed");
                    t("unlink-error")
                }
            },
            Command::Help => t("help"),
        };
        self.messages.notify(chat_id, &reply).await;
    }

    async fn link(&self, message: &IncomingMessage, raw_account_id: &str) -> String {
        let shown = normalize_account_id(raw_account_id).unwrap_or_else(|| raw_account_id.to_string());
        let result = self
            .accounts
            .link(raw_account_id, message.chat_user_id, message.username.as_deref())
            .await;

        match result {
            Ok(LinkOutcome::Linked) => t_args("link-success", &[("account", &shown)]),
            Ok(LinkOutcome::AlreadyLinked) => t_args("link-already", &[("account", &shown)]),
            Err(LinkError::InvalidAccountId) => t("link-invalid-id"),
            Err(LinkError::AccountNotFound(account)) => {
                t_args("link-account-not-found", &[("account", &account)])
            }
            Err(LinkError::ChatAlreadyLinked { .. }) => t("link-chat-taken"),
            Err(LinkError::AccountAlreadyLinked { .. }) => t("link-account-taken"),
            Err(e) => {
                error!(chat_id = message.chat_id, error = %e, "Link failed");
                t("link-error")
            }
        }
    }

    /// Image → draft → bet → chat message
    async fn handle_ticket(&self, message: &IncomingMessage, file_id: &str, caption: Option<&str>) {
        let chat_id = message.chat_id;

        let identity = match self.accounts.resolve(message.chat_user_id).await {
            Ok(Some(identity)) => identity,
            Ok(None) => {
                info!(chat_id, "Ticket from an unlinked chat user");
                return self.messages.notify(chat_id, &t("not-linked")).await;
            }
            Err(e) => {
                error!(chat_id, error = %e, "Identity lookup failed");
                return self.messages.notify(chat_id, &t("ticket-save-failed")).await;
            }
        };

        let bankroll_id = match self.accounts.default_bankroll(&identity.account_id).await {
            Ok(Some(id)) => id,
            Ok(None) => return self.messages.notify(chat_id, &t("no-bankroll")).await,
            Err(e) => {
                error!(chat_id, error = %e, "Bankroll lookup failed");
                return self.messages.notify(chat_id, &t("ticket-save-failed")).await;
            }
        };

        let placeholder = self.messages.send_placeholder(chat_id).await;

        let draft = match self.pipeline.process(file_id, caption).await {
            Ok(draft) => draft,
            Err(e) => {
                error!(chat_id, file_id, error = %e, "Ticket extraction failed");
                let key = match e.kind() {
                    ErrorKind::UpstreamTimeout => "ticket-timeout",
                    _ => "ticket-failed",
                };
                return self.messages.report_failure(chat_id, placeholder, &t(key)).await;
            }
        };

        let bet = match self.bets.create(&draft, bankroll_id).await {
            Ok(bet) => bet,
            Err(e) => {
                error!(chat_id, bankroll_id, error = %e, "Failed to persist bet");
                return self
                    .messages
                    .report_failure(chat_id, placeholder, &t("ticket-save-failed"))
                    .await;
            }
        };
        info!(chat_id, bet_id = bet.id, account_id = %identity.account_id, "Bet created from ticket");

        // Delivery failures are logged inside the controller
        let _ = self
            .messages
            .present_bet(chat_id, message.is_private, &bet, placeholder)
            .await;
    }
}
