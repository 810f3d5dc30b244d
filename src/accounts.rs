//! # Account Linker
//!
//! Binds a chat platform user to an internal account. The binding is 1:1
//! in both directions and is enforced here at link time (and by a unique
//! constraint in the store).

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::errors::{LinkError, StoreError};
use crate::models::ChatIdentity;
use crate::storage_traits::AccountStore;

/// Result of a successful link request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkOutcome {
    Linked,
    /// The exact pair was already bound; nothing changed
    AlreadyLinked,
}

/// Reduce a user-typed account id to its canonical form
///
/// Keeps ASCII letters, digits, `-` and `_`, lowercased. Returns `None`
/// when nothing survives.
pub fn normalize_account_id(raw: &str) -> Option<String> {
    let normalized: String = raw
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .map(|c| c.to_ascii_lowercase())
        .collect();

    if normalized.is_empty() {
        None
    } else {
        Some(normalized)
    }
}

#[derive(Clone)]
pub struct AccountLinker {
    store: Arc<dyn AccountStore>,
}

impl AccountLinker {
    pub fn new(store: Arc<dyn AccountStore>) -> Self {
        Self { store }
    }

    /// Bind `chat_user_id` to the account named by `account_id`
    pub async fn link(
        &self,
        account_id: &str,
        chat_user_id: i64,
        chat_username: Option<&str>,
    ) -> Result<LinkOutcome, LinkError> {
        let account_id = normalize_account_id(account_id).ok_or(LinkError::InvalidAccountId)?;

        if !self.store.account_exists(&account_id).await? {
            return Err(LinkError::AccountNotFound(account_id));
        }

        let by_chat = self.store.identity_by_chat_user(chat_user_id).await?;
        if let Some(existing) = &by_chat {
            if existing.account_id != account_id {
                warn!(chat_user_id, account_id = %account_id, "Chat user already linked to another account");
                return Err(LinkError::ChatAlreadyLinked { chat_user_id });
            }
        }

        let by_account = self.store.identity_by_account(&account_id).await?;
        if let Some(existing) = &by_account {
            if existing.chat_user_id != chat_user_id {
                warn!(chat_user_id, account_id = %account_id, "Account already linked to another chat user");
                return Err(LinkError::AccountAlreadyLinked { account_id });
            }
        }

        if by_chat.is_some() {
            debug!(chat_user_id, account_id = %account_id, "Identical link requested again");
            return Ok(LinkOutcome::AlreadyLinked);
        }

        let identity = ChatIdentity {
            chat_user_id,
            account_id: account_id.clone(),
            username: chat_username.map(str::to_string),
        };
        match self.store.bind_identity(&identity).await {
            Ok(()) => {
                info!(chat_user_id, account_id = %account_id, "Chat identity linked");
                Ok(LinkOutcome::Linked)
            }
            // Lost a race against a concurrent link of either side
            Err(StoreError::Conflict(_)) => Err(LinkError::ChatAlreadyLinked { chat_user_id }),
            Err(StoreError::AccountTaken(account_id)) => {
                warn!(chat_user_id, account_id = %account_id, "Account linked concurrently by another chat user");
                Err(LinkError::AccountAlreadyLinked { account_id })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Remove the binding of a chat user
    pub async fn unlink(&self, chat_user_id: i64) -> Result<(), LinkError> {
        if self.store.unbind_chat_user(chat_user_id).await? {
            info!(chat_user_id, "Chat identity unlinked");
            Ok(())
        } else {
            Err(LinkError::NoBindingFound(chat_user_id))
        }
    }

    /// Account bound to a chat user, if any
    pub async fn resolve(&self, chat_user_id: i64) -> Result<Option<ChatIdentity>, StoreError> {
        self.store.identity_by_chat_user(chat_user_id).await
    }

    /// Bankroll new ticket bets are attributed to
    pub async fn default_bankroll(&self, account_id: &str) -> Result<Option<i64>, StoreError> {
        self.store.default_bankroll(account_id).await
    }
}
