//! Storage seams consumed by the account linker and the bet lifecycle.
//!
//! Accounts, bankrolls and bets are owned by the REST CRUD layer; this
//! subsystem only needs the narrow operations below.

use async_trait::async_trait;

use crate::errors::StoreError;
use crate::models::{Bet, ChatIdentity, NewBet, SettlementStatus};

/// Trait for account and chat identity storage operations
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Whether an account with this id exists
    async fn account_exists(&self, account_id: &str) -> Result<bool, StoreError>;

    /// Binding for a chat user, if any
    async fn identity_by_chat_user(
        &self,
        chat_user_id: i64,
    ) -> Result<Option<ChatIdentity>, StoreError>;

    /// Binding for an account, if any
    async fn identity_by_account(
        &self,
        account_id: &str,
    ) -> Result<Option<ChatIdentity>, StoreError>;

    /// Write a binding; the store rejects a second binding for either side
    async fn bind_identity(&self, identity: &ChatIdentity) -> Result<(), StoreError>;

    /// Remove the binding of a chat user; returns whether one existed
    async fn unbind_chat_user(&self, chat_user_id: i64) -> Result<bool, StoreError>;

    /// Oldest bankroll of the account, used for bets created from tickets
    async fn default_bankroll(&self, account_id: &str) -> Result<Option<i64>, StoreError>;
}

/// Trait for bet storage operations
#[async_trait]
pub trait BetStore: Send + Sync {
    async fn insert_bet(&self, bet: &NewBet) -> Result<Bet, StoreError>;

    /// A bet together with the id of the account owning its bankroll
    async fn find_bet_with_owner(&self, bet_id: i64) -> Result<Option<(Bet, String)>, StoreError>;

    async fn update_bet_status(
        &self,
        bet_id: i64,
        status: SettlementStatus,
        obtained_return: Option<f64>,
    ) -> Result<Option<Bet>, StoreError>;

    /// Returns whether a row was deleted
    async fn delete_bet(&self, bet_id: i64) -> Result<bool, StoreError>;
}
