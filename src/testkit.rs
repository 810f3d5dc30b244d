//! In-memory doubles for integration tests (feature `testkit`).
//!
//! - [`MemoryStore`]: accounts, bankrolls, chat bindings and bets
//! - [`RecordingChat`]: a [`ChatPlatform`] that records every successful call
//!   and can be told to fail the next sends or edits
//! - [`StaticExtractor`] / [`StaticSource`]: canned extraction results

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicI32, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use teloxide::types::InlineKeyboardMarkup;

use crate::bot::client::ChatPlatform;
use crate::errors::{AcquisitionError, ChatError, ExtractionError, StoreError};
use crate::models::{Bet, ChatIdentity, NewBet, SettlementStatus};
use crate::storage_traits::{AccountStore, BetStore};
use crate::ticket::{RawTicket, ResolvedFile, TicketExtractor, TicketImage, TicketSource};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Debug, Default)]
struct MemoryState {
    accounts: HashMap<String, Option<ChatIdentity>>,
    bankrolls: Vec<(i64, String)>,
    bets: BTreeMap<i64, Bet>,
    next_bankroll_id: i64,
    next_bet_id: i64,
}

/// Account and bet storage kept in a mutex
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_account(&self, account_id: &str) {
        lock(&self.state).accounts.insert(account_id.to_string(), None);
    }

    /// Create a bankroll owned by `account_id` and return its id
    pub fn add_bankroll(&self, account_id: &str) -> i64 {
        let mut state = lock(&self.state);
        state.next_bankroll_id += 1;
        let id = state.next_bankroll_id;
        state.bankrolls.push((id, account_id.to_string()));
        id
    }

    /// Account with a bankroll, already bound to `chat_user_id`
    pub fn linked_account(&self, account_id: &str, chat_user_id: i64) -> i64 {
        self.add_account(account_id);
        lock(&self.state).accounts.insert(
            account_id.to_string(),
            Some(ChatIdentity {
                chat_user_id,
                account_id: account_id.to_string(),
                username: None,
            }),
        );
        self.add_bankroll(account_id)
    }

    pub fn binding(&self, account_id: &str) -> Option<ChatIdentity> {
        lock(&self.state).accounts.get(account_id).cloned().flatten()
    }

    pub fn bets(&self) -> Vec<Bet> {
        lock(&self.state).bets.values().cloned().collect()
    }

    pub fn bet(&self, bet_id: i64) -> Option<Bet> {
        lock(&self.state).bets.get(&bet_id).cloned()
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn account_exists(&self, account_id: &str) -> Result<bool, StoreError> {
        Ok(lock(&self.state).accounts.contains_key(account_id))
    }

    async fn identity_by_chat_user(
        &self,
        chat_user_id: i64,
    ) -> Result<Option<ChatIdentity>, StoreError> {
        Ok(lock(&self.state)
            .accounts
            .values()
            .flatten()
            .find(|identity| identity.chat_user_id == chat_user_id)
            .cloned())
    }

    async fn identity_by_account(
        &self,
        account_id: &str,
    ) -> Result<Option<ChatIdentity>, StoreError> {
        Ok(self.binding(account_id))
    }

    async fn bind_identity(&self, identity: &ChatIdentity) -> Result<(), StoreError> {
        let mut state = lock(&self.state);
        let taken = state
            .accounts
            .values()
            .flatten()
            .any(|existing| existing.chat_user_id == identity.chat_user_id);
        if taken {
            return Err(StoreError::Conflict(format!(
                "chat user {} already bound",
                identity.chat_user_id
            )));
        }
        let Some(slot) = state.accounts.get_mut(&identity.account_id) else {
            return Err(StoreError::Other(format!(
                "account {} does not exist",
                identity.account_id
            )));
        };
        if slot.is_some() {
            return Err(StoreError::AccountTaken(identity.account_id.clone()));
        }
        *slot = Some(identity.clone());
        Ok(())
    }

    async fn unbind_chat_user(&self, chat_user_id: i64) -> Result<bool, StoreError> {
        let mut state = lock(&self.state);
        for slot in state.accounts.values_mut() {
            if slot.as_ref().is_some_and(|i| i.chat_user_id == chat_user_id) {
                *slot = None;
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn default_bankroll(&self, account_id: &str) -> Result<Option<i64>, StoreError> {
        Ok(lock(&self.state)
            .bankrolls
            .iter()
            .find(|(_, owner)| owner == account_id)
            .map(|(id, _)| *id))
    }
}

#[async_trait]
impl BetStore for MemoryStore {
    async fn insert_bet(&self, bet: &NewBet) -> Result<Bet, StoreError> {
        let mut state = lock(&self.state);
        state.next_bet_id += 1;
        let now = Utc::now();
        let stored = Bet {
            id: state.next_bet_id,
            bankroll_id: bet.bankroll_id,
            sport: bet.sport.clone(),
            event: bet.event.clone(),
            tournament: bet.tournament.clone(),
            country: bet.country.clone(),
            market: bet.market.clone(),
            bet_type: bet.bet_type.clone(),
            stake: bet.stake,
            odds: bet.odds,
            bonus: bet.bonus,
            event_date: bet.event_date,
            tipster: bet.tipster.clone(),
            status: bet.status,
            bookmaker: bet.bookmaker.clone(),
            obtained_return: bet.obtained_return,
            selections: bet.selections.clone(),
            created_at: now,
            updated_at: now,
        };
        state.bets.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn find_bet_with_owner(&self, bet_id: i64) -> Result<Option<(Bet, String)>, StoreError> {
        let state = lock(&self.state);
        let Some(bet) = state.bets.get(&bet_id) else {
            return Ok(None);
        };
        let owner = state
            .bankrolls
            .iter()
            .find(|(id, _)| *id == bet.bankroll_id)
            .map(|(_, owner)| owner.clone())
            .unwrap_or_default();
        Ok(Some((bet.clone(), owner)))
    }

    async fn update_bet_status(
        &self,
        bet_id: i64,
        status: SettlementStatus,
        obtained_return: Option<f64>,
    ) -> Result<Option<Bet>, StoreError> {
        let mut state = lock(&self.state);
        Ok(state.bets.get_mut(&bet_id).map(|bet| {
            bet.status = status;
            bet.obtained_return = obtained_return;
            bet.updated_at = Utc::now();
            bet.clone()
        }))
    }

    async fn delete_bet(&self, bet_id: i64) -> Result<bool, StoreError> {
        Ok(lock(&self.state).bets.remove(&bet_id).is_some())
    }
}

/// A chat call that went through
#[derive(Debug, Clone, PartialEq)]
pub enum ChatCall {
    Send {
        chat_id: i64,
        message_id: i32,
        text: String,
        keyboard: Option<InlineKeyboardMarkup>,
    },
    EditText {
        chat_id: i64,
        message_id: i32,
        text: String,
        keyboard: Option<InlineKeyboardMarkup>,
    },
    EditKeyboard {
        chat_id: i64,
        message_id: i32,
        keyboard: InlineKeyboardMarkup,
    },
    Delete {
        chat_id: i64,
        message_id: i32,
    },
    AnswerCallback {
        callback_id: String,
        text: Option<String>,
        show_alert: bool,
    },
}

/// Chat double recording successful calls
#[derive(Debug)]
pub struct RecordingChat {
    calls: Mutex<Vec<ChatCall>>,
    next_message_id: AtomicI32,
    failing_sends: AtomicUsize,
    failing_edits: AtomicUsize,
    failed_attempts: AtomicUsize,
    file_bytes: Vec<u8>,
}

impl Default for RecordingChat {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingChat {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            next_message_id: AtomicI32::new(100),
            failing_sends: AtomicUsize::new(0),
            failing_edits: AtomicUsize::new(0),
            failed_attempts: AtomicUsize::new(0),
            file_bytes: b"\x89PNG\r\n\x1a\nticket".to_vec(),
        }
    }

    /// Make the next `n` send calls fail
    pub fn fail_next_sends(&self, n: usize) {
        self.failing_sends.store(n, Ordering::SeqCst);
    }

    /// Make the next `n` text or keyboard edits fail
    pub fn fail_next_edits(&self, n: usize) {
        self.failing_edits.store(n, Ordering::SeqCst);
    }

    pub fn failed_attempts(&self) -> usize {
        self.failed_attempts.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<ChatCall> {
        lock(&self.calls).clone()
    }

    pub fn sent(&self) -> Vec<ChatCall> {
        self.calls()
            .into_iter()
            .filter(|call| matches!(call, ChatCall::Send { .. }))
            .collect()
    }

    /// Texts of every sent message
    pub fn sent_texts(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                ChatCall::Send { text, .. } => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn callback_answers(&self) -> Vec<ChatCall> {
        self.calls()
            .into_iter()
            .filter(|call| matches!(call, ChatCall::AnswerCallback { .. }))
            .collect()
    }

    fn take_failure(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    fn record(&self, call: ChatCall) {
        lock(&self.calls).push(call);
    }

    fn injected_failure(&self) -> ChatError {
        self.failed_attempts.fetch_add(1, Ordering::SeqCst);
        ChatError::Network("injected failure".to_string())
    }
}

#[async_trait]
impl ChatPlatform for RecordingChat {
    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: Option<InlineKeyboardMarkup>,
    ) -> Result<i32, ChatError> {
        if Self::take_failure(&self.failing_sends) {
            return Err(self.injected_failure());
        }
        let message_id = self.next_message_id.fetch_add(1, Ordering::SeqCst);
        self.record(ChatCall::Send {
            chat_id,
            message_id,
            text: text.to_string(),
            keyboard,
        });
        Ok(message_id)
    }

    async fn edit_message_text(
        &self,
        chat_id: i64,
        message_id: i32,
        text: &str,
        keyboard: Option<InlineKeyboardMarkup>,
    ) -> Result<(), ChatError> {
        if Self::take_failure(&self.failing_edits) {
            return Err(self.injected_failure());
        }
        self.record(ChatCall::EditText {
            chat_id,
            message_id,
            text: text.to_string(),
            keyboard,
        });
        Ok(())
    }

    async fn edit_message_keyboard(
        &self,
        chat_id: i64,
        message_id: i32,
        keyboard: InlineKeyboardMarkup,
    ) -> Result<(), ChatError> {
        if Self::take_failure(&self.failing_edits) {
            return Err(self.injected_failure());
        }
        self.record(ChatCall::EditKeyboard {
            chat_id,
            message_id,
            keyboard,
        });
        Ok(())
    }

    async fn delete_message(&self, chat_id: i64, message_id: i32) -> Result<(), ChatError> {
        self.record(ChatCall::Delete {
            chat_id,
            message_id,
        });
        Ok(())
    }

    async fn answer_callback(
        &self,
        callback_id: &str,
        text: Option<&str>,
        show_alert: bool,
    ) -> Result<(), ChatError> {
        self.record(ChatCall::AnswerCallback {
            callback_id: callback_id.to_string(),
            text: text.map(str::to_string),
            show_alert,
        });
        Ok(())
    }

    async fn get_file(&self, file_id: &str) -> Result<String, ChatError> {
        Ok(format!("photos/{file_id}.jpg"))
    }

    fn file_url(&self, path: &str) -> String {
        format!("https://files.test/{path}")
    }

    async fn download_file(&self, _path: &str) -> Result<Vec<u8>, ChatError> {
        Ok(self.file_bytes.clone())
    }
}

/// Extractor returning a canned ticket, or failing
#[derive(Debug)]
pub struct StaticExtractor {
    ticket: Option<RawTicket>,
    timeout: bool,
    calls: AtomicUsize,
}

impl StaticExtractor {
    pub fn returning(ticket: RawTicket) -> Self {
        Self {
            ticket: Some(ticket),
            timeout: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            ticket: None,
            timeout: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn timing_out() -> Self {
        Self {
            ticket: None,
            timeout: true,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TicketExtractor for StaticExtractor {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn extract(&self, _image: &TicketImage) -> Result<RawTicket, ExtractionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match (&self.ticket, self.timeout) {
            (Some(ticket), _) => Ok(ticket.clone()),
            (None, true) => Err(ExtractionError::Timeout {
                provider: "static",
                secs: 0,
            }),
            (None, false) => Err(ExtractionError::Upstream {
                provider: "static",
                reason: "canned failure".to_string(),
            }),
        }
    }
}

/// Ticket source serving fixed bytes for any file id
#[derive(Debug, Clone)]
pub struct StaticSource {
    bytes: Vec<u8>,
}

impl StaticSource {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }
}

#[async_trait]
impl TicketSource for StaticSource {
    async fn resolve(&self, file_id: &str) -> Result<ResolvedFile, AcquisitionError> {
        Ok(ResolvedFile {
            path: format!("photos/{file_id}.jpg"),
            url: format!("https://files.test/photos/{file_id}.jpg"),
        })
    }

    async fn download(&self, _file: &ResolvedFile) -> Result<Vec<u8>, AcquisitionError> {
        if self.bytes.is_empty() {
            return Err(AcquisitionError::DownloadFailed("empty file".to_string()));
        }
        Ok(self.bytes.clone())
    }
}
