//! # Data Model
//!
//! Domain types shared by the pipeline, the bet lifecycle and the chat
//! controllers: chat identities, the transient ticket draft, persisted
//! bets and their settlement status.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default country when the ticket does not name one
pub const DEFAULT_COUNTRY: &str = "Mundo";
/// Default bet type
pub const DEFAULT_BET_TYPE: &str = "Simples";
/// Bet type used for accumulators
pub const MULTIPLE_BET_TYPE: &str = "Múltipla";

/// Binding between a chat platform user and an internal account (1:1)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatIdentity {
    pub chat_user_id: i64,
    pub account_id: String,
    pub username: Option<String>,
}

/// Settlement outcome of a bet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SettlementStatus {
    Ganha,
    Perdida,
    #[default]
    Pendente,
    #[serde(rename = "Meio Ganha")]
    MeioGanha,
    #[serde(rename = "Meio Perdida")]
    MeioPerdida,
    Reembolsada,
}

impl SettlementStatus {
    /// Every status in the order the status menu lists them
    pub const ALL: [SettlementStatus; 6] = [
        SettlementStatus::Ganha,
        SettlementStatus::Perdida,
        SettlementStatus::Pendente,
        SettlementStatus::MeioGanha,
        SettlementStatus::MeioPerdida,
        SettlementStatus::Reembolsada,
    ];

    /// Stored and displayed label
    pub fn as_str(&self) -> &'static str {
        match self {
            SettlementStatus::Ganha => "Ganha",
            SettlementStatus::Perdida => "Perdida",
            SettlementStatus::Pendente => "Pendente",
            SettlementStatus::MeioGanha => "Meio Ganha",
            SettlementStatus::MeioPerdida => "Meio Perdida",
            SettlementStatus::Reembolsada => "Reembolsada",
        }
    }

    /// Token used inside callback payloads
    pub fn token(&self) -> &'static str {
        match self {
            SettlementStatus::Ganha => "GANHA",
            SettlementStatus::Perdida => "PERDIDA",
            SettlementStatus::Pendente => "PENDENTE",
            SettlementStatus::MeioGanha => "MEIO_GANHA",
            SettlementStatus::MeioPerdida => "MEIO_PERDIDA",
            SettlementStatus::Reembolsada => "REEMBOLSADA",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.token() == token)
    }

    /// Parse the stored label
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == label)
    }

    pub fn glyph(&self) -> &'static str {
        match self {
            SettlementStatus::Ganha => "✅",
            SettlementStatus::Perdida => "❌",
            SettlementStatus::Pendente => "⏳",
            SettlementStatus::MeioGanha => "🌓",
            SettlementStatus::MeioPerdida => "🌗",
            SettlementStatus::Reembolsada => "↩️",
        }
    }

    pub fn is_settled(&self) -> bool {
        !matches!(self, SettlementStatus::Pendente)
    }
}

impl fmt::Display for SettlementStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status choice offered by the status keyboard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusAction {
    Set(SettlementStatus),
    /// Keyboard-only sentinel, never persisted
    Back,
}

impl StatusAction {
    pub fn token(&self) -> &'static str {
        match self {
            StatusAction::Set(status) => status.token(),
            StatusAction::Back => "BACK",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        if token == "BACK" {
            return Some(StatusAction::Back);
        }
        SettlementStatus::from_token(token).map(StatusAction::Set)
    }
}

/// Normalized per-image ticket fields; never persisted as such
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WageringTicketDraft {
    pub sportsbook: String,
    pub tipster: String,
    pub sport: String,
    pub event: String,
    pub tournament: String,
    pub country: String,
    pub market: String,
    pub bet_type: String,
    pub stake: f64,
    pub odds: f64,
    pub bonus: f64,
    /// ISO date/time string, or empty when the ticket had none
    pub event_date: String,
    pub status: SettlementStatus,
    /// Free-text selections exactly as extracted
    pub selections: String,
}

/// A persisted wager
#[derive(Debug, Clone, PartialEq)]
pub struct Bet {
    pub id: i64,
    pub bankroll_id: i64,
    pub sport: String,
    pub event: String,
    pub tournament: String,
    pub country: String,
    pub market: String,
    pub bet_type: String,
    pub stake: f64,
    pub odds: f64,
    pub bonus: f64,
    pub event_date: NaiveDateTime,
    pub tipster: String,
    pub status: SettlementStatus,
    pub bookmaker: String,
    pub obtained_return: Option<f64>,
    pub selections: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert payload for a new bet
#[derive(Debug, Clone, PartialEq)]
pub struct NewBet {
    pub bankroll_id: i64,
    pub sport: String,
    pub event: String,
    pub tournament: String,
    pub country: String,
    pub market: String,
    pub bet_type: String,
    pub stake: f64,
    pub odds: f64,
    pub bonus: f64,
    pub event_date: NaiveDateTime,
    pub tipster: String,
    pub status: SettlementStatus,
    pub bookmaker: String,
    pub obtained_return: Option<f64>,
    pub selections: String,
}

/// Return obtained for a status, as a pure function of (status, stake, odds)
///
/// Ganha and Meio Ganha pay stake × odds, Reembolsada pays back the stake,
/// every other status has no return.
pub fn settlement_return(status: SettlementStatus, stake: f64, odds: f64) -> Option<f64> {
    match status {
        SettlementStatus::Ganha | SettlementStatus::MeioGanha => Some(round_cents(stake * odds)),
        SettlementStatus::Reembolsada => Some(round_cents(stake)),
        _ => None,
    }
}

/// Profit (positive) or loss (negative) shown for a bet
///
/// Derived from the same return the lifecycle persists; pending bets
/// have no result yet.
pub fn profit_or_loss(status: SettlementStatus, stake: f64, odds: f64) -> Option<f64> {
    if !status.is_settled() {
        return None;
    }
    match settlement_return(status, stake, odds) {
        Some(ret) => Some(round_cents(ret - stake)),
        None => Some(round_cents(-stake)),
    }
}

pub(crate) fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
