//! # Bankroll Telegram Bot
//!
//! Turns photos of betting slips sent to a Telegram bot into bets stored in
//! a user's bankroll, and manages those bets through inline keyboards on the
//! resulting chat messages.

pub mod accounts;
pub mod bets;
pub mod bot;
pub mod circuit_breaker;
pub mod config;
pub mod db;
pub mod dedup;
pub mod errors;
pub mod localization;
pub mod logging;
pub mod models;
pub mod server;
pub mod storage_traits;
pub mod tasks;
pub mod ticket;

#[cfg(feature = "testkit")]
pub mod testkit;
