//! Bot module for handling Telegram interactions
//!
//! This module is split into several submodules:
//! - `client`: the Bot API calls the bot needs, behind a trait
//! - `updates`: decoding webhook payloads into typed updates
//! - `router`: dispatching messages and commands
//! - `callback_handler`: handling inline keyboard callback queries
//! - `callback_data`: callback payload grammar and keyboard states
//! - `ui_builder`: creating keyboards and formatting messages
//! - `message_controller`: the lifecycle of a bet message in the chat

pub mod callback_data;
pub mod callback_handler;
pub mod client;
pub mod message_controller;
pub mod router;
pub mod ui_builder;
pub mod updates;

pub use callback_handler::{CallbackDispatcher, CallbackReply};
pub use client::{ChatPlatform, TelegramClient};
pub use message_controller::{EditOffer, MessageController, OutstandingMessage};
pub use router::UpdateRouter;
pub use updates::{InboundUpdate, WireUpdate};
