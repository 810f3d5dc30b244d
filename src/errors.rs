//! # Error Types Module
//!
//! Structured error types for every component of the ticket-ingestion
//! subsystem. Each error classifies itself into an [`ErrorKind`] so the
//! gateway and the chat-facing handlers can decide how to surface it
//! without inspecting messages.

use thiserror::Error;

/// Coarse classification shared by every error in the crate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing secret/token; fatal to the feature, never per request
    Configuration,
    /// Secret mismatch or ownership mismatch
    Authorization,
    /// Upstream call exceeded its deadline
    UpstreamTimeout,
    /// Upstream answered with an error or an unexpected shape
    UpstreamFailure,
    /// Unknown account or bet
    NotFound,
    /// Malformed command parameters
    Validation,
    /// Storage or transport failure on our side
    Internal,
}

/// Configuration errors raised while reading the environment
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("invalid value for {var}: {reason}")]
    InvalidVar { var: &'static str, reason: String },
}

/// Persistence failures from the storage collaborator
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("unique constraint violated: {0}")]
    Conflict(String),

    #[error("account {0} is bound to another chat user")]
    AccountTaken(String),

    #[error("storage error: {0}")]
    Other(String),
}

/// Account linking failures
#[derive(Error, Debug)]
pub enum LinkError {
    #[error("account identifier is empty after normalization")]
    InvalidAccountId,

    #[error("account {0} not found")]
    AccountNotFound(String),

    #[error("chat user {chat_user_id} is already linked to another account")]
    ChatAlreadyLinked { chat_user_id: i64 },

    #[error("account {account_id} is already linked to another chat user")]
    AccountAlreadyLinked { account_id: String },

    #[error("no binding found for chat user {0}")]
    NoBindingFound(i64),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl LinkError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LinkError::InvalidAccountId => ErrorKind::Validation,
            LinkError::AccountNotFound(_) | LinkError::NoBindingFound(_) => ErrorKind::NotFound,
            LinkError::ChatAlreadyLinked { .. } | LinkError::AccountAlreadyLinked { .. } => {
                ErrorKind::Authorization
            }
            LinkError::Store(_) => ErrorKind::Internal,
        }
    }
}

/// Ticket acquisition failures; terminal for the current pipeline attempt
#[derive(Error, Debug)]
pub enum AcquisitionError {
    #[error("failed to resolve file reference: {0}")]
    FileResolutionFailed(String),

    #[error("failed to download ticket image: {0}")]
    DownloadFailed(String),
}

/// Extraction failures from the recognition service or the provider chain
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("{provider} timed out after {secs}s")]
    Timeout { provider: &'static str, secs: u64 },

    #[error("{provider} failed: {reason}")]
    Upstream { provider: &'static str, reason: String },

    #[error("{provider} returned an unexpected body: {reason}")]
    Malformed { provider: &'static str, reason: String },

    #[error("{provider} is temporarily disabled after repeated failures")]
    CircuitOpen { provider: &'static str },

    #[error("no extraction provider configured")]
    NoProviderConfigured,

    #[error("no provider succeeded ({})", .attempts.join("; "))]
    NoProviderSucceeded { attempts: Vec<String> },

    #[error(transparent)]
    Acquisition(#[from] AcquisitionError),
}

impl ExtractionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExtractionError::Timeout { .. } => ErrorKind::UpstreamTimeout,
            ExtractionError::NoProviderConfigured => ErrorKind::Configuration,
            _ => ErrorKind::UpstreamFailure,
        }
    }
}

/// Bet lifecycle failures
#[derive(Error, Debug)]
pub enum BetError {
    /// Unknown bet or a bet owned by another account; both look the same
    #[error("bet {0} not found")]
    NotFound(i64),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl BetError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BetError::NotFound(_) => ErrorKind::NotFound,
            BetError::Store(_) => ErrorKind::Internal,
        }
    }
}

/// Chat platform call failures
#[derive(Error, Debug)]
pub enum ChatError {
    #[error("chat platform rejected the request: {0}")]
    Api(String),

    #[error("chat platform unreachable: {0}")]
    Network(String),
}

/// Final delivery failure after every fallback in the delivery policy
#[derive(Error, Debug)]
#[error("could not deliver message for bet {bet_id}: {last}")]
pub struct DeliveryError {
    pub bet_id: i64,
    #[source]
    pub last: ChatError,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_error_kinds() {
        assert_eq!(LinkError::InvalidAccountId.kind(), ErrorKind::Validation);
        assert_eq!(
            LinkError::AccountNotFound("abc".into()).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            LinkError::ChatAlreadyLinked { chat_user_id: 1 }.kind(),
            ErrorKind::Authorization
        );
    }

    #[test]
    fn test_extraction_error_kinds() {
        let timeout = ExtractionError::Timeout {
            provider: "recognition",
            secs: 60,
        };
        assert_eq!(timeout.kind(), ErrorKind::UpstreamTimeout);
        assert_eq!(
            ExtractionError::NoProviderConfigured.kind(),
            ErrorKind::Configuration
        );
        assert_eq!(
            ExtractionError::CircuitOpen {
                provider: "recognition"
            }
            .kind(),
            ErrorKind::UpstreamFailure
        );
    }

    #[test]
    fn test_error_message_formatting() {
        let err = ExtractionError::NoProviderSucceeded {
            attempts: vec!["openai: 500".into(), "anthropic: 429".into()],
        };
        assert_eq!(
            err.to_string(),
            "no provider succeeded (openai: 500; anthropic: 429)"
        );

        let timeout = ExtractionError::Timeout {
            provider: "recognition",
            secs: 60,
        };
        assert_eq!(timeout.to_string(), "recognition timed out after 60s");
    }
}
