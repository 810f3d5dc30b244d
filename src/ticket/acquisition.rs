//! Ticket Acquisition: platform file reference → public URL → raw bytes.
//!
//! Failures are terminal for the current pipeline attempt; nothing here
//! retries.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error};

use crate::bot::client::ChatPlatform;
use crate::errors::AcquisitionError;

/// A file reference resolved to a short-lived retrieval path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFile {
    /// Platform-side path used for the download call
    pub path: String,
    /// Publicly resolvable URL of the same file
    pub url: String,
}

#[async_trait]
pub trait TicketSource: Send + Sync {
    async fn resolve(&self, file_id: &str) -> Result<ResolvedFile, AcquisitionError>;

    async fn download(&self, file: &ResolvedFile) -> Result<Vec<u8>, AcquisitionError>;
}

/// Acquisition through the chat platform's file API
pub struct PlatformTicketSource {
    chat: Arc<dyn ChatPlatform>,
}

impl PlatformTicketSource {
    pub fn new(chat: Arc<dyn ChatPlatform>) -> Self {
        Self { chat }
    }
}

#[async_trait]
impl TicketSource for PlatformTicketSource {
    async fn resolve(&self, file_id: &str) -> Result<ResolvedFile, AcquisitionError> {
        let path = self.chat.get_file(file_id).await.map_err(|e| {
            error!(file_id, error = %e, "Failed to resolve ticket file");
            AcquisitionError::FileResolutionFailed(e.to_string())
        })?;
        debug!(file_id, path = %path, "Ticket file resolved");
        Ok(ResolvedFile {
            url: self.chat.file_url(&path),
            path,
        })
    }

    async fn download(&self, file: &ResolvedFile) -> Result<Vec<u8>, AcquisitionError> {
        let bytes = self.chat.download_file(&file.path).await.map_err(|e| {
            error!(path = %file.path, error = %e, "Failed to download ticket image");
            AcquisitionError::DownloadFailed(e.to_string())
        })?;
        if bytes.is_empty() {
            return Err(AcquisitionError::DownloadFailed("empty file".to_string()));
        }
        debug!(path = %file.path, size = bytes.len(), "Ticket image downloaded");
        Ok(bytes)
    }
}
