//! Acquisition → extraction → normalization for one ticket image.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::acquisition::TicketSource;
use super::extraction::{ExtractorChain, TicketExtractor, TicketImage};
use super::normalize::normalize_ticket;
use super::providers::configured_providers;
use super::recognition::RecognitionClient;
use crate::config::Config;
use crate::errors::ExtractionError;
use crate::models::WageringTicketDraft;

/// Pick the extraction path for a deployment
///
/// The recognition microservice when its URL is configured, otherwise the
/// local vision-provider chain (which fails with `NoProviderConfigured`
/// when no key is present).
pub fn build_extractor(config: &Config) -> Arc<dyn TicketExtractor> {
    match &config.recognition.base_url {
        Some(base_url) => {
            info!(base_url = %base_url, "Using recognition service for ticket extraction");
            Arc::new(RecognitionClient::new(base_url, config.recognition.clone()))
        }
        None => {
            let providers = configured_providers(&config.providers, config.recognition.timeout());
            if providers.is_empty() {
                warn!("No recognition service or AI provider configured; ticket images will fail");
            } else {
                info!(count = providers.len(), "Using AI provider chain for ticket extraction");
            }
            Arc::new(ExtractorChain::new(providers))
        }
    }
}

#[derive(Clone)]
pub struct TicketPipeline {
    source: Arc<dyn TicketSource>,
    extractor: Arc<dyn TicketExtractor>,
}

impl TicketPipeline {
    pub fn new(source: Arc<dyn TicketSource>, extractor: Arc<dyn TicketExtractor>) -> Self {
        Self { source, extractor }
    }

    /// Turn a platform file reference into a normalized draft
    pub async fn process(
        &self,
        file_id: &str,
        caption: Option<&str>,
    ) -> Result<WageringTicketDraft, ExtractionError> {
        let resolved = self.source.resolve(file_id).await?;
        let image = TicketImage::new(resolved, Arc::clone(&self.source));

        let raw = self.extractor.extract(&image).await?;
        if raw.is_empty() {
            return Err(ExtractionError::Malformed {
                provider: self.extractor.name(),
                reason: "no ticket fields recognized".to_string(),
            });
        }
        debug!(raw = ?raw, "Raw ticket extracted");

        let draft = normalize_ticket(&raw, caption);
        info!(
            sport = %draft.sport,
            event = %draft.event,
            market = %draft.market,
            stake = draft.stake,
            odds = draft.odds,
            "Ticket normalized"
        );
        Ok(draft)
    }
}
