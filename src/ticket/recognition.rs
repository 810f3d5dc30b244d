//! # Recognition Service Client
//!
//! Primary extraction path: forwards the image URL to the recognition
//! microservice and accepts the ticket fields it returns. The call is
//! bounded by a timeout and guarded by a circuit breaker.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::extraction::{RawTicket, TicketExtractor, TicketImage};
use crate::circuit_breaker::CircuitBreaker;
use crate::config::RecognitionConfig;
use crate::errors::ExtractionError;

/// Path of the extraction endpoint, relative to the service base URL
pub const EXTRACT_PATH: &str = "/api/extract-ticket";

const PROVIDER: &str = "recognition";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExtractRequest<'a> {
    image_url: &'a str,
}

/// Accepts both the bare object and the `{ "data": {...} }` envelope
#[derive(Deserialize)]
#[serde(untagged)]
enum ExtractResponse {
    Wrapped { data: RawTicket },
    Bare(RawTicket),
}

impl ExtractResponse {
    fn into_ticket(self) -> RawTicket {
        match self {
            ExtractResponse::Wrapped { data } => data,
            ExtractResponse::Bare(ticket) => ticket,
        }
    }
}

pub struct RecognitionClient {
    client: Client,
    endpoint: String,
    config: RecognitionConfig,
    breaker: CircuitBreaker,
}

impl RecognitionClient {
    pub fn new(base_url: &str, config: RecognitionConfig) -> Self {
        Self {
            client: Client::new(),
            endpoint: format!("{}{}", base_url.trim_end_matches('/'), EXTRACT_PATH),
            breaker: CircuitBreaker::new(&config),
            config,
        }
    }

    async fn call(&self, image_url: &str) -> Result<RawTicket, ExtractionError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&ExtractRequest { image_url })
            .send()
            .await
            .map_err(|e| ExtractionError::Upstream {
                provider: PROVIDER,
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExtractionError::Upstream {
                provider: PROVIDER,
                reason: format!("HTTP {}: {}", status.as_u16(), body.chars().take(200).collect::<String>()),
            });
        }

        let body: Value = response.json().await.map_err(|e| ExtractionError::Malformed {
            provider: PROVIDER,
            reason: e.to_string(),
        })?;
        parse_response(body)
    }
}

fn parse_response(body: Value) -> Result<RawTicket, ExtractionError> {
    if !body.is_object() {
        return Err(ExtractionError::Malformed {
            provider: PROVIDER,
            reason: "response is not a JSON object".to_string(),
        });
    }
    serde_json::from_value::<ExtractResponse>(body)
        .map(ExtractResponse::into_ticket)
        .map_err(|e| ExtractionError::Malformed {
            provider: PROVIDER,
            reason: e.to_string(),
        })
}

#[async_trait]
impl TicketExtractor for RecognitionClient {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn extract(&self, image: &TicketImage) -> Result<RawTicket, ExtractionError> {
        if self.breaker.is_open() {
            warn!("Recognition circuit breaker is open, skipping call");
            return Err(ExtractionError::CircuitOpen { provider: PROVIDER });
        }

        debug!(endpoint = %self.endpoint, "Calling recognition service");
        let result = match timeout(self.config.timeout(), self.call(image.url())).await {
            Ok(result) => result,
            Err(_) => Err(ExtractionError::Timeout {
                provider: PROVIDER,
                secs: self.config.timeout_secs,
            }),
        };

        match &result {
            Ok(_) => {
                self.breaker.record_success();
                info!("Recognition service returned a ticket");
            }
            Err(e) => {
                self.breaker.record_failure();
                warn!(error = %e, "Recognition call failed");
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_bare_and_wrapped_responses() {
        let bare = parse_response(json!({"esporte": "soccer", "odd": 1.5})).unwrap();
        assert_eq!(bare.esporte.as_deref(), Some("soccer"));

        let wrapped = parse_response(json!({"data": {"esporte": "tennis", "odd": "2,10"}})).unwrap();
        assert_eq!(wrapped.esporte.as_deref(), Some("tennis"));
        assert_eq!(wrapped.odd, Some(2.1));
    }

    #[test]
    fn test_parse_rejects_non_objects() {
        assert!(matches!(
            parse_response(json!(["not", "an", "object"])),
            Err(ExtractionError::Malformed { .. })
        ));
        assert!(matches!(
            parse_response(json!("text")),
            Err(ExtractionError::Malformed { .. })
        ));
    }

    #[test]
    fn test_endpoint_joins_base_url() {
        let client = RecognitionClient::new("http://ocr.local/", RecognitionConfig::default());
        assert_eq!(client.endpoint, "http://ocr.local/api/extract-ticket");
    }
}
