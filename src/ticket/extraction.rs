//! Extraction strategies: the wire shape of an extracted ticket, the
//! strategy trait every extractor implements and the ordered fallback
//! chain that tries them in priority order.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tokio::sync::OnceCell;
use tracing::{info, warn};

use super::acquisition::{ResolvedFile, TicketSource};
use super::normalize::parse_decimal_text;
use crate::errors::{AcquisitionError, ExtractionError};

/// Ticket fields as returned by an extractor, before normalization
///
/// Every field is optional and tolerant: numbers may arrive as strings,
/// selections may arrive as a list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawTicket {
    #[serde(deserialize_with = "lenient_text")]
    pub casa_de_aposta: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub tipster: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub esporte: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub evento: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub torneio: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub pais: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub mercado: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub tipo_aposta: Option<String>,
    #[serde(deserialize_with = "lenient_number")]
    pub valor_apostado: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub odd: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub bonus: Option<f64>,
    #[serde(deserialize_with = "lenient_text")]
    pub data_evento: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub status: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub aposta: Option<String>,
}

impl RawTicket {
    /// True when the extractor produced nothing usable at all
    pub fn is_empty(&self) -> bool {
        let blank = |v: &Option<String>| v.as_deref().map_or(true, |s| s.trim().is_empty());
        blank(&self.esporte)
            && blank(&self.evento)
            && blank(&self.mercado)
            && blank(&self.aposta)
            && blank(&self.casa_de_aposta)
            && self.valor_apostado.map_or(true, |v| v == 0.0)
            && self.odd.map_or(true, |v| v == 0.0)
    }
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        Some(Value::Array(items)) => {
            let lines: Vec<String> = items
                .into_iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s),
                    Value::Null => None,
                    other => Some(other.to_string()),
                })
                .collect();
            Some(lines.join("\n"))
        }
        _ => None,
    })
}

fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => parse_decimal_text(&s),
        _ => None,
    })
}

/// Parse a ticket out of free model output (code fences tolerated)
pub fn parse_ticket_json(text: &str) -> Result<RawTicket, String> {
    let start = text.find('{').ok_or("no JSON object in reply")?;
    let end = text.rfind('}').ok_or("no JSON object in reply")?;
    if end < start {
        return Err("no JSON object in reply".to_string());
    }
    serde_json::from_str(&text[start..=end]).map_err(|e| e.to_string())
}

/// Image handed to extractors
///
/// Carries the public URL of the file; the raw bytes are downloaded on
/// first request and cached, so URL-only extractors never download.
pub struct TicketImage {
    file: ResolvedFile,
    source: Arc<dyn TicketSource>,
    bytes: OnceCell<Vec<u8>>,
}

impl TicketImage {
    pub fn new(file: ResolvedFile, source: Arc<dyn TicketSource>) -> Self {
        Self {
            file,
            source,
            bytes: OnceCell::new(),
        }
    }

    /// Publicly resolvable URL of the image
    pub fn url(&self) -> &str {
        &self.file.url
    }

    pub async fn bytes(&self) -> Result<&[u8], AcquisitionError> {
        let bytes = self
            .bytes
            .get_or_try_init(|| self.source.download(&self.file))
            .await?;
        Ok(bytes.as_slice())
    }
}

/// A way of turning a ticket image into raw ticket fields
#[async_trait]
pub trait TicketExtractor: Send + Sync {
    /// Provider name for logging
    fn name(&self) -> &'static str;

    async fn extract(&self, image: &TicketImage) -> Result<RawTicket, ExtractionError>;
}

/// Ordered list of extractors tried in sequence; first success wins
pub struct ExtractorChain {
    extractors: Vec<Arc<dyn TicketExtractor>>,
}

impl ExtractorChain {
    pub fn new(extractors: Vec<Arc<dyn TicketExtractor>>) -> Self {
        Self { extractors }
    }
}

#[async_trait]
impl TicketExtractor for ExtractorChain {
    fn name(&self) -> &'static str {
        "chain"
    }

    async fn extract(&self, image: &TicketImage) -> Result<RawTicket, ExtractionError> {
        if self.extractors.is_empty() {
            return Err(ExtractionError::NoProviderConfigured);
        }

        let mut attempts = Vec::with_capacity(self.extractors.len());
        for extractor in &self.extractors {
            match extractor.extract(image).await {
                Ok(ticket) => {
                    info!(provider = extractor.name(), "Ticket extracted");
                    return Ok(ticket);
                }
                Err(e) => {
                    warn!(provider = extractor.name(), error = %e, "Extractor failed, trying next");
                    attempts.push(format!("{}: {}", extractor.name(), e));
                }
            }
        }

        Err(ExtractionError::NoProviderSucceeded { attempts })
    }
}
