//! Vision-model extractors used when no recognition service is configured.
//!
//! Each provider sends the image inline (base64) with a fixed extraction
//! prompt and parses the JSON object out of the model reply.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use image::ImageFormat;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::time::timeout;
use tracing::debug;

use super::extraction::{parse_ticket_json, RawTicket, TicketExtractor, TicketImage};
use crate::config::ProviderConfig;
use crate::errors::ExtractionError;

const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";
const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_API_VERSION: &str = "2023-06-01";
const MAX_TOKENS: usize = 1024;

/// Instructions shared by every vision provider
pub const EXTRACTION_PROMPT: &str = "Você recebe a imagem de um bilhete de aposta esportiva. \
Responda SOMENTE com um objeto JSON com as chaves: casaDeAposta, tipster, esporte, evento, \
torneio, pais, mercado, tipoAposta (Simples ou Múltipla), valorApostado (número), odd (número), \
bonus (número), dataEvento (DD/MM/AAAA HH:MM ou ISO), status (Pendente, Ganha, Perdida, \
Meio Ganha, Meio Perdida ou Reembolsada) e aposta (texto das seleções, uma por linha). \
Use string vazia ou 0 quando a informação não estiver visível.";

/// MIME type of an image, sniffed from its magic bytes
pub fn image_mime(bytes: &[u8]) -> &'static str {
    match image::guess_format(bytes) {
        Ok(ImageFormat::Png) => "image/png",
        Ok(ImageFormat::Gif) => "image/gif",
        Ok(ImageFormat::WebP) => "image/webp",
        _ => "image/jpeg",
    }
}

async fn encoded_image(
    provider: &'static str,
    image: &TicketImage,
) -> Result<(&'static str, String), ExtractionError> {
    let bytes = image.bytes().await?;
    debug!(provider, size = bytes.len(), "Encoding ticket image");
    Ok((image_mime(bytes), BASE64.encode(bytes)))
}

fn upstream(provider: &'static str, err: impl ToString) -> ExtractionError {
    ExtractionError::Upstream {
        provider,
        reason: err.to_string(),
    }
}

fn malformed(provider: &'static str, err: impl ToString) -> ExtractionError {
    ExtractionError::Malformed {
        provider,
        reason: err.to_string(),
    }
}

/// Send `request` and decode its JSON body, all within `limit`
async fn fetch_json<T: DeserializeOwned>(
    provider: &'static str,
    request: RequestBuilder,
    limit: Duration,
) -> Result<T, ExtractionError> {
    let call = async {
        let response = request
            .send()
            .await
            .map_err(|e| upstream(provider, e))?
            .error_for_status()
            .map_err(|e| upstream(provider, e))?;
        response.json::<T>().await.map_err(|e| malformed(provider, e))
    };

    timeout(limit, call).await.map_err(|_| ExtractionError::Timeout {
        provider,
        secs: limit.as_secs(),
    })?
}

/// OpenAI chat-completions vision extractor
pub struct OpenAiExtractor {
    client: Client,
    api_key: String,
    model: String,
    request_timeout: Duration,
}

impl OpenAiExtractor {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, request_timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            request_timeout,
        }
    }
}

#[derive(Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

#[derive(Deserialize)]
struct OpenAiMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl TicketExtractor for OpenAiExtractor {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn extract(&self, image: &TicketImage) -> Result<RawTicket, ExtractionError> {
        let provider = self.name();
        let (mime, data) = encoded_image(provider, image).await?;

        let body = json!({
            "model": self.model,
            "max_tokens": MAX_TOKENS,
            "temperature": 0,
            "response_format": { "type": "json_object" },
            "messages": [{
                "role": "user",
                "content": [
                    { "type": "text", "text": EXTRACTION_PROMPT },
                    { "type": "image_url", "image_url": { "url": format!("data:{mime};base64,{data}") } }
                ]
            }]
        });

        let request = self
            .client
            .post(OPENAI_API_URL)
            .bearer_auth(&self.api_key)
            .json(&body);
        let response: OpenAiResponse = fetch_json(provider, request, self.request_timeout).await?;

        let text = response
            .choices
            .into_iter()
            .find_map(|c| c.message.content)
            .ok_or_else(|| malformed(provider, "empty completion"))?;
        parse_ticket_json(&text).map_err(|e| malformed(provider, e))
    }
}

/// Anthropic messages-API vision extractor
pub struct AnthropicExtractor {
    client: Client,
    api_key: String,
    model: String,
    request_timeout: Duration,
}

impl AnthropicExtractor {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, request_timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            request_timeout,
        }
    }
}

#[derive(Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: usize,
    messages: Vec<Value>,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicBlock>,
}

#[derive(Deserialize)]
struct AnthropicBlock {
    #[serde(default)]
    text: String,
}

#[async_trait]
impl TicketExtractor for AnthropicExtractor {
    fn name(&self) -> &'static str {
        "anthropic"
    }

    async fn extract(&self, image: &TicketImage) -> Result<RawTicket, ExtractionError> {
        let provider = self.name();
        let (mime, data) = encoded_image(provider, image).await?;

        let request = AnthropicRequest {
            model: &self.model,
            max_tokens: MAX_TOKENS,
            messages: vec![json!({
                "role": "user",
                "content": [
                    { "type": "image", "source": { "type": "base64", "media_type": mime, "data": data } },
                    { "type": "text", "text": EXTRACTION_PROMPT }
                ]
            })],
        };

        let call = self
            .client
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_API_VERSION)
            .json(&request);
        let response: AnthropicResponse = fetch_json(provider, call, self.request_timeout).await?;

        let text: String = response.content.into_iter().map(|b| b.text).collect();
        parse_ticket_json(&text).map_err(|e| malformed(provider, e))
    }
}

/// Build the vision-provider fallback list in priority order
///
/// Providers without an API key are left out.
pub fn configured_providers(
    config: &ProviderConfig,
    request_timeout: Duration,
) -> Vec<Arc<dyn TicketExtractor>> {
    let mut providers: Vec<Arc<dyn TicketExtractor>> = Vec::new();
    if let Some(key) = &config.openai_api_key {
        providers.push(Arc::new(OpenAiExtractor::new(
            key.clone(),
            config.openai_model.clone(),
            request_timeout,
        )));
    }
    if let Some(key) = &config.anthropic_api_key {
        providers.push(Arc::new(AnthropicExtractor::new(
            key.clone(),
            config.anthropic_model.clone(),
            request_timeout,
        )));
    }
    providers
}
