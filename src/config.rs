//! # Configuration Module
//!
//! Configuration structures for the ticket bot, loaded from the process
//! environment (after `.env` is applied by `main`).

use std::time::Duration;

use crate::errors::ConfigError;

// Defaults
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_RECOGNITION_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_DELIVERY_RETRY_BACKOFF_MS: u64 = 1500;
pub const DEFAULT_MAX_CONCURRENT_PIPELINES: usize = 8;
pub const DEFAULT_DEDUP_WINDOW: usize = 1024;
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-3-5-haiku-latest";

/// Recognition microservice settings
#[derive(Debug, Clone)]
pub struct RecognitionConfig {
    /// Base URL of the recognition microservice; `None` selects the provider chain
    pub base_url: Option<String>,
    /// Timeout for one recognition call in seconds
    pub timeout_secs: u64,
    /// Circuit breaker failure threshold
    pub circuit_breaker_threshold: u32,
    /// Circuit breaker reset timeout in seconds
    pub circuit_breaker_reset_secs: u64,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_secs: DEFAULT_RECOGNITION_TIMEOUT_SECS,
            circuit_breaker_threshold: 5,
            circuit_breaker_reset_secs: 60, // 1 minute
        }
    }
}

impl RecognitionConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// API credentials for the local AI fallback chain
#[derive(Debug, Clone, Default)]
pub struct ProviderConfig {
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub anthropic_api_key: Option<String>,
    pub anthropic_model: String,
}

/// Chat message delivery settings
#[derive(Debug, Clone)]
pub struct DeliveryConfig {
    /// Pause before the single retry of a failed send
    pub retry_backoff: Duration,
    /// Base URL of the hosted bet editor; enables deep-link edit buttons
    pub webapp_base_url: Option<String>,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            retry_backoff: Duration::from_millis(DEFAULT_DELIVERY_RETRY_BACKOFF_MS),
            webapp_base_url: None,
        }
    }
}

/// Top-level application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub telegram_bot_token: String,
    /// Bot API server; `None` uses api.telegram.org
    pub telegram_api_url: Option<String>,
    pub database_url: String,
    /// Shared secret expected in the webhook header; `None` disables the check
    pub webhook_secret: Option<String>,
    pub bind_addr: String,
    pub recognition: RecognitionConfig,
    pub providers: ProviderConfig,
    pub delivery: DeliveryConfig,
    /// Upper bound on concurrently running background pipelines
    pub max_concurrent_pipelines: usize,
    /// Number of recent update ids remembered for de-duplication
    pub dedup_window: usize,
    /// Emit JSON log lines instead of the human format
    pub json_logs: bool,
}

impl Config {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let telegram_bot_token =
            get("TELEGRAM_BOT_TOKEN").ok_or(ConfigError::MissingVar("TELEGRAM_BOT_TOKEN"))?;
        let database_url = get("DATABASE_URL").ok_or(ConfigError::MissingVar("DATABASE_URL"))?;

        let recognition = RecognitionConfig {
            base_url: get("RECOGNITION_URL").map(|u| u.trim_end_matches('/').to_string()),
            timeout_secs: parse_var(
                "RECOGNITION_TIMEOUT_SECS",
                get("RECOGNITION_TIMEOUT_SECS"),
                DEFAULT_RECOGNITION_TIMEOUT_SECS,
            )?,
            circuit_breaker_threshold: parse_var(
                "RECOGNITION_BREAKER_THRESHOLD",
                get("RECOGNITION_BREAKER_THRESHOLD"),
                5,
            )?,
            circuit_breaker_reset_secs: parse_var(
                "RECOGNITION_BREAKER_RESET_SECS",
                get("RECOGNITION_BREAKER_RESET_SECS"),
                60,
            )?,
        };

        let providers = ProviderConfig {
            openai_api_key: get("OPENAI_API_KEY"),
            openai_model: get("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
            anthropic_api_key: get("ANTHROPIC_API_KEY"),
            anthropic_model: get("ANTHROPIC_MODEL")
                .unwrap_or_else(|| DEFAULT_ANTHROPIC_MODEL.to_string()),
        };

        let delivery = DeliveryConfig {
            retry_backoff: Duration::from_millis(parse_var(
                "DELIVERY_RETRY_BACKOFF_MS",
                get("DELIVERY_RETRY_BACKOFF_MS"),
                DEFAULT_DELIVERY_RETRY_BACKOFF_MS,
            )?),
            webapp_base_url: get("WEBAPP_BASE_URL").map(|u| u.trim_end_matches('/').to_string()),
        };

        let max_concurrent_pipelines: usize = parse_var(
            "MAX_CONCURRENT_PIPELINES",
            get("MAX_CONCURRENT_PIPELINES"),
            DEFAULT_MAX_CONCURRENT_PIPELINES,
        )?;
        if max_concurrent_pipelines == 0 {
            return Err(ConfigError::InvalidVar {
                var: "MAX_CONCURRENT_PIPELINES",
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(Self {
            telegram_bot_token,
            telegram_api_url: get("TELEGRAM_API_URL"),
            database_url,
            webhook_secret: get("TELEGRAM_WEBHOOK_SECRET"),
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            recognition,
            providers,
            delivery,
            max_concurrent_pipelines,
            dedup_window: parse_var("DEDUP_WINDOW", get("DEDUP_WINDOW"), DEFAULT_DEDUP_WINDOW)?,
            json_logs: get("LOG_FORMAT").is_some_and(|f| f.eq_ignore_ascii_case("json")),
        })
    }
}

fn parse_var<T>(var: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(value) => value.parse().map_err(|e: T::Err| ConfigError::InvalidVar {
            var,
            reason: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_applied() {
        let config = Config::from_lookup(lookup(&[
            ("TELEGRAM_BOT_TOKEN", "123:abc"),
            ("DATABASE_URL", "postgres://localhost/bets"),
        ]))
        .unwrap();

        assert_eq!(config.bind_addr, DEFAULT_BIND_ADDR);
        assert_eq!(config.recognition.timeout_secs, 60);
        assert!(config.recognition.base_url.is_none());
        assert!(config.webhook_secret.is_none());
        assert!(config.telegram_api_url.is_none());
        assert_eq!(config.delivery.retry_backoff, Duration::from_millis(1500));
        assert_eq!(config.max_concurrent_pipelines, 8);
        assert!(!config.json_logs);
    }

    #[test]
    fn test_missing_token_is_configuration_error() {
        let err = Config::from_lookup(lookup(&[("DATABASE_URL", "postgres://x")])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar("TELEGRAM_BOT_TOKEN")));
    }

    #[test]
    fn test_blank_secret_treated_as_unset() {
        let config = Config::from_lookup(lookup(&[
            ("TELEGRAM_BOT_TOKEN", "t"),
            ("DATABASE_URL", "d"),
            ("TELEGRAM_WEBHOOK_SECRET", "   "),
        ]))
        .unwrap();
        assert!(config.webhook_secret.is_none());
    }

    #[test]
    fn test_invalid_number_rejected() {
        let err = Config::from_lookup(lookup(&[
            ("TELEGRAM_BOT_TOKEN", "t"),
            ("DATABASE_URL", "d"),
            ("RECOGNITION_TIMEOUT_SECS", "soon"),
        ]))
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidVar {
                var: "RECOGNITION_TIMEOUT_SECS",
                ..
            }
        ));
    }

    #[test]
    fn test_urls_trimmed() {
        let config = Config::from_lookup(lookup(&[
            ("TELEGRAM_BOT_TOKEN", "t"),
            ("DATABASE_URL", "d"),
            ("RECOGNITION_URL", "https://ocr.internal/"),
            ("WEBAPP_BASE_URL", "https://app.example.com/"),
            ("LOG_FORMAT", "JSON"),
        ]))
        .unwrap();
        assert_eq!(
            config.recognition.base_url.as_deref(),
            Some("https://ocr.internal")
        );
        assert_eq!(
            config.delivery.webapp_base_url.as_deref(),
            Some("https://app.example.com")
        );
        assert!(config.json_logs);
    }
}
