//! Environment configuration for heyi.
//!
//! Everything the process environment contributes is read exactly once into a
//! [`HeyiConfig`] at startup and passed down explicitly. CLI flags override
//! preset values, which override these defaults.

use crate::error::{HeyiError, Result};

/// Env var holding the provider API key (required).
pub const API_KEY_ENV: &str = "HEYI_API_KEY";

/// Env var overriding the default model.
pub const MODEL_ENV: &str = "HEYI_MODEL";

/// Env var overriding the default crawler strategy.
pub const CRAWLER_ENV: &str = "HEYI_CRAWLER";

/// Env var overriding the provider endpoint.
pub const BASE_URL_ENV: &str = "HEYI_BASE_URL";

/// Model used when neither a flag, a preset, nor `HEYI_MODEL` names one.
pub const DEFAULT_MODEL: &str = "openai/gpt-4o-mini";

/// Crawler token used when nothing else selects one.
pub const DEFAULT_CRAWLER: &str = "fetch";

/// OpenAI-compatible chat completions endpoint root.
pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// Runtime configuration resolved from the environment.
#[derive(Clone)]
pub struct HeyiConfig {
    /// Provider API key. Never logged.
    pub api_key: String,
    /// Default model identifier.
    pub default_model: String,
    /// Default crawler token (`fetch`, `browser`, or a browser path).
    pub default_crawler: String,
    /// Provider base URL (without the `/chat/completions` suffix).
    pub base_url: String,
}

impl std::fmt::Debug for HeyiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeyiConfig")
            .field("api_key", &"<redacted>")
            .field("default_model", &self.default_model)
            .field("default_crawler", &self.default_crawler)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl HeyiConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary lookup function.
    ///
    /// Empty values are treated as unset. Fails if the API key is missing.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_key = get(API_KEY_ENV).ok_or_else(|| {
            HeyiError::config(format!(
                "API key not found. Set the {API_KEY_ENV} environment variable."
            ))
        })?;

        let config = Self {
            api_key,
            default_model: get(MODEL_ENV).unwrap_or_else(|| DEFAULT_MODEL.into()),
            default_crawler: get(CRAWLER_ENV).unwrap_or_else(|| DEFAULT_CRAWLER.into()),
            base_url: get(BASE_URL_ENV)
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_BASE_URL.into()),
        };

        tracing::debug!(?config, "configuration loaded");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_only_key_is_set() {
        let config = HeyiConfig::from_lookup(lookup(&[(API_KEY_ENV, "sk-test")])).unwrap();
        assert_eq!(config.api_key, "sk-test");
        assert_eq!(config.default_model, DEFAULT_MODEL);
        assert_eq!(config.default_crawler, DEFAULT_CRAWLER);
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn overrides_are_read() {
        let config = HeyiConfig::from_lookup(lookup(&[
            (API_KEY_ENV, "sk-test"),
            (MODEL_ENV, "anthropic/claude-3.5-haiku"),
            (CRAWLER_ENV, "browser"),
            (BASE_URL_ENV, "http://localhost:8080/v1/"),
        ]))
        .unwrap();
        assert_eq!(config.default_model, "anthropic/claude-3.5-haiku");
        assert_eq!(config.default_crawler, "browser");
        assert_eq!(config.base_url, "http://localhost:8080/v1");
    }

    #[test]
    fn missing_api_key_is_fatal() {
        let err = HeyiConfig::from_lookup(lookup(&[(MODEL_ENV, "x")])).unwrap_err();
        assert!(err.to_string().contains("API key not found"));

        let err = HeyiConfig::from_lookup(lookup(&[(API_KEY_ENV, "  ")])).unwrap_err();
        assert!(matches!(err, HeyiError::Config { .. }));
    }

    #[test]
    fn debug_output_redacts_key() {
        let config = HeyiConfig::from_lookup(lookup(&[(API_KEY_ENV, "sk-secret")])).unwrap();
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("sk-secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
