//! Runtime Configuration
//!
//! Environment-driven settings for the two pipeline endpoints, mirroring
//! the dotenv-style surface of the original deployment: per-endpoint
//! provider kind, API key, base URL, and model, plus an optional outbound
//! proxy shared by both HTTP clients.

use std::sync::Arc;

use reason_relay_core::error::{CoreError, CoreResult};
use reason_relay_core::proxy::ProxyConfig;
use reason_relay_llm::{build_provider, ProviderConfig, ProviderKind, StreamingChat};

/// Settings for one pipeline endpoint (reasoner or summarizer).
#[derive(Debug, Clone)]
pub struct EndpointSettings {
    pub kind: ProviderKind,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: String,
}

impl EndpointSettings {
    /// Build the provider for these settings.
    pub fn build(&self, proxy: Option<&ProxyConfig>) -> Arc<dyn StreamingChat> {
        build_provider(
            self.kind,
            ProviderConfig {
                api_key: self.api_key.clone(),
                base_url: self.base_url.clone(),
                proxy: proxy.cloned(),
                ..Default::default()
            },
        )
    }
}

/// Full relay configuration.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub reasoner: EndpointSettings,
    pub summarizer: EndpointSettings,
    pub proxy: Option<ProxyConfig>,
}

impl RelayConfig {
    /// Load configuration from the process environment.
    ///
    /// Recognized variables: `RELAY_REASONER_{PROVIDER,API_KEY,BASE_URL,MODEL}`,
    /// `RELAY_SUMMARIZER_{PROVIDER,API_KEY,BASE_URL,MODEL}`, and `HTTP_PROXY`.
    pub fn from_env() -> CoreResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> CoreResult<Self> {
        let reasoner = endpoint_from(
            &lookup,
            "RELAY_REASONER",
            ProviderKind::DeepSeek,
            "deepseek-reasoner",
        )?;
        let summarizer = endpoint_from(
            &lookup,
            "RELAY_SUMMARIZER",
            ProviderKind::Gemini,
            "gemini-2.0-flash",
        )?;
        let proxy = match non_empty(lookup("HTTP_PROXY")) {
            Some(raw) => Some(ProxyConfig::parse(&raw)?),
            None => None,
        };

        Ok(Self {
            reasoner,
            summarizer,
            proxy,
        })
    }
}

fn endpoint_from(
    lookup: &impl Fn(&str) -> Option<String>,
    prefix: &str,
    default_kind: ProviderKind,
    default_model: &str,
) -> CoreResult<EndpointSettings> {
    let kind = match non_empty(lookup(&format!("{}_PROVIDER", prefix))) {
        Some(raw) => raw
            .parse::<ProviderKind>()
            .map_err(|e| CoreError::config(e))?,
        None => default_kind,
    };

    Ok(EndpointSettings {
        kind,
        api_key: non_empty(lookup(&format!("{}_API_KEY", prefix))),
        base_url: non_empty(lookup(&format!("{}_BASE_URL", prefix))),
        model: non_empty(lookup(&format!("{}_MODEL", prefix)))
            .unwrap_or_else(|| default_model.to_string()),
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
