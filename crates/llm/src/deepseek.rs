//! DeepSeek Provider
//!
//! Implementation of the StreamingChat trait for DeepSeek's API. R1 and
//! reasoner models stream their chain-of-thought through the
//! `reasoning_content` delta field, which the relay pipeline captures as
//! the reasoning trace.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::http_client::build_http_client;
use crate::provider::{
    forward_event_stream, missing_api_key_error, parse_http_error, StreamingChat,
};
use crate::streaming_adapters::DeepSeekAdapter;
use crate::types::{GenerationParams, LlmError, LlmResult, Message, ProviderConfig};
use reason_relay_core::streaming::StreamEvent;

/// Default DeepSeek API endpoint
const DEEPSEEK_API_URL: &str = "https://api.deepseek.com/v1/chat/completions";

/// DeepSeek provider
pub struct DeepSeekProvider {
    config: ProviderConfig,
    client: reqwest::Client,
}

impl DeepSeekProvider {
    /// Create a new DeepSeek provider with the given configuration
    pub fn new(config: ProviderConfig) -> Self {
        let client = build_http_client(config.proxy.as_ref());
        Self { config, client }
    }

    /// Resolve the chat-completions endpoint.
    ///
    /// User-supplied base URLs are normalized: a missing scheme becomes
    /// `https://`, and the `/v1/chat/completions` path is appended when
    /// absent, so `api.deepseek.com` and SiliconFlow-style hosts both work
    /// as-is.
    fn endpoint(&self) -> String {
        match self.config.base_url.as_deref() {
            Some(raw) => normalize_chat_endpoint(raw),
            None => DEEPSEEK_API_URL.to_string(),
        }
    }

    /// Build the request body for the API
    fn build_request_body(
        &self,
        messages: &[Message],
        model: &str,
        params: &GenerationParams,
    ) -> serde_json::Value {
        let api_messages: Vec<serde_json::Value> = messages
            .iter()
            .map(|m| {
                serde_json::json!({
                    "role": m.role.as_str(),
                    "content": m.content,
                })
            })
            .collect();

        serde_json::json!({
            "model": model,
            "messages": api_messages,
            "max_tokens": self.config.max_tokens,
            "temperature": params.temperature,
            "top_p": params.top_p,
            "presence_penalty": params.presence_penalty,
            "frequency_penalty": params.frequency_penalty,
            "stream": true,
            "stream_options": { "include_usage": true },
        })
    }
}

#[async_trait]
impl StreamingChat for DeepSeekProvider {
    fn name(&self) -> &'static str {
        "deepseek"
    }

    fn supports_native_reasoning(&self, model: &str) -> bool {
        let model = model.to_lowercase();
        model.contains("r1") || model.contains("reasoner")
    }

    async fn stream_chat(
        &self,
        messages: &[Message],
        model: &str,
        params: &GenerationParams,
        tx: mpsc::Sender<StreamEvent>,
    ) -> LlmResult<()> {
        let api_key = self
            .config
            .api_key
            .as_ref()
            .ok_or_else(|| missing_api_key_error("deepseek"))?;

        let body = self.build_request_body(messages, model, params);

        let response = self
            .client
            .post(self.endpoint())
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::NetworkError {
                message: e.to_string(),
            })?;

        let status = response.status().as_u16();
        if status != 200 {
            let body_text = response.text().await.map_err(|e| LlmError::NetworkError {
                message: e.to_string(),
            })?;
            return Err(parse_http_error(status, &body_text, "deepseek"));
        }

        let mut adapter = DeepSeekAdapter::new(model);
        forward_event_stream(response, &mut adapter, &tx).await
    }
}

/// Normalize a user-supplied base URL into a chat-completions endpoint.
fn normalize_chat_endpoint(raw: &str) -> String {
    let mut url = raw.trim().to_string();
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        url = format!("https://{}", url);
    }
    if !url.ends_with("/v1/chat/completions") {
        url = format!("{}/v1/chat/completions", url.trim_end_matches('/'));
    }
    url
}
