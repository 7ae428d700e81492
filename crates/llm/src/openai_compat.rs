//! OpenAI-Compatible Provider
//!
//! Implementation of the StreamingChat trait for any backend speaking the
//! OpenAI `v1/chat/completions` protocol. The relay pipeline typically uses
//! this as the summarizer; it also works as a reasoner for gateways that
//! serve reasoning models behind the same format.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::http_client::build_http_client;
use crate::provider::{
    forward_event_stream, missing_api_key_error, parse_http_error, StreamingChat,
};
use crate::streaming_adapters::OpenAiCompatAdapter;
use crate::types::{GenerationParams, LlmError, LlmResult, Message, ProviderConfig};
use reason_relay_core::streaming::StreamEvent;

/// Default endpoint when no base URL is configured
const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";

/// OpenAI-compatible provider
pub struct OpenAiCompatProvider {
    config: ProviderConfig,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    /// Create a new provider with the given configuration
    pub fn new(config: ProviderConfig) -> Self {
        let client = build_http_client(config.proxy.as_ref());
        Self { config, client }
    }

    /// Get the API endpoint URL
    fn endpoint(&self) -> &str {
        self.config.base_url.as_deref().unwrap_or(OPENAI_API_URL)
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
impl StreamingChat for OpenAiCompatProvider {
    fn name(&self) -> &'static str {
        "openai-compatible"
    }

    fn supports_native_reasoning(&self, model: &str) -> bool {
        let model = model.to_lowercase();
        model.starts_with("o1")
            || model.starts_with("o3")
            || model.contains("r1")
            || model.contains("reasoner")
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
            .ok_or_else(|| missing_api_key_error("openai-compatible"))?;

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
            return Err(parse_http_error(status, &body_text, "openai-compatible"));
        }

        let mut adapter = OpenAiCompatAdapter::new(model);
        forward_event_stream(response, &mut adapter, &tx).await
    }
}
