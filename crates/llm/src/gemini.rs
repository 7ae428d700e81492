//! Gemini Provider
//!
//! Implementation of the StreamingChat trait for Google's Gemini REST API
//! (`models/{model}:streamGenerateContent?alt=sse`). The relay pipeline
//! uses Gemini as a summarizer; it has no reasoning channel.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::http_client::build_http_client;
use crate::provider::{
    forward_event_stream, missing_api_key_error, parse_http_error, StreamingChat,
};
use crate::streaming_adapters::GeminiAdapter;
use crate::types::{GenerationParams, LlmError, LlmResult, Message, MessageRole, ProviderConfig};
use reason_relay_core::streaming::StreamEvent;

/// Default Gemini API base URL
const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini provider
pub struct GeminiProvider {
    config: ProviderConfig,
    client: reqwest::Client,
}

impl GeminiProvider {
    /// Create a new Gemini provider with the given configuration
    pub fn new(config: ProviderConfig) -> Self {
        let client = build_http_client(config.proxy.as_ref());
        Self { config, client }
    }

    /// Resolve the streaming endpoint for a model
    fn endpoint(&self, model: &str) -> String {
        let base = self
            .config
            .base_url
            .as_deref()
            .unwrap_or(GEMINI_API_BASE)
            .trim_end_matches('/');
        format!("{}/models/{}:streamGenerateContent?alt=sse", base, model)
    }

    /// Build the request body for the API.
    ///
    /// Gemini has no penalty parameters; those generation options are
    /// ignored here. System messages are folded into user turns because the
    /// conversation roles Gemini accepts are only `user` and `model`.
    fn build_request_body(
        &self,
        messages: &[Message],
        params: &GenerationParams,
    ) -> serde_json::Value {
        let contents: Vec<serde_json::Value> = messages
            .iter()
            .map(|m| match m.role {
                MessageRole::Assistant => serde_json::json!({
                    "role": "model",
                    "parts": [{ "text": m.content }],
                }),
                MessageRole::User => serde_json::json!({
                    "role": "user",
                    "parts": [{ "text": m.content }],
                }),
                MessageRole::System => serde_json::json!({
                    "role": "user",
                    "parts": [{ "text": format!("System instruction: {}", m.content) }],
                }),
            })
            .collect();

        serde_json::json!({
            "contents": contents,
            "generationConfig": {
                "temperature": params.temperature,
                "topP": params.top_p,
                "maxOutputTokens": self.config.max_tokens,
            },
        })
    }
}

#[async_trait]
impl StreamingChat for GeminiProvider {
    fn name(&self) -> &'static str {
        "gemini"
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
            .ok_or_else(|| missing_api_key_error("gemini"))?;

        let body = self.build_request_body(messages, params);

        let response = self
            .client
            .post(self.endpoint(model))
            .header("x-goog-api-key", api_key)
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
            return Err(parse_http_error(status, &body_text, "gemini"));
        }

        let mut adapter = GeminiAdapter::new();
        forward_event_stream(response, &mut adapter, &tx).await
    }
}
