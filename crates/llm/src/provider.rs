//! Streaming Chat Provider Trait
//!
//! Defines the single capability the pipeline needs from a backend: given a
//! conversation, a model, and generation parameters, stream normalized
//! events into a channel until the response is exhausted.

use async_trait::async_trait;
use futures_util::StreamExt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::warn;

use crate::deepseek::DeepSeekProvider;
use crate::gemini::GeminiProvider;
use crate::openai_compat::OpenAiCompatProvider;
use crate::types::{GenerationParams, LlmError, LlmResult, Message, ProviderConfig};
use reason_relay_core::streaming::{StreamAdapter, StreamEvent};

/// Trait that all streaming-chat providers implement.
///
/// The connection is opened inside `stream_chat` and released when the call
/// returns; providers never reuse a response stream across calls. Partial
/// events already sent through `tx` are not retracted on failure.
#[async_trait]
pub trait StreamingChat: Send + Sync {
    /// Returns the provider name for identification and logging.
    fn name(&self) -> &'static str;

    /// Returns whether the given model separates reasoning output natively
    /// (e.g. DeepSeek R1's `reasoning_content` deltas). When false, callers
    /// that want a reasoning trace must request it via prompting.
    fn supports_native_reasoning(&self, _model: &str) -> bool {
        false
    }

    /// Stream one chat completion, pushing normalized events into `tx`.
    ///
    /// Token usage is reported through `StreamEvent::Usage` events rather
    /// than provider-side counters, so concurrent sessions stay isolated.
    async fn stream_chat(
        &self,
        messages: &[Message],
        model: &str,
        params: &GenerationParams,
        tx: mpsc::Sender<StreamEvent>,
    ) -> LlmResult<()>;
}

/// Supported provider backends.
///
/// Selection is an explicit tagged choice resolved once at session
/// construction, never inferred from URL contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderKind {
    DeepSeek,
    OpenAiCompatible,
    Gemini,
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderKind::DeepSeek => write!(f, "deepseek"),
            ProviderKind::OpenAiCompatible => write!(f, "openai-compatible"),
            ProviderKind::Gemini => write!(f, "gemini"),
        }
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "deepseek" => Ok(ProviderKind::DeepSeek),
            "openai" | "openai-compatible" | "openai_compatible" => {
                Ok(ProviderKind::OpenAiCompatible)
            }
            "gemini" | "google" => Ok(ProviderKind::Gemini),
            other => Err(format!("unknown provider kind: {}", other)),
        }
    }
}

/// Build a provider for the given kind and configuration.
pub fn build_provider(kind: ProviderKind, config: ProviderConfig) -> Arc<dyn StreamingChat> {
    match kind {
        ProviderKind::DeepSeek => Arc::new(DeepSeekProvider::new(config)),
        ProviderKind::OpenAiCompatible => Arc::new(OpenAiCompatProvider::new(config)),
        ProviderKind::Gemini => Arc::new(GeminiProvider::new(config)),
    }
}

/// Helper function to create an error for a missing API key
pub fn missing_api_key_error(provider: &str) -> LlmError {
    LlmError::AuthenticationFailed {
        message: format!("API key not configured for {}", provider),
    }
}

/// Helper function to map HTTP error status codes to provider errors
pub fn parse_http_error(status: u16, body: &str, provider: &str) -> LlmError {
    match status {
        401 => LlmError::AuthenticationFailed {
            message: format!("{}: Invalid API key", provider),
        },
        403 => LlmError::AuthenticationFailed {
            message: format!("{}: Access denied", provider),
        },
        404 => LlmError::ModelNotFound {
            model: body.to_string(),
        },
        429 => LlmError::RateLimited {
            message: body.to_string(),
            retry_after: None,
        },
        400 => LlmError::InvalidRequest {
            message: body.to_string(),
        },
        500..=599 => LlmError::ServerError {
            message: body.to_string(),
            status: Some(status),
        },
        _ => LlmError::Other {
            message: format!("HTTP {}: {}", status, body),
        },
    }
}

/// Drive a line-delimited event stream through an adapter, forwarding every
/// normalized event into `tx`.
///
/// Malformed units are logged and skipped; the stream keeps going. A closed
/// receiver ends the drive early so no network read outlives the consumer.
pub(crate) async fn forward_event_stream(
    response: reqwest::Response,
    adapter: &mut dyn StreamAdapter,
    tx: &mpsc::Sender<StreamEvent>,
) -> LlmResult<()> {
    let mut stream = response.bytes_stream();
    let mut buffer = String::new();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| LlmError::NetworkError {
            message: e.to_string(),
        })?;

        buffer.push_str(&String::from_utf8_lossy(&chunk));

        // Process complete lines
        while let Some(line_end) = buffer.find('\n') {
            let line = buffer[..line_end].to_string();
            buffer = buffer[line_end + 1..].to_string();

            if line.trim().is_empty() {
                continue;
            }

            match adapter.adapt(&line) {
                Ok(events) => {
                    for event in events {
                        if tx.send(event).await.is_err() {
                            // Consumer went away; stop reading the wire.
                            return Ok(());
                        }
                    }
                }
                Err(e) => {
                    warn!(
                        provider = adapter.provider_name(),
                        error = %e,
                        "skipping malformed stream unit"
                    );
                }
            }
        }
    }

    // Flush whatever the adapter still holds (e.g. a pending thinking block
    // on a stream that ended without a terminator line).
    if let Ok(events) = adapter.adapt("data: [DONE]") {
        for event in events {
            if tx.send(event).await.is_err() {
                break;
            }
        }
    }

    Ok(())
}
