//! Unified Stream Event Types
//!
//! Provider-agnostic event types and adapter trait for processing real-time
//! LLM responses from multiple providers. These types are shared across the
//! LLM crate (provider implementations) and the main crate (pipeline stages,
//! composer).

use serde::{Deserialize, Serialize};

/// Unified streaming event that all provider adapters convert to.
/// This gives the pipeline a consistent view of a stream regardless of
/// which backend produced it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Answer text delta from the model
    TextDelta { content: String },

    /// Start of a reasoning/chain-of-thought block
    ThinkingStart,

    /// Reasoning content delta
    ThinkingDelta { content: String },

    /// End of a reasoning block
    ThinkingEnd,

    /// Token usage information. Providers that repeat usage snapshots per
    /// chunk send cumulative values; consumers must treat these as totals,
    /// not deltas.
    Usage {
        input_tokens: u32,
        output_tokens: u32,
        #[serde(skip_serializing_if = "Option::is_none")]
        thinking_tokens: Option<u32>,
    },

    /// Error during streaming
    Error {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        code: Option<String>,
    },

    /// Stream complete
    Complete {
        #[serde(skip_serializing_if = "Option::is_none")]
        stop_reason: Option<String>,
    },
}

impl StreamEvent {
    /// Whether this event carries streamed text (reasoning or answer).
    pub fn is_delta(&self) -> bool {
        matches!(
            self,
            StreamEvent::TextDelta { .. } | StreamEvent::ThinkingDelta { .. }
        )
    }
}

/// Errors that can occur during stream adaptation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum AdapterError {
    /// Invalid format that couldn't be parsed
    InvalidFormat(String),
    /// JSON/data parsing error
    ParseError(String),
}

impl std::fmt::Display for AdapterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AdapterError::InvalidFormat(msg) => write!(f, "Invalid format: {}", msg),
            AdapterError::ParseError(msg) => write!(f, "Parse error: {}", msg),
        }
    }
}

impl std::error::Error for AdapterError {}

/// Trait for adapting provider-specific stream formats to unified events.
///
/// All provider adapters (DeepSeek, OpenAI-compatible, Gemini) implement
/// this trait to provide a consistent interface for stream processing.
pub trait StreamAdapter: Send + Sync {
    /// Returns the provider name for logging and identification.
    fn provider_name(&self) -> &'static str;

    /// Returns whether this adapter/provider separates reasoning natively.
    fn supports_reasoning(&self) -> bool;

    /// Adapt a raw stream line/chunk to unified events.
    ///
    /// A single input line may produce zero, one, or multiple events.
    fn adapt(&mut self, input: &str) -> Result<Vec<StreamEvent>, AdapterError>;

    /// Reset adapter state for a new stream.
    fn reset(&mut self) {
        // Default implementation does nothing
    }
}
