//! Reason Relay LLM
//!
//! Provides a unified streaming-chat interface over the backends the relay
//! pipeline composes:
//! - DeepSeek (reasoner, with native reasoning separation on R1 models)
//! - Any OpenAI-compatible endpoint
//! - Google Gemini
//!
//! Also includes the provider-specific streaming adapters and the HTTP
//! client factory.

pub mod deepseek;
pub mod gemini;
pub mod http_client;
pub mod openai_compat;
pub mod provider;
pub mod streaming_adapters;
pub mod types;

// Re-export main types
pub use deepseek::DeepSeekProvider;
pub use gemini::GeminiProvider;
pub use http_client::build_http_client;
pub use openai_compat::OpenAiCompatProvider;
pub use provider::{build_provider, ProviderKind, StreamingChat};
pub use types::*;

// Re-export streaming adapters
pub use streaming_adapters::{DeepSeekAdapter, GeminiAdapter, OpenAiCompatAdapter};
