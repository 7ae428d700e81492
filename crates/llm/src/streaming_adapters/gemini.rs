//! Gemini SSE Stream Adapter
//!
//! Handles the `streamGenerateContent?alt=sse` response format of the
//! Gemini REST API: each `data:` line carries a `GenerateContentResponse`
//! with candidate parts and (on later chunks) cumulative `usageMetadata`.
//! Gemini has no reasoning channel; everything is answer text.

use reason_relay_core::streaming::{AdapterError, StreamAdapter, StreamEvent};
use serde::Deserialize;

/// Internal event types from the Gemini SSE format
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
    #[serde(default)]
    thoughts_token_count: Option<u32>,
}

/// Adapter for Gemini's SSE format
pub struct GeminiAdapter;

impl GeminiAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for GeminiAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamAdapter for GeminiAdapter {
    fn provider_name(&self) -> &'static str {
        "gemini"
    }

    fn supports_reasoning(&self) -> bool {
        false
    }

    fn adapt(&mut self, input: &str) -> Result<Vec<StreamEvent>, AdapterError> {
        let trimmed = input.trim();

        if trimmed.is_empty() || trimmed.starts_with(':') {
            return Ok(vec![]);
        }

        // Gemini SSE has no terminator line; the stream just ends. The
        // provider still flushes a synthetic [DONE], which has no meaning
        // for this format.
        let json_str = if let Some(rest) = trimmed.strip_prefix("data: ") {
            rest
        } else {
            trimmed
        };

        if json_str.is_empty() || json_str == "[DONE]" {
            return Ok(vec![]);
        }

        let response: GenerateContentResponse =
            serde_json::from_str(json_str).map_err(|e| AdapterError::ParseError(e.to_string()))?;

        let mut events = vec![];

        if let Some(usage) = response.usage_metadata {
            events.push(StreamEvent::Usage {
                input_tokens: usage.prompt_token_count,
                output_tokens: usage.candidates_token_count,
                thinking_tokens: usage.thoughts_token_count,
            });
        }

        for candidate in response.candidates {
            if let Some(content) = candidate.content {
                for part in content.parts {
                    if let Some(text) = part.text {
                        if !text.is_empty() {
                            events.push(StreamEvent::TextDelta { content: text });
                        }
                    }
                }
            }

            if let Some(finish_reason) = candidate.finish_reason {
                events.push(StreamEvent::Complete {
                    stop_reason: Some(finish_reason),
                });
            }
        }

        Ok(events)
    }
}
