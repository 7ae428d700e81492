//! DeepSeek SSE Stream Adapter
//!
//! Handles DeepSeek's OpenAI-compatible SSE format. R1 / reasoner models
//! stream chain-of-thought through the `reasoning_content` delta field
//! before any `content` arrives; chat models only send `content`.

use reason_relay_core::streaming::{AdapterError, StreamAdapter, StreamEvent};
use serde::Deserialize;

/// Internal event types from DeepSeek's SSE format
#[derive(Debug, Deserialize)]
struct DeepSeekEvent {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    delta: Option<Delta>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Delta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    reasoning_content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
    #[serde(default)]
    completion_tokens_details: Option<CompletionTokensDetails>,
}

#[derive(Debug, Deserialize)]
struct CompletionTokensDetails {
    #[serde(default)]
    reasoning_tokens: Option<u32>,
}

/// Adapter for DeepSeek's SSE format
pub struct DeepSeekAdapter {
    model: String,
    /// Track if we're in a reasoning block
    in_reasoning: bool,
}

impl DeepSeekAdapter {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            in_reasoning: false,
        }
    }

    /// Check if model separates reasoning natively (R1 / reasoner models)
    fn model_supports_reasoning(&self) -> bool {
        let model = self.model.to_lowercase();
        model.contains("r1") || model.contains("reasoner")
    }
}

impl StreamAdapter for DeepSeekAdapter {
    fn provider_name(&self) -> &'static str {
        "deepseek"
    }

    fn supports_reasoning(&self) -> bool {
        self.model_supports_reasoning()
    }

    fn adapt(&mut self, input: &str) -> Result<Vec<StreamEvent>, AdapterError> {
        let trimmed = input.trim();

        // SSE comments (keep-alive lines) start with a colon
        if trimmed.starts_with(':') {
            return Ok(vec![]);
        }

        // Handle SSE format: "data: {...}"
        let json_str = if let Some(rest) = trimmed.strip_prefix("data: ") {
            rest
        } else if trimmed.is_empty() {
            return Ok(vec![]);
        } else {
            trimmed
        };

        if json_str.is_empty() || json_str == "[DONE]" {
            // End of stream - close any open reasoning block
            if self.in_reasoning {
                self.in_reasoning = false;
                return Ok(vec![StreamEvent::ThinkingEnd]);
            }
            return Ok(vec![]);
        }

        let event: DeepSeekEvent =
            serde_json::from_str(json_str).map_err(|e| AdapterError::ParseError(e.to_string()))?;

        let mut events = vec![];

        // Handle usage info (cumulative snapshot, typically in the last chunk)
        if let Some(usage) = event.usage {
            events.push(StreamEvent::Usage {
                input_tokens: usage.prompt_tokens,
                output_tokens: usage.completion_tokens,
                thinking_tokens: usage
                    .completion_tokens_details
                    .and_then(|d| d.reasoning_tokens),
            });
        }

        for choice in event.choices {
            if let Some(finish_reason) = choice.finish_reason {
                if self.in_reasoning {
                    self.in_reasoning = false;
                    events.push(StreamEvent::ThinkingEnd);
                }
                events.push(StreamEvent::Complete {
                    stop_reason: Some(finish_reason),
                });
                continue;
            }

            if let Some(delta) = choice.delta {
                // Handle reasoning content (R1 / reasoner models)
                if let Some(reasoning) = delta.reasoning_content {
                    if !reasoning.is_empty() {
                        if !self.in_reasoning {
                            self.in_reasoning = true;
                            events.push(StreamEvent::ThinkingStart);
                        }
                        events.push(StreamEvent::ThinkingDelta { content: reasoning });
                    }
                }

                // Handle regular content
                if let Some(content) = delta.content {
                    if !content.is_empty() {
                        // If we were in reasoning, end it first
                        if self.in_reasoning {
                            self.in_reasoning = false;
                            events.push(StreamEvent::ThinkingEnd);
                        }
                        events.push(StreamEvent::TextDelta { content });
                    }
                }
            }
        }

        Ok(events)
    }

    fn reset(&mut self) {
        self.in_reasoning = false;
    }
}
