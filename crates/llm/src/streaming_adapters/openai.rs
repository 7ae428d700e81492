//! OpenAI-Compatible SSE Stream Adapter
//!
//! Handles the standard `chat.completion.chunk` SSE format spoken by
//! OpenAI and the many compatible gateways (SiliconFlow, OpenRouter,
//! vLLM, ...). Some of those backends expose reasoning models through the
//! same `reasoning_content` extension DeepSeek uses, so the field is
//! recognized here as well.

use reason_relay_core::streaming::{AdapterError, StreamAdapter, StreamEvent};
use serde::Deserialize;

/// Internal event types from the OpenAI-compatible SSE format
#[derive(Debug, Deserialize)]
struct ChatCompletionChunk {
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
}

/// Adapter for OpenAI-compatible SSE streams
pub struct OpenAiCompatAdapter {
    model: String,
    /// Track if we're in a reasoning block
    in_reasoning: bool,
}

impl OpenAiCompatAdapter {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            in_reasoning: false,
        }
    }

    /// Reasoning-capable model families commonly served behind
    /// OpenAI-compatible gateways.
    fn model_supports_reasoning(&self) -> bool {
        let model = self.model.to_lowercase();
        model.starts_with("o1")
            || model.starts_with("o3")
            || model.contains("r1")
            || model.contains("reasoner")
    }
}

impl StreamAdapter for OpenAiCompatAdapter {
    fn provider_name(&self) -> &'static str {
        "openai-compatible"
    }

    fn supports_reasoning(&self) -> bool {
        self.model_supports_reasoning()
    }

    fn adapt(&mut self, input: &str) -> Result<Vec<StreamEvent>, AdapterError> {
        let trimmed = input.trim();

        if trimmed.starts_with(':') {
            return Ok(vec![]);
        }

        let json_str = if let Some(rest) = trimmed.strip_prefix("data: ") {
            rest
        } else if trimmed.is_empty() {
            return Ok(vec![]);
        } else {
            trimmed
        };

        if json_str.is_empty() || json_str == "[DONE]" {
            if self.in_reasoning {
                self.in_reasoning = false;
                return Ok(vec![StreamEvent::ThinkingEnd]);
            }
            return Ok(vec![]);
        }

        let chunk: ChatCompletionChunk =
            serde_json::from_str(json_str).map_err(|e| AdapterError::ParseError(e.to_string()))?;

        let mut events = vec![];

        if let Some(usage) = chunk.usage {
            events.push(StreamEvent::Usage {
                input_tokens: usage.prompt_tokens,
                output_tokens: usage.completion_tokens,
                thinking_tokens: None,
            });
        }

        for choice in chunk.choices {
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
                if let Some(reasoning) = delta.reasoning_content {
                    if !reasoning.is_empty() {
                        if !self.in_reasoning {
                            self.in_reasoning = true;
                            events.push(StreamEvent::ThinkingStart);
                        }
                        events.push(StreamEvent::ThinkingDelta { content: reasoning });
                    }
                }

                if let Some(content) = delta.content {
                    if !content.is_empty() {
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
