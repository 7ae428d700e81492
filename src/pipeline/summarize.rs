//! Summarization Stage
//!
//! Waits for the reasoning trace, embeds it into the outbound prompt, and
//! streams the summarizer's answer to the output. An empty trace is a
//! valid value (the prompt substitutes a fixed placeholder), but a
//! malformed message list fails validation before any network call.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use reason_relay_core::error::{CoreError, CoreResult};
use reason_relay_core::streaming::StreamEvent;
use reason_relay_llm::{GenerationParams, Message, MessageRole, StreamingChat};

use super::frame::Phase;
use super::stage::{StageContext, StageKind};

/// Placeholder embedded in the prompt when no reasoning trace is available.
pub(crate) const REASONING_UNAVAILABLE: &str = "(reasoning unavailable)";

/// Stage lifecycle; `Failed` is absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SummaryState {
    WaitingForTrace,
    PromptBuilt,
    StreamingAnswer,
    Done,
    Failed,
}

pub(crate) struct SummaryStage {
    provider: Arc<dyn StreamingChat>,
    model: String,
}

impl SummaryStage {
    pub(crate) fn new(provider: Arc<dyn StreamingChat>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }

    pub(crate) async fn run(
        self,
        messages: Vec<Message>,
        params: GenerationParams,
        ctx: StageContext,
        trace_rx: oneshot::Receiver<String>,
    ) {
        let mut state = SummaryState::WaitingForTrace;
        debug!(session = %ctx.session_id, model = %self.model, "summary stage waiting for trace");

        let trace = tokio::select! {
            _ = ctx.cancel.cancelled() => {
                transition(&ctx, &mut state, SummaryState::Failed);
                ctx.finish(StageKind::Summary);
                return;
            }
            trace = trace_rx => trace.unwrap_or_default(),
        };
        debug!(session = %ctx.session_id, trace_chars = trace.len(), "trace received");

        let prompt = match build_prompt(&messages, &trace) {
            Ok(prompt) => prompt,
            Err(e) => {
                warn!(session = %ctx.session_id, error = %e, "summary request rejected");
                transition(&ctx, &mut state, SummaryState::Failed);
                ctx.finish(StageKind::Summary);
                return;
            }
        };
        transition(&ctx, &mut state, SummaryState::PromptBuilt);

        let (ev_tx, mut ev_rx) = mpsc::channel::<StreamEvent>(256);
        let worker = {
            let provider = Arc::clone(&self.provider);
            let model = self.model.clone();
            tokio::spawn(async move { provider.stream_chat(&prompt, &model, &params, ev_tx).await })
        };
        transition(&ctx, &mut state, SummaryState::StreamingAnswer);

        let failed = loop {
            tokio::select! {
                _ = ctx.cancel.cancelled() => {
                    worker.abort();
                    break true;
                }
                ev = ev_rx.recv() => match ev {
                    None => match worker.await {
                        Ok(Ok(())) => break false,
                        Ok(Err(e)) => {
                            warn!(session = %ctx.session_id, error = %e, "summarizer provider failed");
                            break true;
                        }
                        Err(e) => {
                            warn!(session = %ctx.session_id, error = %e, "summarizer task aborted");
                            break true;
                        }
                    },
                    Some(StreamEvent::TextDelta { content }) => {
                        ctx.emit(Phase::Content, content);
                    }
                    Some(StreamEvent::Usage { input_tokens, output_tokens, thinking_tokens }) => {
                        ctx.observe_usage(input_tokens, output_tokens, thinking_tokens);
                    }
                    Some(StreamEvent::Error { message, .. }) => {
                        worker.abort();
                        warn!(session = %ctx.session_id, error = %message, "summarizer stream error");
                        break true;
                    }
                    // Everything the summarizer says is answer text; stray
                    // reasoning deltas from gateway models are dropped.
                    Some(StreamEvent::ThinkingStart)
                    | Some(StreamEvent::ThinkingDelta { .. })
                    | Some(StreamEvent::ThinkingEnd)
                    | Some(StreamEvent::Complete { .. }) => {}
                },
            }
        };

        if failed {
            transition(&ctx, &mut state, SummaryState::Failed);
        } else {
            info!(session = %ctx.session_id, "summary stream complete");
            transition(&ctx, &mut state, SummaryState::Done);
        }
        ctx.finish(StageKind::Summary);
    }
}

fn transition(ctx: &StageContext, state: &mut SummaryState, to: SummaryState) {
    debug!(session = %ctx.session_id, from = ?*state, to = ?to, "summary state");
    *state = to;
}

/// Build the outbound message list: the conversation as given, with the
/// last user message extended by an instruction block embedding the
/// reasoning trace.
///
/// Fails with a validation error, before any network call, when the
/// message list is empty or does not end with a user message.
fn build_prompt(messages: &[Message], trace: &str) -> CoreResult<Vec<Message>> {
    let last = messages
        .last()
        .ok_or_else(|| CoreError::validation("message list is empty"))?;
    if last.role != MessageRole::User {
        return Err(CoreError::validation(
            "last message is not from the user",
        ));
    }

    let trace = if trace.is_empty() {
        REASONING_UNAVAILABLE
    } else {
        trace
    };

    let mut prompt = messages.to_vec();
    let rewritten = format!(
        "Here's my original input:\n{original}\n\n\
         Here's the reasoning process from another model:\n{trace}\n\n\
         Based on this reasoning, please provide a comprehensive and detailed \
         response. Your answer should be thorough and complete, covering all \
         aspects of the question. Don't be too brief - aim for a substantial \
         explanation that fully addresses the query:",
        original = last.content,
        trace = trace,
    );
    if let Some(last) = prompt.last_mut() {
        last.content = rewritten;
    }
    Ok(prompt)
}
