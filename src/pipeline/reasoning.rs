//! Reasoning-Capture Stage
//!
//! Drives the reasoner provider, forwards every reasoning increment to the
//! output as it arrives, and accumulates the raw trace. At the
//! reasoning→answer boundary (first answer delta, or stream end) the
//! complete trace is published exactly once to the summarization stage
//! through a single-use channel. On provider failure an empty trace is
//! published instead so the downstream stage is never starved.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use reason_relay_core::streaming::StreamEvent;
use reason_relay_llm::{GenerationParams, Message, MessageRole, StreamingChat};

use super::frame::Phase;
use super::stage::{StageContext, StageKind};

/// Stage lifecycle; `Failed` is absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReasoningState {
    Started,
    StreamingReasoning,
    TracePublished,
    Done,
    Failed,
}

/// How the event loop ended.
enum Outcome {
    /// Provider stream ran to completion
    StreamEnded,
    /// First answer delta observed; reasoning is over
    Boundary,
    /// Provider surfaced an in-stream error
    ErrorEvent(String),
    /// Session was cancelled
    Cancelled,
}

pub(crate) struct ReasoningStage {
    provider: Arc<dyn StreamingChat>,
    model: String,
    request_step_by_step: bool,
}

impl ReasoningStage {
    pub(crate) fn new(
        provider: Arc<dyn StreamingChat>,
        model: impl Into<String>,
        request_step_by_step: bool,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            request_step_by_step,
        }
    }

    pub(crate) async fn run(
        self,
        mut messages: Vec<Message>,
        params: GenerationParams,
        ctx: StageContext,
        trace_tx: oneshot::Sender<String>,
    ) {
        let mut state = ReasoningState::Started;
        debug!(session = %ctx.session_id, model = %self.model, "reasoning stage started");

        let native = self.provider.supports_native_reasoning(&self.model);
        if !native && self.request_step_by_step {
            rewrite_for_step_by_step(&mut messages);
        }

        let (ev_tx, mut ev_rx) = mpsc::channel::<StreamEvent>(256);
        let worker = {
            let provider = Arc::clone(&self.provider);
            let model = self.model.clone();
            tokio::spawn(
                async move { provider.stream_chat(&messages, &model, &params, ev_tx).await },
            )
        };

        transition(&ctx, &mut state, ReasoningState::StreamingReasoning);
        let mut trace = String::new();
        let mut trace_tx = Some(trace_tx);
        let mut saw_reasoning_deltas = false;

        let outcome = loop {
            tokio::select! {
                _ = ctx.cancel.cancelled() => break Outcome::Cancelled,
                ev = ev_rx.recv() => match ev {
                    None => break Outcome::StreamEnded,
                    Some(StreamEvent::ThinkingDelta { content }) => {
                        saw_reasoning_deltas = true;
                        ctx.emit(Phase::Reasoning, content.clone());
                        trace.push_str(&content);
                    }
                    Some(StreamEvent::TextDelta { content }) => {
                        if native || saw_reasoning_deltas {
                            // The reasoner has switched to answering; its
                            // answer belongs to the summarizer, not the
                            // caller, so capture stops here.
                            break Outcome::Boundary;
                        }
                        ctx.emit(Phase::Reasoning, content.clone());
                        trace.push_str(&content);
                    }
                    Some(StreamEvent::Usage { input_tokens, output_tokens, thinking_tokens }) => {
                        ctx.observe_usage(input_tokens, output_tokens, thinking_tokens);
                    }
                    Some(StreamEvent::Error { message, .. }) => break Outcome::ErrorEvent(message),
                    Some(StreamEvent::ThinkingStart)
                    | Some(StreamEvent::ThinkingEnd)
                    | Some(StreamEvent::Complete { .. }) => {}
                },
            }
        };

        match outcome {
            Outcome::Boundary => {
                worker.abort();
                let trace_chars = trace.len();
                publish(&mut trace_tx, std::mem::take(&mut trace));
                transition(&ctx, &mut state, ReasoningState::TracePublished);
                info!(
                    session = %ctx.session_id,
                    trace_chars,
                    "reasoning complete, trace handed off"
                );
                transition(&ctx, &mut state, ReasoningState::Done);
            }
            Outcome::StreamEnded => match worker.await {
                Ok(Ok(())) => {
                    let trace_chars = trace.len();
                    publish(&mut trace_tx, std::mem::take(&mut trace));
                    transition(&ctx, &mut state, ReasoningState::TracePublished);
                    info!(
                        session = %ctx.session_id,
                        trace_chars,
                        "reasoner stream ended, trace handed off"
                    );
                    transition(&ctx, &mut state, ReasoningState::Done);
                }
                Ok(Err(e)) => {
                    warn!(session = %ctx.session_id, error = %e, "reasoner provider failed");
                    publish(&mut trace_tx, String::new());
                    transition(&ctx, &mut state, ReasoningState::Failed);
                }
                Err(e) => {
                    warn!(session = %ctx.session_id, error = %e, "reasoner task aborted");
                    publish(&mut trace_tx, String::new());
                    transition(&ctx, &mut state, ReasoningState::Failed);
                }
            },
            Outcome::ErrorEvent(message) => {
                worker.abort();
                warn!(session = %ctx.session_id, error = %message, "reasoner stream error");
                publish(&mut trace_tx, String::new());
                transition(&ctx, &mut state, ReasoningState::Failed);
            }
            Outcome::Cancelled => {
                worker.abort();
                transition(&ctx, &mut state, ReasoningState::Failed);
            }
        }

        ctx.finish(StageKind::Reasoning);
    }
}

fn transition(ctx: &StageContext, state: &mut ReasoningState, to: ReasoningState) {
    debug!(session = %ctx.session_id, from = ?*state, to = ?to, "reasoning state");
    *state = to;
}

/// Publish the trace exactly once; later calls are no-ops.
fn publish(trace_tx: &mut Option<oneshot::Sender<String>>, trace: String) {
    if let Some(tx) = trace_tx.take() {
        // The summarization stage may already be gone (cancelled session);
        // that is not an error here.
        let _ = tx.send(trace);
    }
}

/// Rewrite the last user message to request explicit step-by-step
/// reasoning. Applied only when the provider has no native reasoning
/// separation; messages ending in a non-user turn are left untouched.
fn rewrite_for_step_by_step(messages: &mut [Message]) {
    if let Some(last) = messages.last_mut() {
        if last.role == MessageRole::User {
            last.content = format!(
                "Analyze the following question with an explicit chain of thought, \
                 thinking step by step.\n\nQuestion: {}\n\nThinking process:",
                last.content
            );
        }
    }
}
