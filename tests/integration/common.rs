//! Scripted provider doubles for pipeline tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::sync::mpsc;

use reason_relay::{PipelineEvent, ResponseStream};
use reason_relay_core::streaming::StreamEvent;
use reason_relay_llm::{GenerationParams, LlmError, LlmResult, Message, StreamingChat};

/// A provider that replays a fixed event script, recording the messages it
/// was called with, and optionally failing after the script runs dry.
pub struct ScriptedProvider {
    native_reasoning: bool,
    script: Vec<StreamEvent>,
    failure: Option<LlmError>,
    seen_messages: Arc<Mutex<Option<Vec<Message>>>>,
}

impl ScriptedProvider {
    pub fn new(script: Vec<StreamEvent>) -> Self {
        Self {
            native_reasoning: false,
            script,
            failure: None,
            seen_messages: Arc::new(Mutex::new(None)),
        }
    }

    pub fn with_native_reasoning(mut self) -> Self {
        self.native_reasoning = true;
        self
    }

    pub fn failing(mut self, failure: LlmError) -> Self {
        self.failure = Some(failure);
        self
    }

    /// Handle onto the messages the provider was last called with.
    pub fn seen_messages(&self) -> Arc<Mutex<Option<Vec<Message>>>> {
        Arc::clone(&self.seen_messages)
    }
}

#[async_trait]
impl StreamingChat for ScriptedProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn supports_native_reasoning(&self, _model: &str) -> bool {
        self.native_reasoning
    }

    async fn stream_chat(
        &self,
        messages: &[Message],
        _model: &str,
        _params: &GenerationParams,
        tx: mpsc::Sender<StreamEvent>,
    ) -> LlmResult<()> {
        *self.seen_messages.lock().unwrap() = Some(messages.to_vec());
        for event in self.script.clone() {
            if tx.send(event).await.is_err() {
                return Ok(());
            }
        }
        match &self.failure {
            Some(failure) => Err(failure.clone()),
            None => Ok(()),
        }
    }
}

/// A provider whose stream never produces anything; used to observe that
/// cancellation tears the in-flight call down.
pub struct HangingProvider {
    dropped: Arc<AtomicBool>,
}

impl HangingProvider {
    pub fn new() -> Self {
        Self {
            dropped: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Set to true when the in-flight call future is dropped.
    pub fn dropped_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.dropped)
    }
}

struct SetOnDrop(Arc<AtomicBool>);

impl Drop for SetOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl StreamingChat for HangingProvider {
    fn name(&self) -> &'static str {
        "hanging"
    }

    async fn stream_chat(
        &self,
        _messages: &[Message],
        _model: &str,
        _params: &GenerationParams,
        _tx: mpsc::Sender<StreamEvent>,
    ) -> LlmResult<()> {
        let _guard = SetOnDrop(Arc::clone(&self.dropped));
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(())
    }
}

pub fn thinking(text: &str) -> StreamEvent {
    StreamEvent::ThinkingDelta {
        content: text.to_string(),
    }
}

pub fn text(content: &str) -> StreamEvent {
    StreamEvent::TextDelta {
        content: content.to_string(),
    }
}

pub fn usage(input: u32, output: u32, thinking_tokens: Option<u32>) -> StreamEvent {
    StreamEvent::Usage {
        input_tokens: input,
        output_tokens: output,
        thinking_tokens,
    }
}

/// Drain a response stream to completion.
pub async fn collect(stream: &mut ResponseStream) -> Vec<PipelineEvent> {
    let mut events = Vec::new();
    while let Some(event) = stream.next().await {
        events.push(event);
    }
    events
}
