//! Stream Composer
//!
//! Owns the lifetime of one composed request: generates the session
//! identity, spawns the two stage tasks onto one shared output channel,
//! forwards their framed chunks to the caller in arrival order, and emits
//! one terminal marker after both end-of-stage sentinels have been seen.
//!
//! Within a stage, chunk order is preserved; across stages the interleaving
//! reflects real arrival time. In practice the summarization stage cannot
//! produce output before the trace is handed off, so the observed order is
//! "all reasoning, then answer" as an emergent property, not an enforced
//! one.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{SystemTime, UNIX_EPOCH};

use futures_util::Stream;
use tokio::sync::{mpsc, oneshot};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info};

use reason_relay_llm::{GenerationParams, Message, StreamingChat};

use super::frame::PipelineEvent;
use super::reasoning::ReasoningStage;
use super::stage::{PipelineItem, StageContext};
use super::summarize::SummaryStage;
use super::tally::TokenTally;

/// Pipeline behavior flags.
#[derive(Debug, Clone, Copy)]
pub struct PipelineOptions {
    /// When the reasoner lacks native reasoning separation, rewrite the
    /// last user message to request explicit step-by-step reasoning.
    pub request_step_by_step: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            request_step_by_step: true,
        }
    }
}

/// One composed request.
#[derive(Debug, Clone)]
pub struct ComposeRequest {
    /// Ordered conversation; the last message must come from the user for
    /// the summarization stage to run.
    pub messages: Vec<Message>,
    /// Generation parameters applied to both stages.
    pub params: GenerationParams,
    /// Model driven by the reasoning stage.
    pub reasoner_model: String,
    /// Model driven by the summarization stage.
    pub summarizer_model: String,
}

/// Composes the reasoning and summarization stages into one ordered
/// outbound stream. Stateless across requests; each `run` creates an
/// isolated session.
pub struct StreamComposer {
    reasoner: Arc<dyn StreamingChat>,
    summarizer: Arc<dyn StreamingChat>,
    options: PipelineOptions,
}

impl StreamComposer {
    /// Create a composer over the two providers.
    pub fn new(reasoner: Arc<dyn StreamingChat>, summarizer: Arc<dyn StreamingChat>) -> Self {
        Self {
            reasoner,
            summarizer,
            options: PipelineOptions::default(),
        }
    }

    /// Override the default pipeline options.
    pub fn with_options(mut self, options: PipelineOptions) -> Self {
        self.options = options;
        self
    }

    /// Run one composed request, returning the ordered event stream.
    ///
    /// Dropping the returned stream cancels both stages and releases their
    /// provider connections; no work outlives the session.
    pub fn run(&self, request: ComposeRequest) -> ResponseStream {
        let (session_id, created) = new_session_identity();
        info!(
            session = %session_id,
            reasoner = %request.reasoner_model,
            summarizer = %request.summarizer_model,
            "starting composed session"
        );

        let cancel = CancellationToken::new();
        let (item_tx, mut item_rx) = mpsc::unbounded_channel::<PipelineItem>();
        let (trace_tx, trace_rx) = oneshot::channel::<String>();
        let reasoner_tokens = Arc::new(TokenTally::new());
        let summarizer_tokens = Arc::new(TokenTally::new());

        let reasoning_ctx = StageContext {
            session_id: session_id.clone(),
            created,
            model: request.reasoner_model.clone(),
            out: item_tx.clone(),
            cancel: cancel.clone(),
            tally: Arc::clone(&reasoner_tokens),
        };
        let summary_ctx = StageContext {
            session_id: session_id.clone(),
            created,
            model: request.summarizer_model.clone(),
            out: item_tx,
            cancel: cancel.clone(),
            tally: Arc::clone(&summarizer_tokens),
        };

        let reasoning = ReasoningStage::new(
            Arc::clone(&self.reasoner),
            &request.reasoner_model,
            self.options.request_step_by_step,
        );
        let summary = SummaryStage::new(Arc::clone(&self.summarizer), &request.summarizer_model);

        let reasoning_handle = tokio::spawn(reasoning.run(
            request.messages.clone(),
            request.params,
            reasoning_ctx,
            trace_tx,
        ));
        let summary_handle =
            tokio::spawn(summary.run(request.messages, request.params, summary_ctx, trace_rx));

        let (out_tx, out_rx) = mpsc::unbounded_channel::<PipelineEvent>();
        let pump_cancel = cancel.clone();
        let pump_session = session_id.clone();
        let pump_reasoner_tokens = Arc::clone(&reasoner_tokens);
        let pump_summarizer_tokens = Arc::clone(&summarizer_tokens);

        tokio::spawn(async move {
            let mut sentinels = 0u8;
            while sentinels < 2 {
                match item_rx.recv().await {
                    Some(PipelineItem::Chunk(chunk)) => {
                        if out_tx.send(PipelineEvent::Chunk(chunk)).is_err() {
                            // Caller abandoned the stream; tear both
                            // stages down at their next suspension point.
                            pump_cancel.cancel();
                        }
                    }
                    Some(PipelineItem::StageDone(kind)) => {
                        sentinels += 1;
                        debug!(session = %pump_session, stage = %kind, sentinels, "sentinel observed");
                    }
                    None => break,
                }
            }

            let _ = out_tx.send(PipelineEvent::Done);

            // Both sentinels are in; joining the handles guarantees no
            // dangling work before the session is declared complete.
            let _ = reasoning_handle.await;
            let _ = summary_handle.await;
            info!(
                session = %pump_session,
                reasoner_tokens = pump_reasoner_tokens.get(),
                summarizer_tokens = pump_summarizer_tokens.get(),
                "session complete"
            );
        });

        ResponseStream {
            session_id,
            created,
            events: UnboundedReceiverStream::new(out_rx),
            reasoner_tokens,
            summarizer_tokens,
            _cancel_guard: cancel.drop_guard(),
        }
    }
}

/// The ordered outbound event stream for one session.
///
/// Yields framed data chunks in arrival order, then exactly one
/// `PipelineEvent::Done`, then ends. Dropping it cancels the session.
pub struct ResponseStream {
    session_id: String,
    created: u64,
    events: UnboundedReceiverStream<PipelineEvent>,
    reasoner_tokens: Arc<TokenTally>,
    summarizer_tokens: Arc<TokenTally>,
    _cancel_guard: DropGuard,
}

impl ResponseStream {
    /// Session identifier stamped on every chunk.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Session creation time (unix seconds).
    pub fn created(&self) -> u64 {
        self.created
    }

    /// Tokens consumed by the reasoner so far.
    pub fn reasoner_tokens(&self) -> u64 {
        self.reasoner_tokens.get()
    }

    /// Tokens consumed by the summarizer so far.
    pub fn summarizer_tokens(&self) -> u64 {
        self.summarizer_tokens.get()
    }
}

impl Stream for ResponseStream {
    type Item = PipelineEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.events).poll_next(cx)
    }
}

/// Generate the session identity: an id in the `chatcmpl-<hex millis>`
/// form and the creation timestamp in unix seconds.
fn new_session_identity() -> (String, u64) {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    (format!("chatcmpl-{:x}", now.as_millis()), now.as_secs())
}
