//! Shared Stage Plumbing
//!
//! The context handed to both stage tasks: session identity for framing,
//! the shared output channel, the cancellation token, and the stage's token
//! tally. Stages communicate with the composer exclusively through
//! `PipelineItem`s: data chunks while streaming, one sentinel when done.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use reason_relay_llm::UsageStats;

use super::frame::{OutboundChunk, Phase};
use super::tally::TokenTally;

/// Which stage an item came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StageKind {
    Reasoning,
    Summary,
}

impl std::fmt::Display for StageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StageKind::Reasoning => write!(f, "reasoning"),
            StageKind::Summary => write!(f, "summary"),
        }
    }
}

/// One item on the composer's output channel. The sentinel is distinct
/// from data so the composer can count stage completions without
/// inspecting chunk contents.
#[derive(Debug)]
pub(crate) enum PipelineItem {
    Chunk(OutboundChunk),
    StageDone(StageKind),
}

/// Per-stage handle onto one session.
#[derive(Clone)]
pub(crate) struct StageContext {
    /// Session identifier stamped on every chunk
    pub session_id: String,
    /// Session creation time (unix seconds)
    pub created: u64,
    /// Model label stamped on this stage's chunks
    pub model: String,
    /// Shared output channel into the composer
    pub out: mpsc::UnboundedSender<PipelineItem>,
    /// Session-wide cancellation signal
    pub cancel: CancellationToken,
    /// This stage's provider token tally
    pub tally: Arc<TokenTally>,
}

impl StageContext {
    /// Frame a text increment and forward it immediately.
    pub fn emit(&self, phase: Phase, text: impl Into<String>) {
        let chunk = OutboundChunk::new(&self.session_id, self.created, &self.model, phase, text);
        // The receiver lives until both sentinels arrive; a send failure
        // only means the session is already tearing down.
        let _ = self.out.send(PipelineItem::Chunk(chunk));
    }

    /// Record a cumulative usage snapshot on this stage's tally.
    pub fn observe_usage(
        &self,
        input_tokens: u32,
        output_tokens: u32,
        thinking_tokens: Option<u32>,
    ) {
        let usage = UsageStats {
            input_tokens,
            output_tokens,
            thinking_tokens,
        };
        self.tally.observe_total(usage.total_tokens() as u64);
    }

    /// Push this stage's end-of-stage sentinel.
    pub fn finish(&self, kind: StageKind) {
        debug!(session = %self.session_id, stage = %kind, "stage finished");
        let _ = self.out.send(PipelineItem::StageDone(kind));
    }
}
