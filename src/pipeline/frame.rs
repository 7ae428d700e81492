//! Chunk Framing
//!
//! Wraps every text increment from either stage into a uniform envelope
//! carrying phase, session identity, and timing metadata, and encodes
//! framed events in the OpenAI `chat.completion.chunk` SSE dialect the
//! original composite endpoints speak.

use serde::{Deserialize, Serialize};

/// Which stage produced a chunk's text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Chain-of-thought text from the reasoner
    Reasoning,
    /// Answer text from the summarizer
    Content,
}

/// The externally visible unit of streamed output. Immutable once framed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundChunk {
    /// Session identifier shared by every chunk of one composed request
    pub id: String,
    /// Session creation time (unix seconds), identical across the session
    pub created: u64,
    /// Model that produced this text
    pub model: String,
    /// Producing phase
    pub phase: Phase,
    /// The text increment
    pub text: String,
}

impl OutboundChunk {
    /// Frame a text increment. Pure; no state, no failure modes.
    pub fn new(
        id: &str,
        created: u64,
        model: &str,
        phase: Phase,
        text: impl Into<String>,
    ) -> Self {
        Self {
            id: id.to_string(),
            created,
            model: model.to_string(),
            phase,
            text: text.into(),
        }
    }

    /// Encode as one SSE data frame in the OpenAI chunk dialect:
    /// reasoning text rides in `delta.reasoning_content`, answer text in
    /// `delta.content`, with the other field left empty.
    pub fn to_sse(&self) -> String {
        let (reasoning, content) = match self.phase {
            Phase::Reasoning => (self.text.as_str(), ""),
            Phase::Content => ("", self.text.as_str()),
        };
        let wire = ChunkWire {
            id: &self.id,
            object: "chat.completion.chunk",
            created: self.created,
            model: &self.model,
            choices: [ChoiceWire {
                index: 0,
                delta: DeltaWire {
                    role: "assistant",
                    reasoning_content: reasoning,
                    content,
                },
            }],
        };
        // Serializing a struct of plain strings cannot fail.
        let json = serde_json::to_string(&wire).expect("serialize outbound chunk");
        format!("data: {}\n\n", json)
    }
}

/// One item of the composed output stream: a data chunk or the terminal
/// marker. The marker is emitted exactly once, after both stages finish.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    Chunk(OutboundChunk),
    Done,
}

/// The terminal SSE frame, unambiguously distinct from any data frame.
pub const DONE_FRAME: &str = "data: [DONE]\n\n";

impl PipelineEvent {
    /// Encode as an SSE frame.
    pub fn to_sse(&self) -> String {
        match self {
            PipelineEvent::Chunk(chunk) => chunk.to_sse(),
            PipelineEvent::Done => DONE_FRAME.to_string(),
        }
    }

    /// Whether this is the terminal marker.
    pub fn is_done(&self) -> bool {
        matches!(self, PipelineEvent::Done)
    }
}

#[derive(Serialize)]
struct ChunkWire<'a> {
    id: &'a str,
    object: &'static str,
    created: u64,
    model: &'a str,
    choices: [ChoiceWire<'a>; 1],
}

#[derive(Serialize)]
struct ChoiceWire<'a> {
    index: u32,
    delta: DeltaWire<'a>,
}

#[derive(Serialize)]
struct DeltaWire<'a> {
    role: &'static str,
    reasoning_content: &'a str,
    content: &'a str,
}
