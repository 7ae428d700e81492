//! Reason Relay - Streaming Composition Pipeline
//!
//! Composes two streaming chat backends into one pipelined response:
//! - a **reasoner** model streams a chain-of-thought trace to the caller as
//!   it is produced, while the trace is accumulated;
//! - once the trace is complete it is injected into the prompt of a
//!   **summarizer** model, whose streamed answer follows in the same output
//!   stream.
//!
//! Every outbound chunk is framed with the session id, creation timestamp,
//! producing model, and phase (`reasoning` vs `content`); the stream ends
//! with exactly one terminal marker.

pub mod config;
pub mod pipeline;

pub use config::{EndpointSettings, RelayConfig};
pub use pipeline::composer::{ComposeRequest, PipelineOptions, ResponseStream, StreamComposer};
pub use pipeline::frame::{OutboundChunk, Phase, PipelineEvent};
pub use pipeline::tally::TokenTally;
