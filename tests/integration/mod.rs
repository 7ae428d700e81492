//! Integration Tests Module
//!
//! End-to-end tests for the streaming composition pipeline, driven through
//! scripted in-memory providers so no network is involved. Covers chunk
//! ordering and phase tagging, the trace handoff, degraded-mode behavior,
//! validation failures, token accounting, SSE encoding, and cancellation.

// Scripted provider doubles shared by the test modules
mod common;

// Full pipeline behavior tests
mod pipeline_test;

// Outbound framing and SSE encoding over a full session
mod sse_test;
