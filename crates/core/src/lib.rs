//! Reason Relay Core
//!
//! Foundational error types, stream event types, and proxy configuration for
//! the Reason Relay workspace. This crate has zero dependencies on
//! application-level code (pipeline, providers, HTTP clients).
//!
//! ## Module Organization
//!
//! - `error` - Core error types (`CoreError`, `CoreResult`)
//! - `proxy` - Proxy configuration data types shared across workspace crates
//! - `streaming` - Unified stream event types and adapter trait
//!
//! ## Design Principles
//!
//! 1. **Minimal dependencies (serde/thiserror/url)** - keeps build times low
//! 2. **Trait-based abstractions** - enables mocking and testing
//! 3. **Unidirectional dependency** - this crate depends on nothing else in
//!    the workspace

pub mod error;
pub mod proxy;
pub mod streaming;

// ── Error Types ────────────────────────────────────────────────────────
pub use error::{CoreError, CoreResult};

// ── Proxy Types ────────────────────────────────────────────────────────
pub use proxy::{ProxyConfig, ProxyProtocol};

// ── Streaming Types ────────────────────────────────────────────────────
pub use streaming::{AdapterError, StreamAdapter, StreamEvent};
