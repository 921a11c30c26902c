//! Wire types for both sides of the bridge.
//!
//! `openai` is the downstream (client-facing) chat-completions dialect,
//! `engine` is the upstream conversation API and its stream frame protocol.

pub mod engine;
pub mod openai;
pub mod sse;
