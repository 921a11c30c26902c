//! OpenAI-compatible HTTP surface over the session client.

pub mod error;
mod gateway;
pub mod models;
pub mod prompt;
mod stream;
pub mod usage;

pub use gateway::{GatewayState, gateway_router};
