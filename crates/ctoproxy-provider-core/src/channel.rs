use async_trait::async_trait;

use crate::headers::Headers;

/// Outcome of one read from a stream channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Received {
    /// A text frame. Binary frames are delivered lossily decoded.
    Frame(String),
    /// The peer closed the channel or the connection dropped quietly.
    GracefulEnd,
    /// Anything else that went wrong on the wire.
    Fault(String),
}

pub enum Connected {
    Open(Box<dyn FrameChannel>),
    GracefulEnd,
    Fault(String),
}

impl std::fmt::Debug for Connected {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Connected::Open(_) => f.write_str("Open"),
            Connected::GracefulEnd => f.write_str("GracefulEnd"),
            Connected::Fault(message) => f.debug_tuple("Fault").field(message).finish(),
        }
    }
}

/// One open push channel. `receive` waits indefinitely; callers apply
/// their own idle deadline.
#[async_trait]
pub trait FrameChannel: Send {
    async fn receive(&mut self) -> Received;

    /// Idempotent. Also implied by dropping the channel.
    async fn close(&mut self);
}

#[async_trait]
pub trait ChannelConnector: Send + Sync {
    async fn connect(&self, url: &str, headers: &Headers) -> Connected;
}
