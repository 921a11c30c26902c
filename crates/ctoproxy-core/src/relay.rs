use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use futures_util::stream::{self, BoxStream};
use futures_util::{Stream, StreamExt};
use tracing::debug;

use ctoproxy_protocol::engine::{StreamFrame, chat_content, decode_frame};
use ctoproxy_provider_core::{
    ChannelConnector, ClientError, ClientResult, Connected, FrameChannel, Headers, Received,
};

use crate::endpoints::Endpoints;
use crate::fingerprint::HeaderBuilder;

/// Lazy, single-pass sequence of text increments for one conversation.
///
/// Nothing is opened until the first poll. Dropping the stream releases the
/// underlying channel.
pub struct ContentStream {
    inner: BoxStream<'static, ClientResult<String>>,
}

impl ContentStream {
    /// Drains the stream into one string, stopping at the first error.
    pub async fn collect_text(mut self) -> ClientResult<String> {
        let mut text = String::new();
        while let Some(item) = self.next().await {
            text.push_str(&item?);
        }
        Ok(text)
    }
}

impl Stream for ContentStream {
    type Item = ClientResult<String>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_next_unpin(cx)
    }
}

impl std::fmt::Debug for ContentStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ContentStream")
    }
}

pub struct StreamRelay<'a> {
    pub channels: &'a Arc<dyn ChannelConnector>,
    pub endpoints: &'a Endpoints,
    pub headers: &'a dyn HeaderBuilder,
    /// Bounds the connect and every individual read.
    pub idle_timeout: Duration,
}

impl StreamRelay<'_> {
    pub fn stream(&self, conversation_id: &str, stream_token: &str) -> ContentStream {
        let referer = self.endpoints.site_referer();
        let state = RelayState {
            conversation_id: conversation_id.to_string(),
            idle_timeout: self.idle_timeout,
            phase: Phase::Connecting {
                connector: Arc::clone(self.channels),
                url: self.endpoints.stream_url(conversation_id, stream_token),
                headers: self.headers.build_stream_headers(
                    Some(self.endpoints.site_origin.as_str()),
                    Some(referer.as_str()),
                    &[],
                ),
            },
        };
        ContentStream {
            inner: stream::unfold(state, advance).boxed(),
        }
    }
}

enum Phase {
    Connecting {
        connector: Arc<dyn ChannelConnector>,
        url: String,
        headers: Headers,
    },
    Reading(Box<dyn FrameChannel>),
    Finished,
}

struct RelayState {
    conversation_id: String,
    idle_timeout: Duration,
    phase: Phase,
}

fn channel_error(message: &str) -> ClientError {
    ClientError::api(format!("stream channel failed: {message}"))
}

async fn advance(mut state: RelayState) -> Option<(ClientResult<String>, RelayState)> {
    loop {
        match std::mem::replace(&mut state.phase, Phase::Finished) {
            Phase::Finished => return None,
            Phase::Connecting {
                connector,
                url,
                headers,
            } => {
                let connected =
                    tokio::time::timeout(state.idle_timeout, connector.connect(&url, &headers))
                        .await;
                match connected {
                    Err(_) => {
                        debug!(event = "stream_connect_timeout", conversation_id = %state.conversation_id);
                        return None;
                    }
                    Ok(Connected::GracefulEnd) => return None,
                    Ok(Connected::Fault(message)) => {
                        return Some((Err(channel_error(&message)), state));
                    }
                    Ok(Connected::Open(channel)) => state.phase = Phase::Reading(channel),
                }
            }
            Phase::Reading(mut channel) => {
                let received =
                    match tokio::time::timeout(state.idle_timeout, channel.receive()).await {
                        Ok(received) => received,
                        Err(_) => {
                            debug!(event = "stream_idle_timeout", conversation_id = %state.conversation_id);
                            channel.close().await;
                            return None;
                        }
                    };
                match received {
                    Received::Frame(text) => match decode_frame(&text) {
                        Some(StreamFrame::Update { buffer }) => {
                            state.phase = Phase::Reading(channel);
                            if let Some(content) = chat_content(&buffer) {
                                return Some((Ok(content), state));
                            }
                        }
                        Some(frame) if frame.is_terminal() => {
                            channel.close().await;
                            return None;
                        }
                        Some(_) => state.phase = Phase::Reading(channel),
                        None => {
                            debug!(event = "stream_frame_skipped", conversation_id = %state.conversation_id);
                            state.phase = Phase::Reading(channel);
                        }
                    },
                    Received::GracefulEnd => {
                        channel.close().await;
                        return None;
                    }
                    Received::Fault(message) => {
                        channel.close().await;
                        return Some((Err(channel_error(&message)), state));
                    }
                }
            }
        }
    }
}
