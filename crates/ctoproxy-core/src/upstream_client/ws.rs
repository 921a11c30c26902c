use std::error::Error as _;

use async_trait::async_trait;
use futures_util::StreamExt;
use tokio_tungstenite::tungstenite::Error as WsError;
use tokio_tungstenite::tungstenite::error::ProtocolError;
use tracing::debug;
use wreq::Client;
use wreq::ws::WebSocket;
use wreq::ws::message::{CloseCode, Message};

use ctoproxy_provider_core::{ChannelConnector, Connected, FrameChannel, Headers, Received};

use super::{UpstreamClientConfig, build_client};

pub const MAX_FRAME_BYTES: usize = 1 << 20;

/// Opens push channels over WebSocket using the same emulated client stack
/// as plain HTTP calls.
#[derive(Clone)]
pub struct WreqChannelConnector {
    client: Client,
}

impl WreqChannelConnector {
    pub fn new(config: &UpstreamClientConfig) -> Result<Self, wreq::Error> {
        Ok(Self {
            client: build_client(config)?,
        })
    }
}

/// Closure, resets and timeouts end a stream quietly; everything else is a
/// fault.
fn is_graceful(err: &wreq::Error) -> bool {
    if err.is_timeout() || err.is_connection_reset() {
        return true;
    }
    let mut source = err.source();
    while let Some(cause) = source {
        if let Some(ws) = cause.downcast_ref::<WsError>() {
            return is_closure(ws);
        }
        source = cause.source();
    }
    false
}

fn is_closure(err: &WsError) -> bool {
    matches!(
        err,
        WsError::ConnectionClosed
            | WsError::AlreadyClosed
            | WsError::Protocol(ProtocolError::ResetWithoutClosingHandshake)
    )
}

#[async_trait]
impl ChannelConnector for WreqChannelConnector {
    async fn connect(&self, url: &str, headers: &Headers) -> Connected {
        let mut builder = self
            .client
            .websocket(url)
            .max_message_size(MAX_FRAME_BYTES);
        for (k, v) in headers {
            builder = builder.header(k, v);
        }

        let upgraded = match builder.send().await {
            Ok(response) => response.into_websocket().await,
            Err(err) => Err(err),
        };
        match upgraded {
            Ok(socket) => Connected::Open(Box::new(WreqFrameChannel {
                socket: Some(socket),
            })),
            Err(err) if is_graceful(&err) => {
                debug!(event = "stream_connect_ended", error = %err);
                Connected::GracefulEnd
            }
            Err(err) => Connected::Fault(err.to_string()),
        }
    }
}

struct WreqFrameChannel {
    socket: Option<WebSocket>,
}

#[async_trait]
impl FrameChannel for WreqFrameChannel {
    async fn receive(&mut self) -> Received {
        let Some(socket) = self.socket.as_mut() else {
            return Received::GracefulEnd;
        };
        loop {
            match socket.next().await {
                Some(Ok(Message::Text(text))) => return Received::Frame(text.to_string()),
                Some(Ok(Message::Binary(bytes))) => {
                    return Received::Frame(String::from_utf8_lossy(&bytes).into_owned());
                }
                Some(Ok(Message::Close(_))) | None => return Received::GracefulEnd,
                Some(Ok(_)) => continue,
                Some(Err(err)) if is_graceful(&err) => {
                    debug!(event = "stream_channel_ended", error = %err);
                    return Received::GracefulEnd;
                }
                Some(Err(err)) => return Received::Fault(err.to_string()),
            }
        }
    }

    async fn close(&mut self) {
        if let Some(mut socket) = self.socket.take() {
            if let Err(err) = socket.close(CloseCode::NORMAL, "").await {
                debug!(event = "stream_close_failed", error = %err);
            }
        }
    }
}
