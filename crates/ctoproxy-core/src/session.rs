use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use ctoproxy_common::GlobalConfig;
use ctoproxy_provider_core::{ChannelConnector, ClientError, ClientResult, Credential, UpstreamClient};

use crate::conversation::ConversationClient;
use crate::endpoints::Endpoints;
use crate::fingerprint::{BrowserFingerprint, HeaderBuilder};
use crate::identity::{IdentityHandshake, Session};
use crate::relay::{ContentStream, StreamRelay};
use crate::upstream_client::{UpstreamClientConfig, WreqChannelConnector, WreqUpstreamClient};

/// Process-wide transport handles. Cheap to clone; shared by every
/// controller.
#[derive(Clone)]
pub struct UpstreamHandles {
    pub http: Arc<dyn UpstreamClient>,
    pub channels: Arc<dyn ChannelConnector>,
    pub endpoints: Arc<Endpoints>,
    pub stream_idle_timeout: Duration,
}

impl UpstreamHandles {
    pub fn from_global(global: &GlobalConfig) -> Result<Self, wreq::Error> {
        let config = UpstreamClientConfig::from_global(global);
        Ok(Self {
            http: Arc::new(WreqUpstreamClient::new(&config)?),
            channels: Arc::new(WreqChannelConnector::new(&config)?),
            endpoints: Arc::new(Endpoints::from_global(global)),
            stream_idle_timeout: Duration::from_secs(global.stream_idle_timeout_secs),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    Authenticated(Session),
}

/// Drives one credential from unauthenticated to streaming. One controller
/// per inbound request; never shared between tasks.
pub struct SessionController {
    credential: Credential,
    upstream: UpstreamHandles,
    headers: Arc<dyn HeaderBuilder>,
    state: SessionState,
}

impl SessionController {
    pub fn new(credential: Credential, upstream: UpstreamHandles) -> Self {
        Self::with_headers(credential, upstream, Arc::new(BrowserFingerprint::random()))
    }

    pub fn with_headers(
        credential: Credential,
        upstream: UpstreamHandles,
        headers: Arc<dyn HeaderBuilder>,
    ) -> Self {
        Self {
            credential,
            upstream,
            headers,
            state: SessionState::Unauthenticated,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.state, SessionState::Authenticated(_))
    }

    fn handshake(&self) -> IdentityHandshake<'_> {
        IdentityHandshake {
            http: self.upstream.http.as_ref(),
            endpoints: &self.upstream.endpoints,
            headers: self.headers.as_ref(),
        }
    }

    /// Resolves the session and renews its access token. No-op once
    /// authenticated.
    pub async fn authenticate(&mut self) -> ClientResult<()> {
        if self.is_authenticated() {
            return Ok(());
        }
        let handshake = self.handshake();
        let resolved = handshake.resolve_session(&self.credential).await?;
        let session = handshake
            .refresh_access_token(&self.credential, &resolved)
            .await?;
        info!(event = "session_authenticated", session_id = %session.session_id);
        self.state = SessionState::Authenticated(session);
        Ok(())
    }

    async fn session(&mut self) -> ClientResult<&Session> {
        self.authenticate().await?;
        match &self.state {
            SessionState::Authenticated(session) => Ok(session),
            SessionState::Unauthenticated => Err(ClientError::auth("session is not authenticated")),
        }
    }

    /// Starts a new, independent conversation and returns its id.
    pub async fn create_conversation(&mut self, prompt: &str, adapter: &str) -> ClientResult<String> {
        let http = Arc::clone(&self.upstream.http);
        let endpoints = Arc::clone(&self.upstream.endpoints);
        let headers = Arc::clone(&self.headers);
        let session = self.session().await?;
        ConversationClient {
            http: http.as_ref(),
            endpoints: &endpoints,
            headers: headers.as_ref(),
        }
        .create_conversation(session, prompt, adapter)
        .await
    }

    /// Opens the content stream for `conversation_id`. The stream is lazy:
    /// the channel is connected on first poll.
    pub async fn stream_response(&mut self, conversation_id: &str) -> ClientResult<ContentStream> {
        let stream_token = self.session().await?.stream_token.clone();
        let relay = StreamRelay {
            channels: &self.upstream.channels,
            endpoints: &self.upstream.endpoints,
            headers: self.headers.as_ref(),
            idle_timeout: self.upstream.stream_idle_timeout,
        };
        Ok(relay.stream(conversation_id, &stream_token))
    }
}
