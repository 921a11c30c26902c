#![allow(dead_code)]

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::{Value, json};

use ctoproxy_common::GlobalConfigPatch;
use ctoproxy_core::{Endpoints, UpstreamHandles};
use ctoproxy_provider_core::{
    ChannelConnector, Connected, FrameChannel, Headers, Received, UpstreamClient, UpstreamFailure,
    UpstreamHttpRequest, UpstreamHttpResponse, UpstreamTransportErrorKind,
};

/// Canned HTTP upstream: the first route whose fragment occurs in the URL
/// answers. Every request is recorded.
#[derive(Default)]
pub struct FakeUpstream {
    routes: Mutex<Vec<(String, u16, String)>>,
    pub requests: Mutex<Vec<UpstreamHttpRequest>>,
}

impl FakeUpstream {
    pub fn route(&self, fragment: &str, status: u16, body: Value) -> &Self {
        self.routes
            .lock()
            .unwrap()
            .push((fragment.to_string(), status, body.to_string()));
        self
    }

    pub fn route_raw(&self, fragment: &str, status: u16, body: &str) -> &Self {
        self.routes
            .lock()
            .unwrap()
            .push((fragment.to_string(), status, body.to_string()));
        self
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn urls(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|req| req.url.clone())
            .collect()
    }

    pub fn request_to(&self, fragment: &str) -> Option<UpstreamHttpRequest> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .find(|req| req.url.contains(fragment))
            .cloned()
    }

    /// Routes for a healthy identity provider and chat API.
    pub fn healthy() -> Arc<Self> {
        let upstream = Arc::new(Self::default());
        upstream
            .route(
                "/v1/client/sessions/sess_1/touch",
                200,
                json!({"jwt": "touched"}),
            )
            .route("/v1/client/sessions/sess_1/tokens", 200, json!({"jwt": "jwt_fresh"}))
            .route("/v1/client?", 200, client_document())
            .route("/chat", 200, json!({"ok": true}));
        upstream
    }
}

pub fn client_document() -> Value {
    json!({
        "response": {
            "last_active_session_id": "sess_1",
            "last_active_organization_id": "org_1",
            "sessions": [{
                "id": "sess_1",
                "ws_user_token": "ws_tok",
                "last_active_token": {"jwt": "jwt_old"}
            }]
        }
    })
}

impl UpstreamClient for FakeUpstream {
    fn send<'a>(
        &'a self,
        req: UpstreamHttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<UpstreamHttpResponse, UpstreamFailure>> + Send + 'a>>
    {
        Box::pin(async move {
            self.requests.lock().unwrap().push(req.clone());
            let routes = self.routes.lock().unwrap();
            let Some((_, status, body)) = routes
                .iter()
                .find(|(fragment, _, _)| req.url.contains(fragment.as_str()))
            else {
                return Err(UpstreamFailure {
                    kind: UpstreamTransportErrorKind::Connect,
                    message: format!("no route for {}", req.url),
                });
            };
            Ok(UpstreamHttpResponse {
                status: *status,
                headers: Vec::new(),
                body: Bytes::from(body.clone()),
            })
        })
    }
}

#[derive(Debug, Clone)]
pub enum Step {
    Frame(String),
    End,
    Fault(String),
}

pub fn update(content: &str) -> Step {
    let buffer = json!({"type": "chat", "chat": {"content": content}}).to_string();
    Step::Frame(json!({"type": "update", "buffer": buffer}).to_string())
}

pub fn state(in_progress: bool) -> Step {
    Step::Frame(json!({"type": "state", "state": {"inProgress": in_progress}}).to_string())
}

pub fn raw(text: &str) -> Step {
    Step::Frame(text.to_string())
}

/// Observations shared between a test and the channels it handed out.
#[derive(Default)]
pub struct ChannelProbe {
    pub connects: AtomicUsize,
    pub closed: AtomicBool,
    pub dropped: AtomicBool,
    pub urls: Mutex<Vec<String>>,
    pub headers: Mutex<Vec<Headers>>,
}

/// Connector that replays a fixed script. Once the script runs out the
/// channel stays silent forever.
pub struct ScriptedConnector {
    script: Vec<Step>,
    refusal: Option<Step>,
    pub probe: Arc<ChannelProbe>,
}

impl ScriptedConnector {
    pub fn new(script: Vec<Step>) -> Arc<Self> {
        Arc::new(Self {
            script,
            refusal: None,
            probe: Arc::new(ChannelProbe::default()),
        })
    }

    /// Connect itself ends with `Step::End` or `Step::Fault`.
    pub fn refusing(outcome: Step) -> Arc<Self> {
        Arc::new(Self {
            script: Vec::new(),
            refusal: Some(outcome),
            probe: Arc::new(ChannelProbe::default()),
        })
    }
}

#[async_trait]
impl ChannelConnector for ScriptedConnector {
    async fn connect(&self, url: &str, headers: &Headers) -> Connected {
        self.probe.connects.fetch_add(1, Ordering::SeqCst);
        self.probe.urls.lock().unwrap().push(url.to_string());
        self.probe.headers.lock().unwrap().push(headers.clone());
        match &self.refusal {
            Some(Step::End) => return Connected::GracefulEnd,
            Some(Step::Fault(message)) => return Connected::Fault(message.clone()),
            _ => {}
        }
        Connected::Open(Box::new(ScriptedChannel {
            steps: self.script.clone().into_iter(),
            probe: Arc::clone(&self.probe),
        }))
    }
}

struct ScriptedChannel {
    steps: std::vec::IntoIter<Step>,
    probe: Arc<ChannelProbe>,
}

#[async_trait]
impl FrameChannel for ScriptedChannel {
    async fn receive(&mut self) -> Received {
        match self.steps.next() {
            Some(Step::Frame(text)) => Received::Frame(text),
            Some(Step::End) => Received::GracefulEnd,
            Some(Step::Fault(message)) => Received::Fault(message),
            None => std::future::pending::<Received>().await,
        }
    }

    async fn close(&mut self) {
        self.probe.closed.store(true, Ordering::SeqCst);
    }
}

impl Drop for ScriptedChannel {
    fn drop(&mut self) {
        self.probe.dropped.store(true, Ordering::SeqCst);
    }
}

pub fn endpoints() -> Endpoints {
    let mut config = GlobalConfigPatch::default().into_config().unwrap();
    config.identity_base_url = "https://identity.test".to_string();
    config.api_base_url = "https://api.test/engine-agent".to_string();
    config.stream_base_url = "wss://api.test/engine-agent".to_string();
    config.site_origin = "https://site.test".to_string();
    Endpoints::from_global(&config)
}

pub fn handles(http: Arc<FakeUpstream>, channels: Arc<ScriptedConnector>) -> UpstreamHandles {
    UpstreamHandles {
        http,
        channels,
        endpoints: Arc::new(endpoints()),
        stream_idle_timeout: Duration::from_secs(30),
    }
}
