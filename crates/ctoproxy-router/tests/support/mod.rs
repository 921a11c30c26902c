#![allow(dead_code)]

use std::future::Future;
use std::io::Write;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::{Value, json};
use tempfile::NamedTempFile;

use ctoproxy_common::{DEFAULT_ADAPTER, GlobalConfigPatch, default_model_adapters};
use ctoproxy_core::{Endpoints, UpstreamHandles};
use ctoproxy_provider_core::{
    ChannelConnector, Connected, CredentialPool, FrameChannel, Headers, Received, UpstreamClient,
    UpstreamFailure, UpstreamHttpRequest, UpstreamHttpResponse, UpstreamTransportErrorKind,
};
use ctoproxy_router::models::ModelTable;
use ctoproxy_router::{GatewayState, gateway_router};

/// Canned identity provider and chat API, matched by URL fragment.
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

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn request_to(&self, fragment: &str) -> Option<UpstreamHttpRequest> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .find(|req| req.url.contains(fragment))
            .cloned()
    }

    pub fn healthy() -> Arc<Self> {
        let upstream = Arc::new(Self::default());
        upstream
            .route("/v1/client/sessions/sess_1/touch", 200, json!({}))
            .route("/v1/client/sessions/sess_1/tokens", 200, json!({"jwt": "jwt_fresh"}))
            .route(
                "/v1/client?",
                200,
                json!({
                    "response": {
                        "last_active_session_id": "sess_1",
                        "last_active_organization_id": "org_1",
                        "sessions": [{"id": "sess_1", "ws_user_token": "ws_tok"}]
                    }
                }),
            )
            .route("/chat", 200, json!({"ok": true}));
        upstream
    }
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

pub fn finished() -> Step {
    Step::Frame(json!({"type": "state", "state": {"inProgress": false}}).to_string())
}

/// Replays the same script on every connect.
pub struct ScriptedConnector {
    script: Vec<Step>,
    pub connects: Mutex<Vec<String>>,
}

impl ScriptedConnector {
    pub fn new(script: Vec<Step>) -> Arc<Self> {
        Arc::new(Self {
            script,
            connects: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl ChannelConnector for ScriptedConnector {
    async fn connect(&self, url: &str, _headers: &Headers) -> Connected {
        self.connects.lock().unwrap().push(url.to_string());
        Connected::Open(Box::new(ScriptedChannel {
            steps: self.script.clone().into_iter(),
        }))
    }
}

struct ScriptedChannel {
    steps: std::vec::IntoIter<Step>,
}

#[async_trait]
impl FrameChannel for ScriptedChannel {
    async fn receive(&mut self) -> Received {
        match self.steps.next() {
            Some(Step::Frame(text)) => Received::Frame(text),
            Some(Step::Fault(message)) => Received::Fault(message),
            Some(Step::End) | None => Received::GracefulEnd,
        }
    }

    async fn close(&mut self) {}
}

pub fn cookie_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn endpoints() -> Endpoints {
    let mut config = GlobalConfigPatch::default().into_config().unwrap();
    config.identity_base_url = "https://identity.test".to_string();
    config.api_base_url = "https://api.test/engine-agent".to_string();
    config.stream_base_url = "wss://api.test/engine-agent".to_string();
    config.site_origin = "https://site.test".to_string();
    Endpoints::from_global(&config)
}

pub fn gateway_state(
    pool: CredentialPool,
    http: Arc<FakeUpstream>,
    channels: Arc<ScriptedConnector>,
) -> GatewayState {
    let upstream = UpstreamHandles {
        http,
        channels,
        endpoints: Arc::new(endpoints()),
        stream_idle_timeout: Duration::from_secs(5),
    };
    GatewayState::new(
        pool,
        upstream,
        ModelTable::new(default_model_adapters(), DEFAULT_ADAPTER),
    )
}

/// Serves the gateway on an ephemeral port and returns its base URL.
pub async fn serve(state: GatewayState) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, gateway_router(state)).await.unwrap();
    });
    format!("http://{addr}")
}

pub struct Reply {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
}

impl Reply {
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.body).unwrap()
    }
}

async fn into_reply(resp: wreq::Response) -> Reply {
    let status = resp.status().as_u16();
    let content_type = resp
        .headers()
        .get("content-type")
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    Reply {
        status,
        content_type,
        body: resp.text().await.unwrap(),
    }
}

pub async fn get(base: &str, path: &str) -> Reply {
    let resp = wreq::Client::new()
        .get(format!("{base}{path}"))
        .send()
        .await
        .unwrap();
    into_reply(resp).await
}

pub async fn post(base: &str, path: &str, body: impl Into<String>) -> Reply {
    let resp = wreq::Client::new()
        .post(format!("{base}{path}"))
        .header("content-type", "application/json")
        .body(body.into())
        .send()
        .await
        .unwrap();
    into_reply(resp).await
}
