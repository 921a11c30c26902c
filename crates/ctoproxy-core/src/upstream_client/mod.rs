mod ws;

pub use ws::WreqChannelConnector;

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use wreq::redirect::Policy;
use wreq::{Client, Method, Proxy};
use wreq_util::Emulation;

use ctoproxy_common::GlobalConfig;
use ctoproxy_provider_core::{
    Headers, HttpMethod, UpstreamClient, UpstreamFailure, UpstreamHttpRequest,
    UpstreamHttpResponse, UpstreamTransportErrorKind,
};

#[derive(Debug, Clone)]
pub struct UpstreamClientConfig {
    pub proxy: Option<String>,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub max_redirects: usize,
}

impl UpstreamClientConfig {
    pub fn from_global(global: &GlobalConfig) -> Self {
        Self {
            proxy: normalize_proxy(global.proxy.clone()),
            ..Self::default()
        }
    }
}

impl Default for UpstreamClientConfig {
    fn default() -> Self {
        Self {
            proxy: None,
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(30),
            max_redirects: 10,
        }
    }
}

/// Shared HTTP client. Carries no session state: cookies and tokens are sent
/// explicitly on each request.
#[derive(Clone)]
pub struct WreqUpstreamClient {
    client: Client,
}

impl WreqUpstreamClient {
    pub fn new(config: &UpstreamClientConfig) -> Result<Self, wreq::Error> {
        Ok(Self {
            client: build_client(config)?,
        })
    }
}

fn normalize_proxy(value: Option<String>) -> Option<String> {
    value
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
}

pub(crate) fn build_client(config: &UpstreamClientConfig) -> Result<Client, wreq::Error> {
    let mut builder = Client::builder()
        .emulation(Emulation::Chrome120)
        .connect_timeout(config.connect_timeout)
        .timeout(config.request_timeout)
        .redirect(Policy::limited(config.max_redirects));

    if let Some(proxy) = config.proxy.as_deref() {
        builder = builder.proxy(Proxy::all(proxy)?);
    }

    builder.build()
}

impl UpstreamClient for WreqUpstreamClient {
    fn send<'a>(
        &'a self,
        req: UpstreamHttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<UpstreamHttpResponse, UpstreamFailure>> + Send + 'a>>
    {
        Box::pin(async move {
            let method = http_method_to_wreq(req.method);
            let mut builder = self.client.request(method, &req.url);

            for (k, v) in &req.headers {
                builder = builder.header(k, v);
            }

            if let Some(body) = req.body {
                builder = builder.body(body);
            }

            let resp = builder.send().await.map_err(map_wreq_error)?;
            let status = resp.status().as_u16();
            let headers = headers_from_wreq(resp.headers());
            let body = resp.bytes().await.map_err(map_wreq_error)?;
            Ok(UpstreamHttpResponse {
                status,
                headers,
                body,
            })
        })
    }
}

fn http_method_to_wreq(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
    }
}

fn headers_from_wreq(map: &wreq::header::HeaderMap) -> Headers {
    let mut out = Vec::new();
    for (k, v) in map {
        if let Ok(s) = v.to_str() {
            out.push((k.as_str().to_string(), s.to_string()));
        }
    }
    out
}

pub(crate) fn map_wreq_error(err: wreq::Error) -> UpstreamFailure {
    UpstreamFailure {
        kind: classify_wreq_error(&err),
        message: err.to_string(),
    }
}

pub(crate) fn classify_wreq_error(err: &wreq::Error) -> UpstreamTransportErrorKind {
    let message = err.to_string().to_ascii_lowercase();
    if err.is_timeout() {
        return UpstreamTransportErrorKind::Timeout;
    }
    if err.is_connect() || err.is_connection_reset() {
        if message.contains("tls") || message.contains("ssl") {
            return UpstreamTransportErrorKind::Tls;
        }
        return UpstreamTransportErrorKind::Connect;
    }
    if message.contains("tls") || message.contains("ssl") {
        return UpstreamTransportErrorKind::Tls;
    }
    UpstreamTransportErrorKind::Other
}
