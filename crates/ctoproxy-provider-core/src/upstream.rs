use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;

use crate::headers::Headers;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

#[derive(Debug, Clone)]
pub struct UpstreamHttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Headers,
    pub body: Option<Bytes>,
}

impl UpstreamHttpRequest {
    pub fn get(url: impl Into<String>, headers: Headers) -> Self {
        Self {
            method: HttpMethod::Get,
            url: url.into(),
            headers,
            body: None,
        }
    }

    pub fn post(url: impl Into<String>, headers: Headers, body: impl Into<Bytes>) -> Self {
        Self {
            method: HttpMethod::Post,
            url: url.into(),
            headers,
            body: Some(body.into()),
        }
    }
}

/// Fully buffered upstream response. Every call the session client makes
/// returns a small JSON document, so there is no streaming variant here.
#[derive(Debug, Clone)]
pub struct UpstreamHttpResponse {
    pub status: u16,
    pub headers: Headers,
    pub body: Bytes,
}

impl UpstreamHttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamTransportErrorKind {
    Timeout,
    Connect,
    Tls,
    Other,
}

/// Transport-level failure: no HTTP response was received.
#[derive(Debug, Clone)]
pub struct UpstreamFailure {
    pub kind: UpstreamTransportErrorKind,
    pub message: String,
}

impl std::fmt::Display for UpstreamFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

pub trait UpstreamClient: Send + Sync {
    fn send<'a>(
        &'a self,
        req: UpstreamHttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<UpstreamHttpResponse, UpstreamFailure>> + Send + 'a>>;
}
