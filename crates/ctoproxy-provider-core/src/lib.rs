//! Core abstractions shared by the session client and the gateway.
//!
//! This crate intentionally does **not** depend on any concrete HTTP or
//! WebSocket client. The session client talks to the upstream through
//! [`UpstreamClient`] and [`ChannelConnector`]; `ctoproxy-core` provides the
//! real implementations and tests provide scripted ones.

pub mod channel;
pub mod credential;
pub mod errors;
pub mod headers;
pub mod upstream;

pub use channel::{ChannelConnector, Connected, FrameChannel, Received};
pub use credential::{
    Credential, CredentialPool, CredentialSource, FileCredentialSource, parse_credentials,
};
pub use errors::{ClientError, ClientResult, truncate_body};
pub use headers::{Headers, header_get, header_merge, header_set, header_set_default};
pub use upstream::{
    HttpMethod, UpstreamClient, UpstreamFailure, UpstreamHttpRequest, UpstreamHttpResponse,
    UpstreamTransportErrorKind,
};
