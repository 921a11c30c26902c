//! Session client for the upstream chat backend.
//!
//! A [`SessionController`] turns one credential into an authenticated session
//! ([`identity`]), starts conversations ([`conversation`]) and relays their
//! pushed content as a stream of text increments ([`relay`]).

pub mod conversation;
pub mod endpoints;
pub mod fingerprint;
pub mod identity;
pub mod relay;
pub mod session;
pub mod upstream_client;

pub use conversation::ConversationClient;
pub use endpoints::Endpoints;
pub use fingerprint::{BrowserFingerprint, HeaderBuilder};
pub use identity::{IdentityHandshake, Session};
pub use relay::{ContentStream, StreamRelay};
pub use session::{SessionController, SessionState, UpstreamHandles};
pub use upstream_client::{UpstreamClientConfig, WreqChannelConnector, WreqUpstreamClient};
