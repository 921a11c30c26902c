pub mod extract;

use serde_json::Value;
use tracing::{debug, warn};

use ctoproxy_provider_core::{
    ClientError, ClientResult, Credential, Headers, UpstreamClient, UpstreamHttpRequest,
    UpstreamHttpResponse, header_set, header_set_default, truncate_body,
};

use crate::endpoints::Endpoints;
use crate::fingerprint::HeaderBuilder;
use extract::{ClientView, SessionDraft};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Identity state derived from one credential.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    pub session_id: String,
    pub active_organization_id: Option<String>,
    /// Short-lived bearer token; renewed per authentication cycle.
    pub access_token: Option<String>,
    /// Long-lived token that authorizes stream channels.
    pub stream_token: String,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("session_id", &self.session_id)
            .field("active_organization_id", &self.active_organization_id)
            .field("has_access_token", &self.access_token.is_some())
            .finish_non_exhaustive()
    }
}

/// Performs the identity provider calls for one credential. Borrowed per
/// call; holds no state between operations and never retries.
pub struct IdentityHandshake<'a> {
    pub http: &'a dyn UpstreamClient,
    pub endpoints: &'a Endpoints,
    pub headers: &'a dyn HeaderBuilder,
}

impl IdentityHandshake<'_> {
    fn request_headers(&self, credential: &Credential, extra: &[(&str, &str)]) -> Headers {
        let referer = self.endpoints.site_referer();
        let mut base: Vec<(&str, &str)> = vec![("Accept", "*/*"), ("Sec-Fetch-Site", "same-site")];
        base.extend_from_slice(extra);
        let mut headers = self.headers.build_http_headers(
            Some(self.endpoints.identity_base.as_str()),
            Some(self.endpoints.site_origin.as_str()),
            Some(referer.as_str()),
            &base,
        );
        header_set(&mut headers, "cookie", credential.expose());
        headers
    }

    /// Looks up the client document for `credential` and derives a session
    /// from it, consulting the membership listing when the client document
    /// lacks a session id or stream token.
    pub async fn resolve_session(&self, credential: &Credential) -> ClientResult<Session> {
        let headers = self.request_headers(credential, &[]);
        let url = self.endpoints.identity_url("/v1/client", &[]);
        let response = self
            .send(UpstreamHttpRequest::get(url, headers.clone()), "client lookup")
            .await?;
        let payload: Value = serde_json::from_slice(&response.body).map_err(|err| {
            ClientError::auth(format!("client lookup returned invalid JSON: {err}"))
        })?;

        let view = ClientView::from_payload(&payload);
        if !view.has_sessions() {
            return Err(ClientError::auth("identity response has no session"));
        }
        let mut draft = SessionDraft::default();
        draft.absorb(&view);

        if !draft.is_complete() {
            self.hydrate_from_memberships(headers, &mut draft).await;
        }

        let active_organization_id = draft.active_organization_id;
        let access_token = draft.access_token;
        match (draft.session_id, draft.stream_token) {
            (Some(session_id), Some(stream_token)) => {
                debug!(
                    event = "identity_resolved",
                    session_id = %session_id,
                    has_org = active_organization_id.is_some()
                );
                Ok(Session {
                    session_id,
                    active_organization_id,
                    access_token,
                    stream_token,
                })
            }
            _ => Err(ClientError::auth(
                "identity response has no session id or stream token",
            )),
        }
    }

    /// Best effort: failures leave `draft` unchanged.
    async fn hydrate_from_memberships(&self, mut headers: Headers, draft: &mut SessionDraft) {
        header_set_default(&mut headers, "Accept", "application/json");
        let url = self.endpoints.identity_url(
            "/v1/me/organization_memberships",
            &[("paginated", "true"), ("limit", "10"), ("offset", "0")],
        );
        let response = match self
            .send(UpstreamHttpRequest::get(url, headers), "membership lookup")
            .await
        {
            Ok(response) => response,
            Err(err) => {
                warn!(event = "membership_lookup_failed", error = %err);
                return;
            }
        };
        match serde_json::from_slice::<Value>(&response.body) {
            Ok(payload) => draft.absorb(&ClientView::from_payload(&payload)),
            Err(err) => warn!(event = "membership_lookup_failed", error = %err),
        }
    }

    /// Marks the session active, then mints a fresh access token for it.
    pub async fn refresh_access_token(
        &self,
        credential: &Credential,
        session: &Session,
    ) -> ClientResult<Session> {
        let sessions_path = format!("/v1/client/sessions/{}", session.session_id);

        let touch_headers = self.request_headers(credential, &[("Content-Type", FORM_CONTENT_TYPE)]);
        let touch_body = match session.active_organization_id.as_deref() {
            Some(org) => serde_urlencoded::to_string([("active_organization_id", org)])
                .map_err(|err| ClientError::auth(format!("session touch body: {err}")))?,
            None => String::new(),
        };
        let touch_url = self
            .endpoints
            .identity_url(&format!("{sessions_path}/touch"), &[]);
        self.send(
            UpstreamHttpRequest::post(touch_url, touch_headers, touch_body),
            "session touch",
        )
        .await?;

        let mut token_headers = self.request_headers(credential, &[]);
        header_set(&mut token_headers, "content-type", FORM_CONTENT_TYPE);
        let token_url = self
            .endpoints
            .identity_url(&format!("{sessions_path}/tokens"), &[]);
        let response = self
            .send(
                UpstreamHttpRequest::post(token_url, token_headers, ""),
                "token renewal",
            )
            .await?;
        let payload: Value = serde_json::from_slice(&response.body).map_err(|err| {
            ClientError::auth(format!("token renewal returned invalid JSON: {err}"))
        })?;
        let jwt = payload
            .get("jwt")
            .and_then(Value::as_str)
            .filter(|jwt| !jwt.is_empty())
            .ok_or_else(|| ClientError::auth("token renewal returned an empty token"))?;

        debug!(event = "access_token_renewed", session_id = %session.session_id);
        Ok(Session {
            access_token: Some(jwt.to_string()),
            ..session.clone()
        })
    }

    async fn send(
        &self,
        request: UpstreamHttpRequest,
        step: &str,
    ) -> ClientResult<UpstreamHttpResponse> {
        let response = self
            .http
            .send(request)
            .await
            .map_err(|failure| ClientError::auth(format!("{step} failed: {failure}")))?;
        if !response.is_success() {
            return Err(ClientError::auth(format!(
                "{step} returned {}: {}",
                response.status,
                truncate_body(&response.body)
            )));
        }
        Ok(response)
    }
}
