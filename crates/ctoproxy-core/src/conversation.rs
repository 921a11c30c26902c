use tracing::debug;

use ctoproxy_protocol::engine::CreateChatBody;
use ctoproxy_provider_core::{
    ClientError, ClientResult, UpstreamClient, UpstreamHttpRequest, header_set, truncate_body,
};

use crate::endpoints::Endpoints;
use crate::fingerprint::HeaderBuilder;
use crate::identity::Session;

/// Starts conversations on the chat API. Never renews tokens itself.
pub struct ConversationClient<'a> {
    pub http: &'a dyn UpstreamClient,
    pub endpoints: &'a Endpoints,
    pub headers: &'a dyn HeaderBuilder,
}

impl ConversationClient<'_> {
    /// Creates a conversation under a fresh client-side id and returns that id.
    pub async fn create_conversation(
        &self,
        session: &Session,
        prompt: &str,
        adapter: &str,
    ) -> ClientResult<String> {
        let access_token = session.access_token.as_deref().ok_or_else(|| {
            ClientError::auth("must authenticate before creating a conversation")
        })?;

        let conversation_id = uuid::Uuid::new_v4().to_string();
        let body = serde_json::to_vec(&CreateChatBody {
            prompt: prompt.to_string(),
            chat_history_id: conversation_id.clone(),
            adapter_name: adapter.to_string(),
        })
        .map_err(|err| ClientError::api(format!("encode conversation request: {err}")))?;

        let url = self.endpoints.chat_url();
        let referer = self.endpoints.site_referer();
        let mut headers = self.headers.build_http_headers(
            Some(self.endpoints.api_base.as_str()),
            Some(self.endpoints.site_origin.as_str()),
            Some(referer.as_str()),
            &[("Sec-Fetch-Site", "cross-site")],
        );
        header_set(&mut headers, "content-type", "application/json");
        header_set(&mut headers, "authorization", format!("Bearer {access_token}"));

        let response = self
            .http
            .send(UpstreamHttpRequest::post(url, headers, body))
            .await
            .map_err(|failure| ClientError::api(format!("create conversation failed: {failure}")))?;
        if !response.is_success() {
            return Err(ClientError::api(format!(
                "create conversation returned {}: {}",
                response.status,
                truncate_body(&response.body)
            )));
        }

        debug!(event = "conversation_created", conversation_id = %conversation_id, adapter);
        Ok(conversation_id)
    }
}
