use ctoproxy_common::GlobalConfig;

pub const CLERK_API_VERSION: &str = "2025-04-10";
pub const CLERK_JS_VERSION: &str = "5.102.1";

/// Upstream base URLs, normalized without trailing slashes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub identity_base: String,
    pub api_base: String,
    pub stream_base: String,
    pub site_origin: String,
}

impl Endpoints {
    pub fn from_global(global: &GlobalConfig) -> Self {
        Self {
            identity_base: trim_base(&global.identity_base_url),
            api_base: trim_base(&global.api_base_url),
            stream_base: trim_base(&global.stream_base_url),
            site_origin: trim_base(&global.site_origin),
        }
    }

    /// `{identity_base}{path}` with the identity API version pair plus
    /// `extra` appended as the query string.
    pub fn identity_url(&self, path: &str, extra: &[(&str, &str)]) -> String {
        let mut query: Vec<(&str, &str)> = vec![
            ("__clerk_api_version", CLERK_API_VERSION),
            ("_clerk_js_version", CLERK_JS_VERSION),
        ];
        query.extend_from_slice(extra);
        let encoded = serde_urlencoded::to_string(&query).unwrap_or_default();
        format!("{}{path}?{encoded}", self.identity_base)
    }

    pub fn chat_url(&self) -> String {
        format!("{}/chat", self.api_base)
    }

    pub fn stream_url(&self, conversation_id: &str, stream_token: &str) -> String {
        let query = serde_urlencoded::to_string([("token", stream_token)]).unwrap_or_default();
        format!(
            "{}/chat-histories/{conversation_id}/buffer/stream?{query}",
            self.stream_base
        )
    }

    /// Referer sent alongside `Origin`: the site root.
    pub fn site_referer(&self) -> String {
        format!("{}/", self.site_origin)
    }
}

fn trim_base(value: &str) -> String {
    value.trim().trim_end_matches('/').to_string()
}
