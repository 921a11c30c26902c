pub type ClientResult<T> = Result<T, ClientError>;

/// Failures surfaced by the session client.
///
/// `Auth` covers every step that obtains or renews identity (handshake, touch,
/// token renewal). `Api` covers calls made with a valid token that still
/// failed (conversation creation, a broken stream channel). `PoolEmpty` never
/// touches the network.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("upstream api failed: {0}")]
    Api(String),
    #[error("credential pool is empty")]
    PoolEmpty,
}

impl ClientError {
    pub fn auth(message: impl Into<String>) -> Self {
        ClientError::Auth(message.into())
    }

    pub fn api(message: impl Into<String>) -> Self {
        ClientError::Api(message.into())
    }
}

const BODY_PREVIEW_CHARS: usize = 200;

/// First 200 characters of an upstream body, for error messages.
pub fn truncate_body(body: &[u8]) -> String {
    String::from_utf8_lossy(body)
        .chars()
        .take(BODY_PREVIEW_CHARS)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_is_char_bounded() {
        let body = "é".repeat(300);
        assert_eq!(truncate_body(body.as_bytes()).chars().count(), 200);
        assert_eq!(truncate_body(b"short"), "short");
    }
}
