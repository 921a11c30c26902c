mod support;

use std::sync::Arc;

use serde_json::json;

use ctoproxy_core::{BrowserFingerprint, IdentityHandshake};
use ctoproxy_provider_core::{ClientError, Credential, HttpMethod, header_get};

use support::{FakeUpstream, endpoints};

fn cookie() -> Credential {
    Credential::new("__client=abc; __session=def")
}

#[tokio::test]
async fn resolves_session_from_client_document() {
    let upstream = FakeUpstream::healthy();
    let endpoints = endpoints();
    let fingerprint = BrowserFingerprint::random();
    let handshake = IdentityHandshake {
        http: upstream.as_ref(),
        endpoints: &endpoints,
        headers: &fingerprint,
    };

    let session = handshake.resolve_session(&cookie()).await.unwrap();
    assert_eq!(session.session_id, "sess_1");
    assert_eq!(session.stream_token, "ws_tok");
    assert_eq!(session.active_organization_id.as_deref(), Some("org_1"));
    assert_eq!(session.access_token.as_deref(), Some("jwt_old"));

    let request = upstream.request_to("/v1/client?").unwrap();
    assert_eq!(request.method, HttpMethod::Get);
    assert!(request.url.contains("__clerk_api_version=2025-04-10"));
    assert_eq!(
        header_get(&request.headers, "cookie"),
        Some("__client=abc; __session=def")
    );
    assert_eq!(header_get(&request.headers, "accept"), Some("*/*"));
    assert_eq!(header_get(&request.headers, "origin"), Some("https://site.test"));
    assert_eq!(upstream.request_count(), 1);
}

#[tokio::test]
async fn membership_lookup_fills_missing_stream_token() {
    let upstream = Arc::new(FakeUpstream::default());
    upstream
        .route(
            "/v1/client?",
            200,
            json!({"client": {"sessions": [{"id": "sess_9"}]}}),
        )
        .route(
            "/v1/me/organization_memberships",
            200,
            json!({"client": {"sessions": [{
                "id": "sess_9",
                "wsToken": "ws_from_memberships",
                "last_active_organization_id": "org_9"
            }]}}),
        );
    let endpoints = endpoints();
    let fingerprint = BrowserFingerprint::random();
    let handshake = IdentityHandshake {
        http: upstream.as_ref(),
        endpoints: &endpoints,
        headers: &fingerprint,
    };

    let session = handshake.resolve_session(&cookie()).await.unwrap();
    assert_eq!(session.session_id, "sess_9");
    assert_eq!(session.stream_token, "ws_from_memberships");
    assert_eq!(session.active_organization_id.as_deref(), Some("org_9"));

    let lookup = upstream
        .request_to("/v1/me/organization_memberships")
        .unwrap();
    assert!(lookup.url.contains("paginated=true&limit=10&offset=0"));
}

#[tokio::test]
async fn missing_stream_token_everywhere_is_auth_error() {
    let upstream = Arc::new(FakeUpstream::default());
    upstream
        .route(
            "/v1/client?",
            200,
            json!({"response": {"sessions": [{"id": "sess_1"}]}}),
        )
        .route("/v1/me/organization_memberships", 500, json!({"error": "boom"}));
    let endpoints = endpoints();
    let fingerprint = BrowserFingerprint::random();
    let handshake = IdentityHandshake {
        http: upstream.as_ref(),
        endpoints: &endpoints,
        headers: &fingerprint,
    };

    let err = handshake.resolve_session(&cookie()).await.unwrap_err();
    assert!(matches!(err, ClientError::Auth(_)), "{err:?}");
    assert_eq!(upstream.request_count(), 2);
}

#[tokio::test]
async fn no_sessions_is_auth_error() {
    let upstream = Arc::new(FakeUpstream::default());
    upstream.route("/v1/client?", 200, json!({"response": {"sessions": []}}));
    let endpoints = endpoints();
    let fingerprint = BrowserFingerprint::random();
    let handshake = IdentityHandshake {
        http: upstream.as_ref(),
        endpoints: &endpoints,
        headers: &fingerprint,
    };

    let err = handshake.resolve_session(&cookie()).await.unwrap_err();
    assert_eq!(err, ClientError::Auth("identity response has no session".to_string()));
}

#[tokio::test]
async fn rejected_lookup_reports_status_and_truncated_body() {
    let upstream = Arc::new(FakeUpstream::default());
    let body = "x".repeat(500);
    upstream.route_raw("/v1/client?", 401, &body);
    let endpoints = endpoints();
    let fingerprint = BrowserFingerprint::random();
    let handshake = IdentityHandshake {
        http: upstream.as_ref(),
        endpoints: &endpoints,
        headers: &fingerprint,
    };

    let ClientError::Auth(message) = handshake.resolve_session(&cookie()).await.unwrap_err() else {
        panic!("expected auth error");
    };
    assert!(message.contains("401"));
    assert!(message.ends_with(&"x".repeat(200)));
    assert!(!message.contains(&"x".repeat(201)));
}

#[tokio::test]
async fn refresh_touches_then_mints_token() {
    let upstream = FakeUpstream::healthy();
    let endpoints = endpoints();
    let fingerprint = BrowserFingerprint::random();
    let handshake = IdentityHandshake {
        http: upstream.as_ref(),
        endpoints: &endpoints,
        headers: &fingerprint,
    };

    let session = handshake.resolve_session(&cookie()).await.unwrap();
    let renewed = handshake
        .refresh_access_token(&cookie(), &session)
        .await
        .unwrap();
    assert_eq!(renewed.access_token.as_deref(), Some("jwt_fresh"));
    assert_eq!(renewed.stream_token, session.stream_token);

    let urls = upstream.urls();
    assert!(urls[1].contains("/v1/client/sessions/sess_1/touch?"));
    assert!(urls[2].contains("/v1/client/sessions/sess_1/tokens?"));

    let touch = upstream.request_to("/touch").unwrap();
    assert_eq!(touch.method, HttpMethod::Post);
    assert_eq!(touch.body.as_deref(), Some(&b"active_organization_id=org_1"[..]));
    assert_eq!(
        header_get(&touch.headers, "content-type"),
        Some("application/x-www-form-urlencoded")
    );
}

#[tokio::test]
async fn empty_minted_token_is_auth_error() {
    let upstream = Arc::new(FakeUpstream::default());
    upstream
        .route("/touch", 200, json!({}))
        .route("/tokens", 200, json!({"jwt": ""}))
        .route("/v1/client?", 200, support::client_document());
    let endpoints = endpoints();
    let fingerprint = BrowserFingerprint::random();
    let handshake = IdentityHandshake {
        http: upstream.as_ref(),
        endpoints: &endpoints,
        headers: &fingerprint,
    };

    let session = handshake.resolve_session(&cookie()).await.unwrap();
    let err = handshake
        .refresh_access_token(&cookie(), &session)
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Auth(_)));
}
