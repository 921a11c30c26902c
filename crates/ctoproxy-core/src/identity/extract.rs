use serde_json::Value;

/// Reads one candidate value from a `(client, session)` document pair.
pub type Extractor = fn(&Value, &Value) -> Option<String>;

fn text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

fn session_ws_user_token(_: &Value, session: &Value) -> Option<String> {
    text(session.get("ws_user_token"))
}

fn session_ws_token(_: &Value, session: &Value) -> Option<String> {
    text(session.get("wsToken"))
}

fn session_last_active_jwt(_: &Value, session: &Value) -> Option<String> {
    text(session.pointer("/last_active_token/jwt"))
}

fn session_user_id(_: &Value, session: &Value) -> Option<String> {
    text(session.pointer("/user/id"))
}

fn client_last_active_org(client: &Value, _: &Value) -> Option<String> {
    text(client.get("last_active_organization_id"))
}

fn session_last_active_org(_: &Value, session: &Value) -> Option<String> {
    text(session.get("last_active_organization_id"))
}

fn first_membership_org(client: &Value, _: &Value) -> Option<String> {
    text(client.pointer("/organization_memberships/0/organization/id"))
}

pub const STREAM_TOKEN_EXTRACTORS: &[Extractor] = &[
    session_ws_user_token,
    session_ws_token,
    session_last_active_jwt,
    session_user_id,
];

pub const ACCESS_TOKEN_EXTRACTORS: &[Extractor] = &[session_last_active_jwt];

pub const ACTIVE_ORG_EXTRACTORS: &[Extractor] = &[
    client_last_active_org,
    session_last_active_org,
    first_membership_org,
];

pub fn first_match(extractors: &[Extractor], client: &Value, session: &Value) -> Option<String> {
    extractors
        .iter()
        .find_map(|extract| extract(client, session))
}

fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Object(map) => !map.is_empty(),
        _ => true,
    }
}

/// The client document of an identity response and its session list.
pub struct ClientView<'a> {
    pub client: &'a Value,
    pub sessions: &'a [Value],
}

impl<'a> ClientView<'a> {
    /// The client document is `response`, else `client`. Missing pieces read
    /// as empty.
    pub fn from_payload(payload: &'a Value) -> Self {
        static EMPTY: Value = Value::Null;
        let client = ["response", "client"]
            .iter()
            .filter_map(|key| payload.get(*key))
            .find(|value| is_present(value))
            .unwrap_or(&EMPTY);
        let sessions = client
            .get("sessions")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        Self { client, sessions }
    }

    pub fn has_sessions(&self) -> bool {
        !self.sessions.is_empty()
    }

    fn default_session_id(&self) -> Option<String> {
        text(self.client.get("last_active_session_id"))
            .or_else(|| self.sessions.first().and_then(|s| text(s.get("id"))))
    }

    fn select(&self, session_id: Option<&str>) -> Option<&'a Value> {
        session_id
            .and_then(|wanted| {
                self.sessions
                    .iter()
                    .find(|s| s.get("id").and_then(Value::as_str) == Some(wanted))
            })
            .or_else(|| self.sessions.first())
    }
}

/// Session fields gathered so far. Absorbing another view only fills the
/// fields that are still missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionDraft {
    pub session_id: Option<String>,
    pub active_organization_id: Option<String>,
    pub access_token: Option<String>,
    pub stream_token: Option<String>,
}

impl SessionDraft {
    pub fn absorb(&mut self, view: &ClientView<'_>) {
        if !view.has_sessions() {
            return;
        }
        if self.session_id.is_none() {
            self.session_id = view.default_session_id();
        }
        let Some(session) = view.select(self.session_id.as_deref()) else {
            return;
        };
        let client = view.client;
        fill(&mut self.stream_token, STREAM_TOKEN_EXTRACTORS, client, session);
        fill(&mut self.access_token, ACCESS_TOKEN_EXTRACTORS, client, session);
        fill(
            &mut self.active_organization_id,
            ACTIVE_ORG_EXTRACTORS,
            client,
            session,
        );
    }

    pub fn is_complete(&self) -> bool {
        self.session_id.is_some() && self.stream_token.is_some()
    }
}

fn fill(slot: &mut Option<String>, extractors: &[Extractor], client: &Value, session: &Value) {
    if slot.is_none() {
        *slot = first_match(extractors, client, session);
    }
}
