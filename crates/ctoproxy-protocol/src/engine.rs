use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Body of `POST {api_base}/chat`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateChatBody {
    pub prompt: String,
    #[serde(rename = "chatHistoryId")]
    pub chat_history_id: String,
    #[serde(rename = "adapterName")]
    pub adapter_name: String,
}

/// One decoded message from the conversation stream channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamFrame {
    /// Carries a nested, JSON-encoded payload in `buffer`.
    Update { buffer: String },
    State { in_progress: bool },
    /// Well-formed but irrelevant to content delivery.
    Other,
}

impl StreamFrame {
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamFrame::State { in_progress: false })
    }
}

/// Decodes a text frame. `None` means the frame is junk (not JSON, or an
/// update/state frame missing the fields that give it meaning).
pub fn decode_frame(text: &str) -> Option<StreamFrame> {
    let value: JsonValue = serde_json::from_str(text).ok()?;
    match value.get("type").and_then(JsonValue::as_str) {
        Some("update") => match value.get("buffer") {
            Some(JsonValue::String(buffer)) if !buffer.is_empty() => Some(StreamFrame::Update {
                buffer: buffer.clone(),
            }),
            Some(JsonValue::String(_)) | Some(JsonValue::Null) | None => Some(StreamFrame::Other),
            Some(_) => None,
        },
        Some("state") => {
            let state = value.get("state")?.as_object()?;
            let in_progress = state
                .get("inProgress")
                .map(is_truthy)
                .unwrap_or(false);
            Some(StreamFrame::State { in_progress })
        }
        _ => Some(StreamFrame::Other),
    }
}

/// Extracts non-empty assistant text from an update buffer whose inner type
/// is `chat`.
pub fn chat_content(buffer: &str) -> Option<String> {
    let inner: JsonValue = serde_json::from_str(buffer).ok()?;
    if inner.get("type").and_then(JsonValue::as_str) != Some("chat") {
        return None;
    }
    inner
        .get("chat")
        .and_then(|chat| chat.get("content"))
        .and_then(JsonValue::as_str)
        .filter(|content| !content.is_empty())
        .map(str::to_string)
}

fn is_truthy(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => false,
        JsonValue::Bool(flag) => *flag,
        JsonValue::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        JsonValue::String(text) => !text.is_empty(),
        JsonValue::Array(items) => !items.is_empty(),
        JsonValue::Object(map) => !map.is_empty(),
    }
}
