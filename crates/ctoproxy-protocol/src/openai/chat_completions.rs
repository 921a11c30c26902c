use serde::{Deserialize, Serialize};

pub const CHAT_COMPLETION_OBJECT: &str = "chat.completion";
pub const CHAT_COMPLETION_CHUNK_OBJECT: &str = "chat.completion.chunk";
pub const ASSISTANT_ROLE: &str = "assistant";
pub const FINISH_REASON_STOP: &str = "stop";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub stream: bool,
    /// Accepted for compatibility; the upstream exposes no sampling controls.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: MessageContent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

/// A content part. Only `text` parts can be forwarded; other types are
/// kept here so the gateway can reject them with a precise error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentPart {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionUsage {
    pub prompt_tokens: i64,
    pub completion_tokens: i64,
    pub total_tokens: i64,
}

impl CompletionUsage {
    pub fn new(prompt_tokens: i64, completion_tokens: i64) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletionChoice {
    pub index: i64,
    pub message: ResponseMessage,
    pub finish_reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletionResponse {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub model: String,
    pub choices: Vec<ChatCompletionChoice>,
    pub usage: CompletionUsage,
}

impl ChatCompletionResponse {
    /// A single-choice assistant completion that finished normally.
    pub fn assistant(
        id: impl Into<String>,
        created: i64,
        model: impl Into<String>,
        content: impl Into<String>,
        usage: CompletionUsage,
    ) -> Self {
        Self {
            id: id.into(),
            object: CHAT_COMPLETION_OBJECT.to_string(),
            created,
            model: model.into(),
            choices: vec![ChatCompletionChoice {
                index: 0,
                message: ResponseMessage {
                    role: ASSISTANT_ROLE.to_string(),
                    content: content.into(),
                },
                finish_reason: FINISH_REASON_STOP.to_string(),
            }],
            usage,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkDelta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkChoice {
    pub index: i64,
    pub delta: ChunkDelta,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletionChunk {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub model: String,
    pub choices: Vec<ChunkChoice>,
}

impl ChatCompletionChunk {
    fn single(id: &str, created: i64, model: &str, delta: ChunkDelta, finish: bool) -> Self {
        Self {
            id: id.to_string(),
            object: CHAT_COMPLETION_CHUNK_OBJECT.to_string(),
            created,
            model: model.to_string(),
            choices: vec![ChunkChoice {
                index: 0,
                delta,
                finish_reason: finish.then(|| FINISH_REASON_STOP.to_string()),
            }],
        }
    }

    /// Opening chunk announcing the assistant role.
    pub fn role(id: &str, created: i64, model: &str) -> Self {
        let delta = ChunkDelta {
            role: Some(ASSISTANT_ROLE.to_string()),
            content: None,
        };
        Self::single(id, created, model, delta, false)
    }

    pub fn content(id: &str, created: i64, model: &str, content: impl Into<String>) -> Self {
        let delta = ChunkDelta {
            role: None,
            content: Some(content.into()),
        };
        Self::single(id, created, model, delta, false)
    }

    /// Closing chunk with an empty delta and `finish_reason: "stop"`.
    pub fn stop(id: &str, created: i64, model: &str) -> Self {
        Self::single(id, created, model, ChunkDelta::default(), true)
    }

    /// Content chunk that also finishes the stream; used to report an error
    /// in-band after part of the answer was already sent.
    pub fn final_content(id: &str, created: i64, model: &str, content: impl Into<String>) -> Self {
        let delta = ChunkDelta {
            role: None,
            content: Some(content.into()),
        };
        Self::single(id, created, model, delta, true)
    }
}
