use ctoproxy_protocol::openai::chat_completions::{ChatMessage, MessageContent};

use crate::error::GatewayError;

const USER_ROLE: &str = "user";

/// Validates a chat history and flattens it into one upstream prompt:
/// `"{role}: {content}"` per message, joined by newlines.
pub fn build_prompt(messages: &[ChatMessage]) -> Result<String, GatewayError> {
    let Some(last) = messages.last() else {
        return Err(GatewayError::invalid_request(
            "messages must be a non-empty array.",
            Some("messages"),
            "missing_required_field",
        ));
    };
    if last.role != USER_ROLE {
        return Err(GatewayError::invalid_request(
            "The last message must be from the user.",
            Some("messages"),
            "invalid_message_role",
        ));
    }

    let mut lines = Vec::with_capacity(messages.len());
    for (index, message) in messages.iter().enumerate() {
        let content = render_content(&message.content, index)?;
        lines.push(format!("{}: {content}", message.role));
    }
    let prompt = lines.join("\n");

    if prompt.trim().is_empty() {
        return Err(GatewayError::invalid_request(
            "At least one user message with content is required.",
            Some("messages"),
            "invalid_message_content",
        ));
    }
    Ok(prompt)
}

fn render_content(content: &MessageContent, message_index: usize) -> Result<String, GatewayError> {
    let parts = match content {
        MessageContent::Text(text) => return Ok(text.clone()),
        MessageContent::Parts(parts) => parts,
    };

    let mut rendered = String::new();
    for (part_index, part) in parts.iter().enumerate() {
        if part.kind != "text" {
            let param = format!("messages[{message_index}].content[{part_index}].type");
            return Err(GatewayError::invalid_request(
                format!(
                    "Unsupported content part type '{}'. Only 'text' is supported.",
                    part.kind
                ),
                Some(&param),
                "unsupported_message_content_type",
            ));
        }
        let Some(text) = part.text.as_deref() else {
            let param = format!("messages[{message_index}].content[{part_index}].text");
            return Err(GatewayError::invalid_request(
                "Text content parts must carry a 'text' field.",
                Some(&param),
                "missing_required_field",
            ));
        };
        rendered.push_str(text);
    }
    Ok(rendered)
}
