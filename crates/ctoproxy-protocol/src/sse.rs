use bytes::Bytes;
use serde::Serialize;

pub const DONE_FRAME: &[u8] = b"data: [DONE]\n\n";

/// Encodes one data-only SSE event.
pub fn data_frame<T: Serialize>(payload: &T) -> Result<Bytes, serde_json::Error> {
    let json = serde_json::to_string(payload)?;
    let mut frame = String::with_capacity(json.len() + 8);
    frame.push_str("data: ");
    frame.push_str(&json);
    frame.push_str("\n\n");
    Ok(Bytes::from(frame))
}

/// Splits a data-only SSE body back into its `data:` payloads.
pub fn data_payloads(body: &str) -> Vec<&str> {
    body.split("\n\n")
        .filter_map(|event| {
            event
                .lines()
                .find_map(|line| line.strip_prefix("data:"))
                .map(str::trim_start)
        })
        .collect()
}
