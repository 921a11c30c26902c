use std::convert::Infallible;

use axum::body::Body;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};

use ctoproxy_core::ContentStream;
use ctoproxy_protocol::openai::chat_completions::ChatCompletionChunk;
use ctoproxy_protocol::sse::{DONE_FRAME, data_frame};

/// Identity of one streamed completion.
pub(crate) struct StreamMeta {
    pub trace_id: String,
    pub completion_id: String,
    pub created: i64,
    pub model: String,
}

pub(crate) fn sse_response(content: ContentStream, meta: StreamMeta) -> Response {
    let (tx, rx) = mpsc::channel::<Bytes>(16);
    tokio::spawn(relay_chunks(content, meta, tx));

    let stream = ReceiverStream::new(rx).map(Ok::<_, Infallible>);
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, HeaderValue::from_static("text/event-stream"))
        .header(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"))
        .header("x-accel-buffering", HeaderValue::from_static("no"))
        .body(Body::from_stream(stream))
        .unwrap_or_else(|_| {
            (StatusCode::INTERNAL_SERVER_ERROR, "response_build_failed").into_response()
        })
}

async fn send_chunk(tx: &mpsc::Sender<Bytes>, chunk: &ChatCompletionChunk) -> bool {
    match data_frame(chunk) {
        Ok(frame) => tx.send(frame).await.is_ok(),
        Err(err) => {
            warn!(event = "sse_encode_failed", error = %err);
            false
        }
    }
}

/// Role chunk, one chunk per increment, then a stop chunk and `[DONE]`.
/// A failure after the response started is reported in-band.
async fn relay_chunks(mut content: ContentStream, meta: StreamMeta, tx: mpsc::Sender<Bytes>) {
    let StreamMeta {
        trace_id,
        completion_id: id,
        created,
        model,
    } = meta;

    if !send_chunk(&tx, &ChatCompletionChunk::role(&id, created, &model)).await {
        return;
    }

    let mut increments = 0usize;
    while let Some(item) = content.next().await {
        match item {
            Ok(text) => {
                increments += 1;
                let chunk = ChatCompletionChunk::content(&id, created, &model, text);
                if !send_chunk(&tx, &chunk).await {
                    debug!(event = "downstream_closed", trace_id = %trace_id, increments);
                    return;
                }
            }
            Err(err) => {
                warn!(event = "stream_failed", trace_id = %trace_id, increments, error = %err);
                let chunk =
                    ChatCompletionChunk::final_content(&id, created, &model, format!("\n\n[ERROR: {err}]"));
                if send_chunk(&tx, &chunk).await {
                    let _ = tx.send(Bytes::from_static(DONE_FRAME)).await;
                }
                return;
            }
        }
    }

    info!(event = "stream_completed", trace_id = %trace_id, increments);
    if send_chunk(&tx, &ChatCompletionChunk::stop(&id, created, &model)).await {
        let _ = tx.send(Bytes::from_static(DONE_FRAME)).await;
    }
}
