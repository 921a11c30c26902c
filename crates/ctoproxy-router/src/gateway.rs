use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::extract::{Extension, State};
use axum::http::{Method, StatusCode, Uri};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use serde_json::json;
use tracing::{info, warn};

use ctoproxy_common::GlobalConfig;
use ctoproxy_core::{SessionController, UpstreamHandles};
use ctoproxy_protocol::openai::chat_completions::{ChatCompletionRequest, ChatCompletionResponse};
use ctoproxy_provider_core::CredentialPool;

use crate::error::GatewayError;
use crate::models::ModelTable;
use crate::prompt::build_prompt;
use crate::stream::{StreamMeta, sse_response};
use crate::usage::TokenCounter;

#[derive(Clone)]
pub struct GatewayState {
    pub pool: Arc<CredentialPool>,
    pub upstream: UpstreamHandles,
    pub models: Arc<ModelTable>,
    pub tokens: TokenCounter,
}

impl GatewayState {
    pub fn new(pool: CredentialPool, upstream: UpstreamHandles, models: ModelTable) -> Self {
        Self {
            pool: Arc::new(pool),
            upstream,
            models: Arc::new(models),
            tokens: TokenCounter::cl100k(),
        }
    }

    pub fn from_global(global: &GlobalConfig) -> Result<Self, wreq::Error> {
        Ok(Self::new(
            CredentialPool::from_file(&global.cookies_file),
            UpstreamHandles::from_global(global)?,
            ModelTable::from_global(global),
        ))
    }
}

#[derive(Clone)]
struct RequestTraceId(String);

pub fn gateway_router(state: GatewayState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/v1/models", get(list_models))
        .route("/v1/chat/completions", post(chat_completions))
        .fallback(unknown_route)
        .layer(middleware::from_fn(trace_requests))
        .with_state(state)
}

async fn trace_requests(mut req: axum::http::Request<Body>, next: Next) -> Response {
    let trace_id = uuid::Uuid::now_v7().to_string();
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    req.extensions_mut().insert(RequestTraceId(trace_id.clone()));

    let started = Instant::now();
    let resp = next.run(req).await;
    info!(
        event = "downstream_request",
        trace_id = %trace_id,
        method = %method,
        path = %path,
        status = resp.status().as_u16(),
        elapsed_ms = started.elapsed().as_millis() as u64
    );
    resp
}

fn unix_now() -> i64 {
    time::OffsetDateTime::now_utc().unix_timestamp()
}

async fn root() -> impl IntoResponse {
    Json(json!({
        "message": "OpenAI Compatible API Server",
        "endpoints": {
            "chat": "/v1/chat/completions",
            "models": "/v1/models",
        },
    }))
}

async fn list_models(State(state): State<GatewayState>) -> impl IntoResponse {
    Json(state.models.list(unix_now()))
}

async fn unknown_route(method: Method, uri: Uri) -> GatewayError {
    GatewayError::not_found(method.as_str(), uri.path())
}

async fn chat_completions(
    State(state): State<GatewayState>,
    Extension(RequestTraceId(trace_id)): Extension<RequestTraceId>,
    body: Bytes,
) -> Result<Response, GatewayError> {
    let request: ChatCompletionRequest = serde_json::from_slice(&body).map_err(|err| {
        GatewayError::invalid_request(
            format!("Request body is not a valid chat completion request: {err}"),
            None,
            "invalid_json",
        )
    })?;
    let prompt = build_prompt(&request.messages)?;
    let adapter = state.models.adapter_for(&request.model).to_string();
    info!(
        event = "chat_request",
        trace_id = %trace_id,
        model = %request.model,
        adapter = %adapter,
        stream = request.stream,
        messages = request.messages.len()
    );

    let credential = state.pool.next().await.map_err(|err| {
        warn!(event = "chat_failed", trace_id = %trace_id, error = %err);
        GatewayError::from(err)
    })?;
    let mut controller = SessionController::new(credential, state.upstream.clone());

    let opened = async {
        controller.authenticate().await?;
        let conversation_id = controller.create_conversation(&prompt, &adapter).await?;
        let content = controller.stream_response(&conversation_id).await?;
        Ok::<_, ctoproxy_provider_core::ClientError>((conversation_id, content))
    }
    .await;
    let (conversation_id, content) = opened.map_err(|err| {
        warn!(event = "chat_failed", trace_id = %trace_id, error = %err);
        GatewayError::from(err)
    })?;

    let completion_id = format!("chatcmpl-{conversation_id}");
    let created = unix_now();

    if request.stream {
        return Ok(sse_response(
            content,
            StreamMeta {
                trace_id,
                completion_id,
                created,
                model: request.model,
            },
        ));
    }

    let text = content.collect_text().await.map_err(|err| {
        warn!(event = "chat_failed", trace_id = %trace_id, error = %err);
        GatewayError::from(err)
    })?;
    let usage = state.tokens.usage(&prompt, &text);
    info!(
        event = "chat_completed",
        trace_id = %trace_id,
        completion_tokens = usage.completion_tokens
    );
    Ok((
        StatusCode::OK,
        Json(ChatCompletionResponse::assistant(
            completion_id,
            created,
            request.model,
            text,
            usage,
        )),
    )
        .into_response())
}
