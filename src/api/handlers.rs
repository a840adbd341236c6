//! HTTP request handlers for the chat completion gateway.
//!
//! Three SSE endpoints share one request shape and one framing contract:
//! `/chat/completions` relays the upstream stream unchanged,
//! `/rag/chat/completions` inserts a filler message and retrieved context
//! ahead of the relay, and `/audio/chat/completions` replays a simulated
//! multimodal answer from local assets. Liveness and metrics endpoints
//! round out the surface.

use crate::api::models::{
    ChatCompletionRequest, Delta, ErrorResponse, Message, PingResponse, StreamChunk,
};
use crate::api::streaming::{
    count_event, format_sse_chunk, format_sse_done, format_sse_error, forward_upstream,
    relay_chat, sse_response, validate_streaming_request, StreamGuard,
};
use crate::core::config::AppConfig;
use crate::core::middleware::ModelName;
use crate::core::{AppError, Result};
use crate::services::audio::{fallback_audio_chunks, fallback_transcript, pcm_chunk_size};
use crate::services::{AssetError, AssetSource, CompletionClient, Retriever};
use axum::{
    extract::rejection::JsonRejection,
    extract::State,
    http::StatusCode,
    response::Response,
    Json,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use futures::StreamExt;
use prometheus::{Encoder, TextEncoder};
use rand::{thread_rng, Rng};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Endpoint label for the plain relay, also its route path.
pub const CHAT_ENDPOINT: &str = "/chat/completions";
/// Endpoint label for the RAG relay, also its route path.
pub const RAG_ENDPOINT: &str = "/rag/chat/completions";
/// Endpoint label for the simulated audio stream, also its route path.
pub const AUDIO_ENDPOINT: &str = "/audio/chat/completions";

/// Chunk id carried by every filler message.
const WAITING_MESSAGE_ID: &str = "waiting_msg";

/// Filler lines streamed while knowledge retrieval is in flight.
const WAITING_PHRASES: &[&str] = &[
    "Just a moment, I'm thinking...",
    "Let me think about that for a second...",
    "Good question, let me find out...",
];

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub completion: CompletionClient,
    pub retriever: Arc<dyn Retriever>,
    pub assets: Arc<dyn AssetSource>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        completion: CompletionClient,
        retriever: Arc<dyn Retriever>,
        assets: Arc<dyn AssetSource>,
    ) -> Self {
        Self {
            config,
            completion,
            retriever,
            assets,
        }
    }

    /// Maximum gap tolerated between consecutive upstream chunks.
    fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.config.stream_idle_timeout_secs)
    }
}

/// Pick one filler phrase at random.
fn waiting_phrase() -> &'static str {
    let mut rng = thread_rng();
    WAITING_PHRASES[rng.gen_range(0..WAITING_PHRASES.len())]
}

/// Prepend a system message embedding the retrieved context. The
/// original messages, including any existing system messages, follow
/// unchanged.
fn inject_context(context: &str, messages: &mut Vec<Message>) {
    messages.insert(
        0,
        Message::system(format!(
            "Use the following retrieved context when answering:\n\n{}",
            context
        )),
    );
}

/// Relay a streaming chat completion from the upstream provider.
///
/// The response commits to SSE once validation passes; anything that
/// fails afterwards is reported in-band and the stream still terminates
/// with `data: [DONE]`.
#[utoipa::path(
    post,
    path = "/chat/completions",
    tag = "chat",
    request_body = ChatCompletionRequest,
    responses(
        (status = 200, description = "SSE stream of completion chunks terminated by `data: [DONE]`", body = String, content_type = "text/event-stream"),
        (status = 400, description = "Invalid request", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, payload))]
pub async fn chat_completions(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<ChatCompletionRequest>, JsonRejection>,
) -> Result<Response> {
    let Json(request) = payload.map_err(|e| AppError::Validation(e.body_text()))?;
    validate_streaming_request(&request)?;

    let model = state.completion.effective_model(&request);
    tracing::debug!(
        model = %model,
        messages = request.messages.len(),
        "Relaying chat completion request"
    );

    let stream = relay_chat(
        CHAT_ENDPOINT,
        state.completion.clone(),
        request,
        state.idle_timeout(),
    );

    let mut response = sse_response(stream);
    response.extensions_mut().insert(ModelName(model));
    Ok(response)
}

/// Stream a chat completion augmented with retrieved context.
///
/// A filler message goes out first so the caller has something to play
/// while retrieval runs, then the augmented conversation is relayed like
/// the plain endpoint. Retrieval failures are reported in-band; the
/// stream always terminates with `data: [DONE]`.
#[utoipa::path(
    post,
    path = "/rag/chat/completions",
    tag = "chat",
    request_body = ChatCompletionRequest,
    responses(
        (status = 200, description = "SSE stream: one filler chunk, then completion chunks, then `data: [DONE]`", body = String, content_type = "text/event-stream"),
        (status = 400, description = "Invalid request", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, payload))]
pub async fn rag_chat_completions(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<ChatCompletionRequest>, JsonRejection>,
) -> Result<Response> {
    let Json(mut request) = payload.map_err(|e| AppError::Validation(e.body_text()))?;
    validate_streaming_request(&request)?;

    let model = state.completion.effective_model(&request);
    tracing::debug!(
        model = %model,
        messages = request.messages.len(),
        "Processing RAG chat completion request"
    );

    let completion = state.completion.clone();
    let retriever = state.retriever.clone();
    let idle_timeout = state.idle_timeout();

    let stream = async_stream::stream! {
        let mut guard = StreamGuard::new(RAG_ENDPOINT);

        let waiting = StreamChunk::new(
            WAITING_MESSAGE_ID,
            Delta::assistant_text(waiting_phrase()),
        );
        count_event(RAG_ENDPOINT, "waiting");
        yield format_sse_chunk(&waiting);

        match retriever.retrieve(&request.messages).await {
            Ok(context) => {
                inject_context(&context, &mut request.messages);

                let forward =
                    forward_upstream(RAG_ENDPOINT, completion, request, idle_timeout);
                futures::pin_mut!(forward);
                while let Some(frame) = forward.next().await {
                    yield frame;
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "Knowledge retrieval failed");
                count_event(RAG_ENDPOINT, "error");
                yield format_sse_error(&AppError::from(e).to_string());
            }
        }

        count_event(RAG_ENDPOINT, "done");
        yield format_sse_done();
        guard.finish();
    };

    let mut response = sse_response(stream);
    response.extensions_mut().insert(ModelName(model));
    Ok(response)
}

/// Stream a simulated audio completion from local assets.
///
/// Emits one transcript chunk, one chunk per PCM slice with a shared
/// correlation id and base64 payload, then `data: [DONE]`. Missing asset
/// files are replaced by generated fallback output so the endpoint works
/// without any files on disk.
#[utoipa::path(
    post,
    path = "/audio/chat/completions",
    tag = "chat",
    request_body = ChatCompletionRequest,
    responses(
        (status = 200, description = "SSE stream: one transcript chunk, audio chunks, then `data: [DONE]`", body = String, content_type = "text/event-stream"),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 500, description = "Asset read failure", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, payload))]
pub async fn audio_chat_completions(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<ChatCompletionRequest>, JsonRejection>,
) -> Result<Response> {
    let Json(request) = payload.map_err(|e| AppError::Validation(e.body_text()))?;
    validate_streaming_request(&request)?;

    let sample_rate = state.config.audio.sample_rate;
    let chunk_duration_ms = state.config.audio.chunk_duration_ms;
    if pcm_chunk_size(sample_rate, chunk_duration_ms) == 0 {
        return Err(AppError::Validation(format!(
            "invalid chunk size: sample rate {}, duration {}ms",
            sample_rate, chunk_duration_ms
        )));
    }

    // Assets load before the stream commits so hard read failures can
    // still surface as an HTTP error status.
    let (transcript, chunks) =
        load_audio_assets(state.assets.as_ref(), sample_rate, chunk_duration_ms).await?;

    let model = state.completion.effective_model(&request);
    tracing::debug!(
        model = %model,
        chunks = chunks.len(),
        "Streaming simulated audio response"
    );

    let stream = async_stream::stream! {
        let mut guard = StreamGuard::new(AUDIO_ENDPOINT);

        // One correlation id ties the transcript to every audio chunk.
        let audio_id = Uuid::new_v4().simple().to_string();

        let transcript_chunk = StreamChunk::new(
            Uuid::new_v4().simple().to_string(),
            Delta::audio_transcript(&audio_id, transcript),
        );
        count_event(AUDIO_ENDPOINT, "transcript");
        yield format_sse_chunk(&transcript_chunk);

        for chunk in &chunks {
            let audio_chunk = StreamChunk::new(
                Uuid::new_v4().simple().to_string(),
                Delta::audio_data(&audio_id, STANDARD.encode(chunk)),
            );
            count_event(AUDIO_ENDPOINT, "audio");
            yield format_sse_chunk(&audio_chunk);
        }

        count_event(AUDIO_ENDPOINT, "done");
        yield format_sse_done();
        guard.finish();
    };

    let mut response = sse_response(stream);
    response.extensions_mut().insert(ModelName(model));
    Ok(response)
}

/// Load the transcript and PCM chunks, substituting generated fallback
/// output when either asset file is missing. Read failures other than a
/// missing file are surfaced to the caller.
async fn load_audio_assets(
    assets: &dyn AssetSource,
    sample_rate: u32,
    chunk_duration_ms: u32,
) -> Result<(String, Vec<Bytes>)> {
    let transcript = assets.load_transcript().await;
    let chunks = assets.load_audio_chunks(sample_rate, chunk_duration_ms).await;

    match (transcript, chunks) {
        (Ok(transcript), Ok(chunks)) => Ok((transcript, chunks)),
        (Err(AssetError::NotFound(path)), _) | (_, Err(AssetError::NotFound(path))) => {
            tracing::warn!(path = %path, "Audio asset missing, using simulated fallback");
            Ok((fallback_transcript(), fallback_audio_chunks()))
        }
        (Err(e), _) | (_, Err(e)) => Err(e.into()),
    }
}

/// Liveness probe.
#[utoipa::path(
    get,
    path = "/ping",
    tag = "health",
    responses((status = 200, description = "Service is alive", body = PingResponse))
)]
pub async fn ping() -> Json<PingResponse> {
    Json(PingResponse {
        message: "pong".to_string(),
    })
}

/// Prometheus metrics endpoint.
#[tracing::instrument]
pub async fn metrics_handler() -> Result<Response> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", encoder.format_type())
        .body(buffer.into())
        .unwrap())
}
