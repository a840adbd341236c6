//! Server-Sent Events (SSE) streaming support for chat completions.
//!
//! This module owns the wire format of every streaming response: the
//! `data: <payload>\n\n` framing, the in-band error payload, and the
//! terminal `data: [DONE]` marker. Handlers compose their event
//! sequences out of these helpers so the framing stays identical across
//! the basic, RAG, and audio endpoints.

use crate::api::models::StreamChunk;
use crate::core::metrics::get_metrics;
use crate::services::CompletionClient;
use axum::body::Body;
use axum::response::Response;
use futures::stream::{Stream, StreamExt};
use std::time::Duration;

use crate::api::models::ChatCompletionRequest;
use crate::core::error::{AppError, Result};

/// Frame a single SSE data event.
pub fn format_sse_data(data: &str) -> String {
    format!("data: {}\n\n", data)
}

/// The terminal marker sent exactly once at the end of every stream.
pub fn format_sse_done() -> String {
    "data: [DONE]\n\n".to_string()
}

/// Frame an in-band error event.
///
/// Errors that occur after the response has been committed cannot change
/// the HTTP status anymore, so they are delivered as a regular data
/// event carrying an `{"error": ...}` payload.
pub fn format_sse_error(message: &str) -> String {
    format_sse_data(&serde_json::json!({ "error": message }).to_string())
}

/// Serialize a locally built chunk into an SSE frame.
///
/// The synthetic chunk types serialize infallibly; if serialization ever
/// does fail the problem is reported in-band instead of panicking inside
/// a committed stream.
pub fn format_sse_chunk(chunk: &StreamChunk) -> String {
    match serde_json::to_string(chunk) {
        Ok(json) => format_sse_data(&json),
        Err(e) => format_sse_error(&format!("failed to encode chunk: {}", e)),
    }
}

/// Reject requests that cannot be served as an SSE stream.
///
/// Runs before the response is committed, so failures surface as HTTP
/// 400 with a `{"detail": ...}` body rather than in-band errors.
pub fn validate_streaming_request(request: &ChatCompletionRequest) -> Result<()> {
    if request.messages.is_empty() {
        return Err(AppError::Validation("missing messages".to_string()));
    }

    if !request.wants_stream() {
        return Err(AppError::Validation(
            "chat completions require streaming".to_string(),
        ));
    }

    Ok(())
}

/// Wrap a stream of pre-formatted SSE frames in a committed response.
pub fn sse_response<S>(stream: S) -> Response
where
    S: Stream<Item = String> + Send + 'static,
{
    let byte_stream = stream.map(|frame| Ok::<Vec<u8>, std::io::Error>(frame.into_bytes()));
    let body = Body::from_stream(byte_stream);

    Response::builder()
        .status(200)
        .header("Content-Type", "text/event-stream")
        .header("Cache-Control", "no-cache")
        .header("Connection", "keep-alive")
        .body(body)
        .unwrap()
}

/// Tracks one open SSE stream in the active-streams gauge.
///
/// The guard lives inside the stream generator, so dropping the response
/// body, whether at normal completion or on client disconnect, always
/// decrements the gauge. A drop before [`finish`](Self::finish) means
/// the client went away before the terminal marker.
pub struct StreamGuard {
    endpoint: &'static str,
    completed: bool,
}

impl StreamGuard {
    pub fn new(endpoint: &'static str) -> Self {
        get_metrics()
            .active_streams
            .with_label_values(&[endpoint])
            .inc();
        Self {
            endpoint,
            completed: false,
        }
    }

    /// Mark the stream as terminated by its own [DONE] marker.
    pub fn finish(&mut self) {
        self.completed = true;
    }
}

impl Drop for StreamGuard {
    fn drop(&mut self) {
        get_metrics()
            .active_streams
            .with_label_values(&[self.endpoint])
            .dec();

        if !self.completed {
            tracing::info!(
                endpoint = self.endpoint,
                "Client disconnected before stream completion"
            );
        }
    }
}

/// Record one emitted SSE event for the per-endpoint event counter.
pub fn count_event(endpoint: &'static str, kind: &str) {
    get_metrics()
        .sse_events
        .with_label_values(&[endpoint, kind])
        .inc();
}

/// Forward one upstream completion stream as SSE data frames.
///
/// Yields one frame per upstream data payload, in arrival order. Any
/// failure - opening the upstream connection, a mid-stream transport
/// error, or no chunk arriving within `idle_timeout` - emits a single
/// in-band error frame and ends the stream. The terminal marker is the
/// caller's responsibility, so callers can guarantee exactly one [DONE]
/// regardless of how forwarding ended.
pub fn forward_upstream(
    endpoint: &'static str,
    client: CompletionClient,
    request: ChatCompletionRequest,
    idle_timeout: Duration,
) -> impl Stream<Item = String> + Send + 'static {
    async_stream::stream! {
        let upstream = match client.stream_chat(&request).await {
            Ok(upstream) => upstream,
            Err(e) => {
                tracing::error!(endpoint, error = %e, "Failed to open upstream stream");
                count_event(endpoint, "error");
                yield format_sse_error(&e.to_string());
                return;
            }
        };

        futures::pin_mut!(upstream);

        loop {
            match tokio::time::timeout(idle_timeout, upstream.next()).await {
                Ok(Some(Ok(payload))) => {
                    count_event(endpoint, "chunk");
                    yield format_sse_data(&payload);
                }
                Ok(Some(Err(e))) => {
                    tracing::error!(endpoint, error = %e, "Upstream stream failed mid-relay");
                    count_event(endpoint, "error");
                    yield format_sse_error(&e.to_string());
                    return;
                }
                Ok(None) => return,
                Err(_) => {
                    tracing::error!(
                        endpoint,
                        idle_timeout_secs = idle_timeout.as_secs(),
                        "No upstream chunk within idle timeout"
                    );
                    count_event(endpoint, "error");
                    yield format_sse_error("upstream stream idle timeout");
                    return;
                }
            }
        }
    }
}

/// Complete SSE frame stream for the basic chat completion endpoint:
/// every upstream payload in order, then exactly one terminal marker.
pub fn relay_chat(
    endpoint: &'static str,
    client: CompletionClient,
    request: ChatCompletionRequest,
    idle_timeout: Duration,
) -> impl Stream<Item = String> + Send + 'static {
    async_stream::stream! {
        let mut guard = StreamGuard::new(endpoint);

        let forward = forward_upstream(endpoint, client, request, idle_timeout);
        futures::pin_mut!(forward);
        while let Some(frame) = forward.next().await {
            yield frame;
        }

        count_event(endpoint, "done");
        yield format_sse_done();
        guard.finish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::Delta;
    use crate::core::metrics::init_metrics;

    #[test]
    fn test_format_sse_data() {
        assert_eq!(format_sse_data("{}"), "data: {}\n\n");
        assert_eq!(format_sse_data("hello"), "data: hello\n\n");
    }

    #[test]
    fn test_format_sse_done() {
        assert_eq!(format_sse_done(), "data: [DONE]\n\n");
    }

    #[test]
    fn test_format_sse_error_wraps_message() {
        let frame = format_sse_error("upstream error: boom");
        assert_eq!(frame, "data: {\"error\":\"upstream error: boom\"}\n\n");
    }

    #[test]
    fn test_format_sse_chunk_is_parseable() {
        let chunk = StreamChunk::new("waiting_msg", Delta::assistant_text("thinking"));
        let frame = format_sse_chunk(&chunk);

        assert!(frame.starts_with("data: "));
        assert!(frame.ends_with("\n\n"));

        let payload = frame
            .strip_prefix("data: ")
            .and_then(|rest| rest.strip_suffix("\n\n"))
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(payload).unwrap();
        assert_eq!(value["id"], "waiting_msg");
        assert_eq!(value["choices"][0]["delta"]["content"], "thinking");
    }

    #[test]
    fn test_validate_rejects_empty_messages() {
        let request = ChatCompletionRequest {
            messages: vec![],
            ..Default::default()
        };

        let err = validate_streaming_request(&request).unwrap_err();
        assert_eq!(err.to_string(), "missing messages");
    }

    #[test]
    fn test_validate_rejects_non_streaming() {
        let request = ChatCompletionRequest {
            messages: vec![crate::api::models::Message::system("hi")],
            stream: Some(false),
            ..Default::default()
        };

        let err = validate_streaming_request(&request).unwrap_err();
        assert_eq!(err.to_string(), "chat completions require streaming");
    }

    #[test]
    fn test_validate_accepts_absent_stream_field() {
        let request = ChatCompletionRequest {
            messages: vec![crate::api::models::Message::system("hi")],
            ..Default::default()
        };

        assert!(validate_streaming_request(&request).is_ok());
    }

    #[tokio::test]
    async fn test_sse_response_headers() {
        let stream = futures::stream::iter(vec![format_sse_done()]);
        let response = sse_response(stream);

        assert_eq!(response.status(), 200);
        assert_eq!(
            response.headers().get("Content-Type").unwrap(),
            "text/event-stream"
        );
        assert_eq!(response.headers().get("Cache-Control").unwrap(), "no-cache");
        assert_eq!(
            response.headers().get("Connection").unwrap(),
            "keep-alive"
        );
    }

    #[tokio::test]
    async fn test_relay_emits_error_then_done_when_upstream_unreachable() {
        init_metrics();

        let client = CompletionClient::new(
            reqwest::Client::new(),
            "http://127.0.0.1:9",
            None,
            "test-model",
        );
        let request = ChatCompletionRequest {
            messages: vec![crate::api::models::Message::system("hi")],
            ..Default::default()
        };

        let frames: Vec<String> = relay_chat(
            "/chat/completions",
            client,
            request,
            Duration::from_secs(5),
        )
        .collect()
        .await;

        assert_eq!(frames.len(), 2);
        let payload = frames[0]
            .strip_prefix("data: ")
            .and_then(|rest| rest.strip_suffix("\n\n"))
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(payload).unwrap();
        assert!(value["error"].is_string());
        assert_eq!(frames[1], "data: [DONE]\n\n");
    }

    #[tokio::test]
    async fn test_stream_guard_tracks_active_streams() {
        init_metrics();

        let gauge = get_metrics()
            .active_streams
            .with_label_values(&["/test/guard"]);
        let before = gauge.get();

        {
            let mut guard = StreamGuard::new("/test/guard");
            assert_eq!(gauge.get(), before + 1.0);
            guard.finish();
        }

        assert_eq!(gauge.get(), before);
    }
}
