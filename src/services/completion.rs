//! Upstream chat completion client.
//!
//! Opens streaming completion requests against an OpenAI-compatible API
//! and decodes the SSE response incrementally, yielding one chunk payload
//! per upstream event in arrival order.

use crate::api::models::ChatCompletionRequest;
use crate::core::error::{AppError, Result};
use futures::stream::Stream;
use futures::StreamExt;
use serde_json::{json, Value};

/// Maximum length of upstream error messages relayed to clients
const MAX_ERROR_MESSAGE_LEN: usize = 500;

/// Upstream stream terminator payload
pub const DONE_MARKER: &str = "[DONE]";

/// Client for an OpenAI-compatible streaming chat completion API.
///
/// Holds the shared HTTP connection pool plus the upstream endpoint,
/// credentials, and default model. Cheap to clone; constructed once at
/// startup and injected into the handlers via application state.
#[derive(Clone)]
pub struct CompletionClient {
    client: reqwest::Client,
    api_base: String,
    api_key: Option<String>,
    default_model: String,
}

impl CompletionClient {
    /// Create a new client.
    ///
    /// # Arguments
    ///
    /// * `client` - Shared HTTP client with pooling configured
    /// * `api_base` - Upstream API base URL, e.g. `https://api.openai.com/v1`
    /// * `api_key` - Bearer token; requests are sent unauthenticated when `None`
    /// * `default_model` - Model used when a request does not name one
    pub fn new(
        client: reqwest::Client,
        api_base: impl Into<String>,
        api_key: Option<String>,
        default_model: impl Into<String>,
    ) -> Self {
        let api_base = api_base.into().trim_end_matches('/').to_string();
        Self {
            client,
            api_base,
            api_key,
            default_model: default_model.into(),
        }
    }

    /// Model used when a request does not name one.
    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    /// Model that will be sent upstream for this request.
    pub fn effective_model(&self, request: &ChatCompletionRequest) -> String {
        request
            .model
            .clone()
            .unwrap_or_else(|| self.default_model.clone())
    }

    /// Build the upstream request body.
    ///
    /// `stream` is always forced to true. `tools` and `tool_choice` are
    /// only forwarded when at least one tool is present; the remaining
    /// optional fields pass through untouched when set.
    pub fn upstream_payload(&self, request: &ChatCompletionRequest) -> Result<Value> {
        let mut payload = json!({
            "model": self.effective_model(request),
            "messages": serde_json::to_value(&request.messages)?,
            "stream": true,
        });

        if let Some(tools) = request.tools.as_ref().filter(|t| !t.is_empty()) {
            payload["tools"] = serde_json::to_value(tools)?;
            if let Some(tool_choice) = &request.tool_choice {
                payload["tool_choice"] = tool_choice.clone();
            }
        }

        if let Some(response_format) = &request.response_format {
            payload["response_format"] = serde_json::to_value(response_format)?;
        }
        if let Some(modalities) = &request.modalities {
            payload["modalities"] = serde_json::to_value(modalities)?;
        }
        if let Some(audio) = &request.audio {
            payload["audio"] = audio.clone();
        }
        if let Some(stream_options) = &request.stream_options {
            payload["stream_options"] = stream_options.clone();
        }

        Ok(payload)
    }

    /// Open a streaming chat completion against the upstream API.
    ///
    /// On success the returned stream yields each upstream chunk payload
    /// verbatim (the JSON text following `data: `), ending when the
    /// upstream sends its `[DONE]` marker or closes the connection.
    /// Transport failures mid-stream surface as `Err` items.
    ///
    /// A non-2xx response fails the open with [`AppError::Upstream`]
    /// carrying the message extracted from the upstream error body.
    pub async fn stream_chat(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<impl Stream<Item = Result<String>> + Send + 'static> {
        let url = format!("{}/chat/completions", self.api_base);
        let payload = self.upstream_payload(request)?;

        let mut upstream_request = self.client.post(&url).json(&payload);
        if let Some(api_key) = &self.api_key {
            upstream_request =
                upstream_request.header("Authorization", format!("Bearer {}", api_key));
        }

        let response = upstream_request.send().await?;

        let status = response.status();
        if !status.is_success() {
            let message = read_error_body(response).await;
            tracing::error!(
                status = status.as_u16(),
                message = %message,
                "Upstream rejected completion request"
            );
            return Err(AppError::Upstream(message));
        }

        let mut bytes = response.bytes_stream();

        Ok(async_stream::stream! {
            let mut decoder = SseDecoder::new();

            while let Some(chunk) = bytes.next().await {
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        yield Err(AppError::from(e));
                        return;
                    }
                };

                for payload in decoder.feed(&chunk) {
                    if payload == DONE_MARKER {
                        return;
                    }
                    yield Ok(payload);
                }
            }
        })
    }
}

/// Incremental decoder for an SSE byte stream.
///
/// Buffers input until a complete event (terminated by a blank line) is
/// available, then yields the event's data payload. Comment lines and
/// non-data fields are ignored; multi-line data values are joined with
/// newlines per the SSE spec.
pub struct SseDecoder {
    buffer: String,
}

impl SseDecoder {
    /// Create a new decoder with an empty buffer.
    pub fn new() -> Self {
        SseDecoder {
            buffer: String::new(),
        }
    }

    /// Feed raw bytes, returning the data payloads of any events they
    /// complete.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.push_str(&String::from_utf8_lossy(chunk));

        let mut payloads = vec![];

        // Split on blank lines (event boundaries), LF or CRLF framed
        while let Some((pos, delim_len)) = find_event_boundary(&self.buffer) {
            let event_block = self.buffer[..pos].to_string();
            self.buffer = self.buffer[pos + delim_len..].to_string();

            let mut data: Option<String> = None;

            for line in event_block.lines() {
                let line = line.strip_suffix('\r').unwrap_or(line);
                if line.is_empty() || line.starts_with(':') {
                    continue;
                }

                if let Some(value) = line.strip_prefix("data:") {
                    let value = value.strip_prefix(' ').unwrap_or(value);
                    if let Some(ref mut data) = data {
                        data.push('\n');
                        data.push_str(value);
                    } else {
                        data = Some(value.to_string());
                    }
                }
            }

            if let Some(data) = data {
                payloads.push(data);
            }
        }

        payloads
    }

    /// Unconsumed buffer content, incomplete event data only.
    pub fn remaining(&self) -> &str {
        &self.buffer
    }
}

impl Default for SseDecoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Find the earliest event-terminating blank line, returning its byte
/// offset and delimiter length.
fn find_event_boundary(buffer: &str) -> Option<(usize, usize)> {
    let lf = buffer.find("\n\n").map(|pos| (pos, 2));
    let crlf = buffer.find("\r\n\r\n").map(|pos| (pos, 4));
    match (lf, crlf) {
        (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
        (a, b) => a.or(b),
    }
}

/// Extract canonical error message from an upstream error payload.
///
/// Tries `error.message`, a string `error`, and a top-level `message`
/// in that order.
pub fn extract_error_message(body: &Value) -> Option<String> {
    body.get("error")
        .and_then(|e| e.get("message"))
        .and_then(|m| m.as_str())
        .map(|s| s.to_string())
        .or_else(|| {
            body.get("error")
                .and_then(|e| e.as_str())
                .map(|s| s.to_string())
        })
        .or_else(|| {
            body.get("message")
                .and_then(|m| m.as_str())
                .map(|s| s.to_string())
        })
}

/// Truncate a message to a reasonable length for client consumption.
fn truncate_message(message: &str) -> String {
    let mut chars = message.chars();
    let truncated: String = chars.by_ref().take(MAX_ERROR_MESSAGE_LEN).collect();
    if chars.next().is_some() {
        format!("{}...", truncated)
    } else {
        truncated
    }
}

/// Derive the relayed error message for a non-2xx upstream response.
async fn read_error_body(response: reqwest::Response) -> String {
    let status = response.status();
    let raw_text = response.text().await.unwrap_or_default();

    serde_json::from_str::<Value>(&raw_text)
        .ok()
        .as_ref()
        .and_then(extract_error_message)
        .map(|m| truncate_message(&m))
        .unwrap_or_else(|| {
            if raw_text.is_empty() {
                format!("HTTP {}", status.as_u16())
            } else {
                truncate_message(&raw_text)
            }
        })
}
