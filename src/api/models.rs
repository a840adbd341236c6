//! API request and response models.
//!
//! This module defines the chat completion request shape shared by all
//! three completion endpoints, plus the synthetic stream chunk types used
//! for locally generated events (waiting messages and simulated audio).

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use utoipa::ToSchema;

/// Chat completion request following the OpenAI API format.
///
/// The same body is accepted by `/chat/completions`,
/// `/rag/chat/completions`, and `/audio/chat/completions`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "model": "gpt-4o-mini",
    "messages": [
        {"role": "system", "content": "You are a helpful assistant."},
        {"role": "user", "content": "Hello!"}
    ],
    "stream": true
}))]
pub struct ChatCompletionRequest {
    /// Conversation messages, oldest first
    pub messages: Vec<Message>,

    /// Model identifier; the configured default is used when omitted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Whether to stream the response; only streaming is supported and
    /// an absent value is treated as true
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,

    /// Opaque caller context supplied by the conversational engine.
    /// Accepted for compatibility, not forwarded upstream.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,

    /// Response format constraint forwarded upstream
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,

    /// Requested output modalities, e.g. `["text"]`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modalities: Option<Vec<String>>,

    /// Audio output parameters forwarded upstream
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio: Option<Value>,

    /// Tools available to the model
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<Tool>>,

    /// Tool selection strategy, either a string or a structured choice.
    /// Only forwarded when at least one tool is present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<Value>,

    /// Whether the model may call tools in parallel
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parallel_tool_calls: Option<bool>,

    /// Streaming options forwarded upstream, e.g. `{"include_usage": true}`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_options: Option<Value>,
}

impl ChatCompletionRequest {
    /// Effective streaming flag. An absent `stream` field means streaming.
    pub fn wants_stream(&self) -> bool {
        self.stream.unwrap_or(true)
    }
}

/// Role of a conversation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instructions to the model
    System,
    /// End-user input
    User,
    /// Model output
    Assistant,
    /// Result of a tool call
    Tool,
}

/// A single message in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({"role": "user", "content": "Hello!"}))]
pub struct Message {
    /// Speaker role
    pub role: Role,

    /// Message content; assistant messages carrying only tool calls may
    /// omit it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<MessageContent>,

    /// Audio reference from a previous assistant turn
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio: Option<Value>,

    /// Identifier linking a tool message to the originating call
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,

    /// Tool calls issued by an assistant message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<Value>>,
}

impl Message {
    /// Plain-text system message. Used to inject retrieved context ahead
    /// of the original conversation.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: Some(MessageContent::Text(content.into())),
            audio: None,
            tool_call_id: None,
            tool_calls: None,
        }
    }
}

/// Message content, either plain text or a list of typed parts.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum MessageContent {
    /// Plain text content
    Text(String),
    /// Multimodal content parts
    Parts(Vec<ContentPart>),
}

/// One typed part of a multimodal message.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    /// Plain text
    Text {
        /// The text itself
        text: String,
    },
    /// Image reference
    Image {
        /// URL of the image
        image_url: String,
    },
    /// Base64-encoded audio input
    InputAudio {
        /// Audio payload and format, e.g. `{"data": "...", "format": "wav"}`
        input_audio: HashMap<String, String>,
    },
}

/// Tool definition made available to the model.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Tool {
    /// Tool type, currently always "function"
    #[serde(rename = "type", default = "default_tool_type")]
    pub tool_type: String,

    /// Function definition
    pub function: ToolFunction,
}

fn default_tool_type() -> String {
    "function".to_string()
}

/// Function signature of a tool.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ToolFunction {
    /// Function name
    pub name: String,

    /// Human-readable description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// JSON schema of the function parameters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,

    /// Whether arguments must match the schema exactly
    #[serde(default)]
    pub strict: bool,
}

/// Response format constraint.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ResponseFormat {
    /// Format type, e.g. "json_schema"
    #[serde(rename = "type")]
    pub format_type: String,

    /// Schema definition when the type is "json_schema"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json_schema: Option<Value>,
}

/// Synthetic streaming chunk for locally generated events.
///
/// Matches the wire shape of upstream chat completion chunks so the
/// conversational engine consumes waiting messages and audio events
/// exactly like relayed model output.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "id": "waiting_msg",
    "choices": [{
        "index": 0,
        "delta": {"role": "assistant", "content": "Just a moment, I'm thinking..."},
        "finish_reason": null
    }]
}))]
pub struct StreamChunk {
    /// Chunk identifier
    pub id: String,

    /// Incremental choices, always exactly one for synthetic chunks
    pub choices: Vec<StreamChoice>,
}

impl StreamChunk {
    /// Single-choice chunk with the given id and delta.
    pub fn new(id: impl Into<String>, delta: Delta) -> Self {
        Self {
            id: id.into(),
            choices: vec![StreamChoice {
                index: 0,
                delta,
                finish_reason: None,
            }],
        }
    }
}

/// One choice inside a streaming chunk.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StreamChoice {
    /// Choice index, always 0
    pub index: u32,

    /// Incremental payload
    pub delta: Delta,

    /// Completion state; synthetic chunks never finish a turn, so this
    /// serializes as an explicit null
    pub finish_reason: Option<String>,
}

/// Incremental message payload inside a stream choice.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct Delta {
    /// Speaker role, present in the first chunk of a turn
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    /// Text fragment
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    /// Audio fragment
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio: Option<AudioDelta>,
}

impl Delta {
    /// Assistant-role text delta, used for waiting messages.
    pub fn assistant_text(content: impl Into<String>) -> Self {
        Self {
            role: Some("assistant".to_string()),
            content: Some(content.into()),
            audio: None,
        }
    }

    /// Transcript delta announcing an audio response.
    pub fn audio_transcript(audio_id: impl Into<String>, transcript: impl Into<String>) -> Self {
        Self {
            role: None,
            content: None,
            audio: Some(AudioDelta {
                id: audio_id.into(),
                transcript: Some(transcript.into()),
                data: None,
            }),
        }
    }

    /// Audio data delta carrying one base64-encoded PCM chunk.
    pub fn audio_data(audio_id: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            role: None,
            content: None,
            audio: Some(AudioDelta {
                id: audio_id.into(),
                transcript: None,
                data: Some(data.into()),
            }),
        }
    }
}

/// Audio payload fragment inside a delta.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AudioDelta {
    /// Correlation ID shared by the transcript and every audio chunk of
    /// one response
    pub id: String,

    /// Transcript text, only on the transcript event
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,

    /// Base64-encoded PCM payload, only on chunk events
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

/// Liveness response for `GET /ping`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({"message": "pong"}))]
pub struct PingResponse {
    /// Always "pong"
    pub message: String,
}

/// Error body returned before a response commits to SSE.
///
/// Errors occurring after the stream has started are delivered in-band
/// as `data: {"error": ...}` events instead.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({"detail": "chat completions require streaming"}))]
pub struct ErrorResponse {
    /// Human-readable error description
    pub detail: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_deserialize_minimal_request() {
        let request: ChatCompletionRequest = serde_json::from_value(json!({
            "messages": [{"role": "user", "content": "hi"}],
            "model": "gpt-4o-mini",
            "stream": true
        }))
        .unwrap();

        assert_eq!(request.model.as_deref(), Some("gpt-4o-mini"));
        assert_eq!(request.messages.len(), 1);
        assert_eq!(request.messages[0].role, Role::User);
        assert!(request.wants_stream());
    }

    #[test]
    fn test_stream_defaults_to_true_when_absent() {
        let request: ChatCompletionRequest = serde_json::from_value(json!({
            "messages": [{"role": "user", "content": "hi"}]
        }))
        .unwrap();

        assert!(request.stream.is_none());
        assert!(request.wants_stream());
    }

    #[test]
    fn test_explicit_stream_false() {
        let request: ChatCompletionRequest = serde_json::from_value(json!({
            "messages": [{"role": "user", "content": "hi"}],
            "stream": false
        }))
        .unwrap();

        assert!(!request.wants_stream());
    }

    #[test]
    fn test_deserialize_structured_content() {
        let request: ChatCompletionRequest = serde_json::from_value(json!({
            "messages": [{
                "role": "user",
                "content": [
                    {"type": "text", "text": "describe this"},
                    {"type": "image", "image_url": "https://example.com/cat.png"},
                    {"type": "input_audio", "input_audio": {"data": "AAAA", "format": "wav"}}
                ]
            }]
        }))
        .unwrap();

        match &request.messages[0].content {
            Some(MessageContent::Parts(parts)) => {
                assert_eq!(parts.len(), 3);
                assert!(matches!(parts[0], ContentPart::Text { .. }));
                assert!(matches!(parts[1], ContentPart::Image { .. }));
                assert!(matches!(parts[2], ContentPart::InputAudio { .. }));
            }
            other => panic!("expected content parts, got {:?}", other),
        }
    }

    #[test]
    fn test_deserialize_tool_message() {
        let request: ChatCompletionRequest = serde_json::from_value(json!({
            "messages": [{
                "role": "tool",
                "content": "42",
                "tool_call_id": "call_abc"
            }]
        }))
        .unwrap();

        assert_eq!(request.messages[0].role, Role::Tool);
        assert_eq!(request.messages[0].tool_call_id.as_deref(), Some("call_abc"));
    }

    #[test]
    fn test_deserialize_tools() {
        let request: ChatCompletionRequest = serde_json::from_value(json!({
            "messages": [{"role": "user", "content": "weather?"}],
            "tools": [{
                "type": "function",
                "function": {
                    "name": "get_weather",
                    "description": "Look up the weather",
                    "parameters": {"type": "object", "properties": {}}
                }
            }],
            "tool_choice": "auto"
        }))
        .unwrap();

        let tools = request.tools.as_ref().unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].function.name, "get_weather");
        assert!(!tools[0].function.strict);
        assert_eq!(request.tool_choice, Some(json!("auto")));
    }

    #[test]
    fn test_message_roundtrip_preserves_string_content() {
        let message = Message {
            role: Role::User,
            content: Some(MessageContent::Text("hello".to_string())),
            audio: None,
            tool_call_id: None,
            tool_calls: None,
        };

        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value, json!({"role": "user", "content": "hello"}));
    }

    #[test]
    fn test_waiting_chunk_shape() {
        let chunk = StreamChunk::new(
            "waiting_msg",
            Delta::assistant_text("Just a moment, I'm thinking..."),
        );
        let value = serde_json::to_value(&chunk).unwrap();

        assert_eq!(
            value,
            json!({
                "id": "waiting_msg",
                "choices": [{
                    "index": 0,
                    "delta": {
                        "role": "assistant",
                        "content": "Just a moment, I'm thinking..."
                    },
                    "finish_reason": null
                }]
            })
        );
    }

    #[test]
    fn test_transcript_chunk_shape() {
        let chunk = StreamChunk::new("abc123", Delta::audio_transcript("audio42", "hello there"));
        let value = serde_json::to_value(&chunk).unwrap();

        assert_eq!(
            value,
            json!({
                "id": "abc123",
                "choices": [{
                    "index": 0,
                    "delta": {
                        "audio": {"id": "audio42", "transcript": "hello there"}
                    },
                    "finish_reason": null
                }]
            })
        );
    }

    #[test]
    fn test_audio_data_chunk_shape() {
        let chunk = StreamChunk::new("def456", Delta::audio_data("audio42", "AAECAw=="));
        let value = serde_json::to_value(&chunk).unwrap();

        assert_eq!(
            value,
            json!({
                "id": "def456",
                "choices": [{
                    "index": 0,
                    "delta": {
                        "audio": {"id": "audio42", "data": "AAECAw=="}
                    },
                    "finish_reason": null
                }]
            })
        );
    }

    #[test]
    fn test_system_message_helper() {
        let message = Message::system("Use this context: facts");
        let value = serde_json::to_value(&message).unwrap();

        assert_eq!(
            value,
            json!({"role": "system", "content": "Use this context: facts"})
        );
    }
}
