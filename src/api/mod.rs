//! API layer for the chat completion gateway.
//!
//! This module contains the HTTP handlers, request/response models,
//! SSE streaming support, and OpenAPI documentation.

pub mod docs;
pub mod handlers;
pub mod models;
pub mod streaming;

// Re-export commonly used types
pub use docs::ApiDoc;
pub use handlers::{
    audio_chat_completions, chat_completions, metrics_handler, ping, rag_chat_completions,
    AppState, AUDIO_ENDPOINT, CHAT_ENDPOINT, RAG_ENDPOINT,
};
pub use models::{ChatCompletionRequest, ErrorResponse, Message, PingResponse, StreamChunk};
pub use streaming::{format_sse_data, format_sse_done, format_sse_error, sse_response};
