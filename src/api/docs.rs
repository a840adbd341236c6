//! OpenAPI documentation for the gateway API.

use utoipa::OpenApi;

/// OpenAPI documentation covering the chat, health, and metrics surface.
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::api::handlers::chat_completions,
        crate::api::handlers::rag_chat_completions,
        crate::api::handlers::audio_chat_completions,
        crate::api::handlers::ping,
    ),
    components(
        schemas(
            crate::api::models::ChatCompletionRequest,
            crate::api::models::Message,
            crate::api::models::Role,
            crate::api::models::MessageContent,
            crate::api::models::ContentPart,
            crate::api::models::Tool,
            crate::api::models::ToolFunction,
            crate::api::models::ResponseFormat,
            crate::api::models::StreamChunk,
            crate::api::models::StreamChoice,
            crate::api::models::Delta,
            crate::api::models::AudioDelta,
            crate::api::models::PingResponse,
            crate::api::models::ErrorResponse,
        )
    ),
    tags(
        (name = "chat", description = "Streaming chat completion endpoints consumed by the conversational engine"),
        (name = "health", description = "Liveness probes")
    ),
    info(
        title = "Custom LLM Gateway",
        version = "1.0.0",
        description = "SSE gateway exposing OpenAI-compatible streaming chat completions with optional RAG context injection and simulated audio output.",
        license(name = "MIT")
    ),
    servers(
        (url = "http://127.0.0.1:8000", description = "Local development server")
    )
)]
pub struct ApiDoc;
