//! Custom LLM Gateway - an SSE chat-completion service for conversational agents
//!
//! This library implements the custom-LLM HTTP contract of a conversational AI
//! engine: OpenAI-compatible streaming chat completions relayed over
//! Server-Sent Events, with features including:
//!
//! - **Streaming Relay**: forwards upstream completion chunks one-to-one,
//!   always terminating the stream with a `data: [DONE]` sentinel
//! - **RAG Context Injection**: streams a filler message while knowledge
//!   retrieval runs, then relays the completion over the augmented prompt
//! - **Simulated Audio Output**: replays a transcript and base64 PCM chunks
//!   from local assets, with generated fallback data when assets are missing
//! - **Metrics & Monitoring**: Prometheus metrics for observability
//!
//! # Architecture
//!
//! The codebase is organized into three main layers:
//!
//! - [`core`]: Core functionality (config, errors, metrics, middleware)
//! - [`api`]: HTTP handlers, streaming support, and request/response models
//! - [`services`]: Upstream completion client, retrieval, and audio assets
//!
//! # Configuration
//!
//! All configuration comes from environment variables, every one optional:
//! - `LLM_API_KEY`: Upstream API key (unauthenticated requests without it)
//! - `LLM_API_BASE`: Upstream API base URL (default: https://api.openai.com/v1)
//! - `LLM_DEFAULT_MODEL`: Model used when a request omits one
//! - `HOST` / `PORT`: Bind address (default: 0.0.0.0:8000)
//! - `VERIFY_SSL`: Verify upstream TLS certificates (default: true)
//! - `REQUEST_TIMEOUT_SECS`: Overall upstream request timeout (default: 300)
//! - `STREAM_IDLE_TIMEOUT_SECS`: Max gap between upstream chunks (default: 90)
//! - `TRANSCRIPT_FILE` / `PCM_FILE`: Simulated audio asset paths
//! - `AUDIO_SAMPLE_RATE` / `AUDIO_CHUNK_MS`: PCM chunking parameters

pub mod api;
pub mod core;
pub mod services;

// Re-export commonly used types for convenience
pub use api::{ApiDoc, AppState, ChatCompletionRequest};
pub use core::{AppConfig, AppError, Result};
pub use services::{AssetSource, CompletionClient, Retriever};
