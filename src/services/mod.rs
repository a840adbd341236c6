//! Business logic services for the gateway.
//!
//! This module contains the upstream completion client and the pluggable
//! collaborators behind the RAG and audio endpoints.

pub mod audio;
pub mod completion;
pub mod retrieval;

// Re-export commonly used types
pub use audio::{AssetError, AssetSource, FileAssetSource};
pub use completion::{CompletionClient, SseDecoder};
pub use retrieval::{KnowledgeBaseStub, RetrievalError, Retriever};
