//! Knowledge retrieval for the RAG endpoint.
//!
//! Retrieval is a variation point: the shipped implementation is a stub
//! returning a fixed answer, and a real retriever (vector search, keyword
//! index, external service) can be substituted without touching the relay.

use crate::api::models::Message;
use crate::core::error::AppError;
use async_trait::async_trait;
use thiserror::Error;

/// Failure modes of a retriever.
#[derive(Error, Debug)]
pub enum RetrievalError {
    /// Backing store could not answer the query
    #[error("knowledge base unavailable: {0}")]
    Unavailable(String),
}

impl From<RetrievalError> for AppError {
    fn from(err: RetrievalError) -> Self {
        AppError::Retrieval(err.to_string())
    }
}

/// Pluggable knowledge retrieval backing the RAG endpoint.
///
/// Implementations receive the full conversation, typically query on the
/// first or last message, and return the context text injected ahead of
/// the upstream completion call.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Retrieve context relevant to the given conversation.
    async fn retrieve(&self, messages: &[Message]) -> Result<String, RetrievalError>;
}

/// Stub retriever returning a fixed knowledge base answer.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeBaseStub;

#[async_trait]
impl Retriever for KnowledgeBaseStub {
    async fn retrieve(&self, _messages: &[Message]) -> Result<String, RetrievalError> {
        Ok("This is relevant content retrieved from the knowledge base.".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stub_returns_canned_context() {
        let retriever = KnowledgeBaseStub;
        let context = retriever.retrieve(&[]).await.unwrap();
        assert_eq!(
            context,
            "This is relevant content retrieved from the knowledge base."
        );
    }

    #[test]
    fn test_retrieval_error_converts_to_app_error() {
        let err = RetrievalError::Unavailable("index offline".to_string());
        let app_err: AppError = err.into();
        assert!(matches!(app_err, AppError::Retrieval(_)));
        assert_eq!(
            app_err.to_string(),
            "retrieval error: knowledge base unavailable: index offline"
        );
    }
}
