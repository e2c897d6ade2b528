use crate::{ChatError, RetrievedChunk, ServiceError};
use async_trait::async_trait;

#[async_trait]
pub trait Retriever: Send + Sync {
    /// Returns up to `top_k` chunks, most similar first.
    async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<RetrievedChunk>, ChatError>;

    fn chunk_count(&self) -> usize;
}

#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, ServiceError>;
}
