use crate::embeddings::Embedder;
use crate::traits::Retriever;
use crate::{ChatError, RetrievedChunk, TextChunk};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

pub const DEFAULT_TOP_K: usize = 4;

/// Flat cosine-similarity index over one upload batch.
pub struct InMemoryVectorIndex {
    chunks: Vec<TextChunk>,
    embeddings: Vec<Vec<f32>>,
    embedder: Arc<dyn Embedder>,
}

impl InMemoryVectorIndex {
    pub async fn build(
        chunks: Vec<TextChunk>,
        embedder: Arc<dyn Embedder>,
    ) -> Result<Self, ChatError> {
        if chunks.is_empty() {
            return Err(ChatError::Config(
                "no text could be extracted from the uploaded documents".to_string(),
            ));
        }

        let texts = chunks
            .iter()
            .map(|chunk| chunk.text.clone())
            .collect::<Vec<_>>();
        let embeddings = embedder
            .embed_documents(&texts)
            .await
            .map_err(|error| ChatError::IndexBuild(error.to_string()))?;

        if embeddings.len() != chunks.len() {
            return Err(ChatError::IndexBuild(format!(
                "embedding count {} doesn't match chunk count {}",
                embeddings.len(),
                chunks.len()
            )));
        }

        let dimensions = embeddings[0].len();
        if dimensions == 0 || embeddings.iter().any(|vector| vector.len() != dimensions) {
            return Err(ChatError::IndexBuild(
                "embeddings have inconsistent dimensions".to_string(),
            ));
        }

        info!(chunk_count = chunks.len(), dimensions, "vector index built");

        Ok(Self {
            chunks,
            embeddings,
            embedder,
        })
    }
}

#[async_trait]
impl Retriever for InMemoryVectorIndex {
    async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<RetrievedChunk>, ChatError> {
        let query_vector = self
            .embedder
            .embed_query(query)
            .await
            .map_err(|error| ChatError::Model(format!("query embedding failed: {error}")))?;

        let mut scored = self
            .chunks
            .iter()
            .zip(&self.embeddings)
            .map(|(chunk, embedding)| RetrievedChunk {
                chunk: chunk.clone(),
                score: cosine_similarity(&query_vector, embedding),
            })
            .collect::<Vec<_>>();

        scored.sort_by(|left, right| {
            right
                .score
                .total_cmp(&left.score)
                .then(left.chunk.chunk_index.cmp(&right.chunk.chunk_index))
        });
        scored.truncate(top_k);

        Ok(scored)
    }

    fn chunk_count(&self) -> usize {
        self.chunks.len()
    }
}

fn cosine_similarity(left: &[f32], right: &[f32]) -> f32 {
    if left.len() != right.len() {
        return 0.0;
    }

    let dot = left.iter().zip(right).map(|(a, b)| a * b).sum::<f32>();
    let left_norm = left.iter().map(|value| value * value).sum::<f32>().sqrt();
    let right_norm = right.iter().map(|value| value * value).sum::<f32>().sqrt();

    if left_norm == 0.0 || right_norm == 0.0 {
        0.0
    } else {
        dot / (left_norm * right_norm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::CharacterNgramEmbedder;
    use crate::ServiceError;

    struct FailingEmbedder;

    #[async_trait]
    impl Embedder for FailingEmbedder {
        async fn embed_documents(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, ServiceError> {
            Err(ServiceError::Request("service unavailable".to_string()))
        }
    }

    struct ShortEmbedder;

    #[async_trait]
    impl Embedder for ShortEmbedder {
        async fn embed_documents(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, ServiceError> {
            Ok(vec![vec![1.0, 0.0]])
        }
    }

    fn chunk(index: u64, text: &str) -> TextChunk {
        TextChunk {
            chunk_id: format!("chunk-{index}"),
            chunk_index: index,
            char_start: 0,
            text: text.to_string(),
        }
    }

    #[tokio::test]
    async fn retrieval_ranks_the_closest_chunk_first() {
        let index = InMemoryVectorIndex::build(
            vec![
                chunk(0, "Hydraulic pumps need regular pressure checks."),
                chunk(1, "Cats are mammals that purr."),
                chunk(2, "Invoices are due within thirty days."),
            ],
            Arc::new(CharacterNgramEmbedder::default()),
        )
        .await
        .expect("index should build");

        let hits = index.retrieve("Are cats mammals?", 2).await.expect("retrieval works");

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].chunk.chunk_index, 1);
        assert!(hits[0].score >= hits[1].score);
    }

    #[tokio::test]
    async fn empty_chunks_are_a_config_error() {
        let result =
            InMemoryVectorIndex::build(Vec::new(), Arc::new(CharacterNgramEmbedder::default()))
                .await;
        assert!(matches!(result, Err(ChatError::Config(_))));
    }

    #[tokio::test]
    async fn embedding_failure_is_an_index_build_error() {
        let result =
            InMemoryVectorIndex::build(vec![chunk(0, "text")], Arc::new(FailingEmbedder)).await;
        assert!(matches!(result, Err(ChatError::IndexBuild(_))));
    }

    #[tokio::test]
    async fn missing_vectors_are_an_index_build_error() {
        let result = InMemoryVectorIndex::build(
            vec![chunk(0, "one"), chunk(1, "two")],
            Arc::new(ShortEmbedder),
        )
        .await;
        assert!(matches!(result, Err(ChatError::IndexBuild(_))));
    }

    #[test]
    fn cosine_of_orthogonal_vectors_is_zero() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
        assert!((cosine_similarity(&[1.0, 1.0], &[2.0, 2.0]) - 1.0).abs() < 1e-6);
    }
}
