use crate::chunking::{split_text, ChunkingConfig};
use crate::conversation::{ConversationChain, ConversationOptions};
use crate::embeddings::Embedder;
use crate::extractor::{extract_raw_text, PdfExtractor};
use crate::index::InMemoryVectorIndex;
use crate::traits::LanguageModel;
use crate::{ChatError, UploadedDocument};
use std::sync::Arc;
use tracing::info;

/// Turns an upload batch into a ready conversation:
/// extract, chunk, embed and index, then bind the language model.
pub struct DocumentPipeline {
    extractor: Arc<dyn PdfExtractor>,
    embedder: Arc<dyn Embedder>,
    model: Arc<dyn LanguageModel>,
    chunking: ChunkingConfig,
    conversation: ConversationOptions,
}

impl DocumentPipeline {
    pub fn new(
        extractor: Arc<dyn PdfExtractor>,
        embedder: Arc<dyn Embedder>,
        model: Arc<dyn LanguageModel>,
    ) -> Self {
        Self {
            extractor,
            embedder,
            model,
            chunking: ChunkingConfig::default(),
            conversation: ConversationOptions::default(),
        }
    }

    pub fn with_chunking(mut self, chunking: ChunkingConfig) -> Self {
        self.chunking = chunking;
        self
    }

    pub fn with_conversation_options(mut self, options: ConversationOptions) -> Self {
        self.conversation = options;
        self
    }

    pub async fn build_conversation(
        &self,
        documents: &[UploadedDocument],
    ) -> Result<ConversationChain, ChatError> {
        let extractor = self.extractor.clone();
        let batch = documents.to_vec();
        // lopdf parsing is CPU-bound
        let raw_text = tokio::task::spawn_blocking(move || {
            extract_raw_text(extractor.as_ref(), &batch)
        })
        .await
        .map_err(|error| ChatError::Parse(format!("pdf extraction task failed: {error}")))??;
        let chunks = split_text(&raw_text, &self.chunking)?;
        info!(
            documents = documents.len(),
            raw_chars = raw_text.chars().count(),
            chunk_count = chunks.len(),
            "upload batch chunked"
        );

        let index = InMemoryVectorIndex::build(chunks, self.embedder.clone()).await?;

        Ok(ConversationChain::new(
            Box::new(index),
            self.model.clone(),
            self.conversation,
        ))
    }
}
