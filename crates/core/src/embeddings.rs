use crate::error::ServiceError;
use crate::hub::{HubClient, HubConfig};
use async_trait::async_trait;
use serde_json::{json, Value};

const DEFAULT: usize = 128;

pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = DEFAULT;
pub const DEFAULT_EMBEDDING_MODEL: &str = "hkunlp/instructor-xl";

#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ServiceError>;

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, ServiceError> {
        let mut vectors = self.embed_documents(&[text.to_string()]).await?;
        vectors.pop().ok_or_else(|| {
            ServiceError::Request("embedder returned no vector for the query".to_string())
        })
    }
}

/// Hashed character-trigram embedder. Runs locally and is deterministic.
#[derive(Debug, Clone, Copy)]
pub struct CharacterNgramEmbedder {
    pub dimensions: usize,
}

impl Default for CharacterNgramEmbedder {
    fn default() -> Self {
        Self {
            dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
        }
    }
}

impl CharacterNgramEmbedder {
    pub fn embed(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0f32; self.dimensions.max(1)];
        let lowered = text.to_lowercase();
        let chars: Vec<char> = lowered.chars().collect();

        if chars.is_empty() {
            return vector;
        }

        for window in chars.windows(3) {
            let token = window.iter().collect::<String>();
            let mut hash = 1469598103934665603u64;
            for byte in token.bytes() {
                hash ^= byte as u64;
                hash = hash.wrapping_mul(1099511628211);
            }
            let bucket = (hash % vector.len() as u64) as usize;
            vector[bucket] += 1.0;
        }

        let magnitude = vector.iter().map(|value| value * value).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for value in &mut vector {
                *value /= magnitude;
            }
        }

        vector
    }
}

#[async_trait]
impl Embedder for CharacterNgramEmbedder {
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ServiceError> {
        Ok(texts.iter().map(|text| self.embed(text)).collect())
    }
}

/// Calls the hosted feature-extraction pipeline for a sentence embedding model.
#[derive(Debug, Clone)]
pub struct HuggingFaceEmbedder {
    client: HubClient,
    model: String,
}

impl HuggingFaceEmbedder {
    pub fn new(config: &HubConfig, model: impl Into<String>) -> Result<Self, ServiceError> {
        Ok(Self {
            client: HubClient::new(config)?,
            model: model.into(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl Embedder for HuggingFaceEmbedder {
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ServiceError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let payload = self
            .client
            .post_json(
                &format!("pipeline/feature-extraction/{}", self.model),
                &json!({
                    "inputs": texts,
                    "options": { "wait_for_model": true },
                }),
            )
            .await?;

        parse_embeddings(&payload, texts.len())
    }
}

fn parse_embeddings(payload: &Value, expected: usize) -> Result<Vec<Vec<f32>>, ServiceError> {
    let rows = payload.as_array().ok_or_else(|| ServiceError::BackendResponse {
        backend: "feature-extraction".to_string(),
        details: "expected a list of embeddings".to_string(),
    })?;

    let vectors = rows
        .iter()
        .map(|row| {
            row.as_array()
                .and_then(|values| {
                    values
                        .iter()
                        .map(|value| value.as_f64().map(|number| number as f32))
                        .collect::<Option<Vec<_>>>()
                })
                .filter(|vector| !vector.is_empty())
                .ok_or_else(|| ServiceError::BackendResponse {
                    backend: "feature-extraction".to_string(),
                    details: "embedding row is not a flat list of numbers".to_string(),
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    if vectors.len() != expected {
        return Err(ServiceError::BackendResponse {
            backend: "feature-extraction".to_string(),
            details: format!("got {} embeddings for {} inputs", vectors.len(), expected),
        });
    }

    Ok(vectors)
}
