use async_trait::async_trait;
use rig::client::{EmbeddingsClient, ProviderClient};
use rig::embeddings::EmbeddingsBuilder;
use rig::providers::openai;

use crate::domain::{ports::EmbeddingService, DomainError, Embedding};
use crate::infrastructure::config::EmbeddingConfig;

const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Remote embeddings through an OpenAI-compatible endpoint.
pub struct TextEmbedding {
    model: String,
    dimension: usize,
}

/// Output size of the OpenAI embedding models this client knows.
pub fn native_dimension(model: &str) -> Option<usize> {
    match model {
        "text-embedding-3-small" | "text-embedding-ada-002" => Some(1536),
        "text-embedding-3-large" => Some(3072),
        _ => None,
    }
}

impl TextEmbedding {
    pub fn new() -> Self {
        Self {
            model: "text-embedding-3-small".to_string(),
            dimension: 1536,
        }
    }

    /// Resolves the dimension from the model when it is not configured.
    ///
    /// A configured dimension that disagrees with a known model is rejected
    /// here instead of on the first indexing call.
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self, DomainError> {
        let native = native_dimension(&config.model);
        let dimension = match (config.dimension, native) {
            (Some(configured), Some(native)) if configured != native => {
                return Err(DomainError::validation(format!(
                    "embedding model {} produces {native}-dimensional vectors, \
                     but embedding.dimension is {configured}",
                    config.model
                )));
            }
            (Some(configured), _) => configured,
            (None, Some(native)) => native,
            (None, None) => {
                return Err(DomainError::validation(format!(
                    "embedding.dimension must be set for model {}",
                    config.model
                )));
            }
        };

        Ok(Self {
            model: config.model.clone(),
            dimension,
        })
    }

    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = dimension;
        self
    }

    fn client(&self) -> Result<openai::Client, DomainError> {
        // from_env panics without a key
        if std::env::var(API_KEY_ENV).map_or(true, |key| key.trim().is_empty()) {
            return Err(DomainError::missing_credential(API_KEY_ENV));
        }
        Ok(openai::Client::from_env())
    }

    fn to_embedding(&self, vec: Vec<f64>) -> Result<Embedding, DomainError> {
        if vec.len() != self.dimension {
            return Err(DomainError::DimensionMismatch {
                expected: self.dimension,
                actual: vec.len(),
            });
        }
        Ok(Embedding::new(vec.into_iter().map(|x| x as f32).collect()))
    }
}

impl Default for TextEmbedding {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingService for TextEmbedding {
    async fn embed(&self, text: &str) -> Result<Embedding, DomainError> {
        self.embed_batch(&[text])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DomainError::internal("No embedding returned"))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>, DomainError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let model = self
            .client()?
            .embedding_model_with_ndims(&self.model, self.dimension);

        let mut builder = EmbeddingsBuilder::new(model);
        for text in texts {
            builder = builder
                .document(text.to_string())
                .map_err(|e| DomainError::remote(e.to_string()))?;
        }

        let embeddings = builder
            .build()
            .await
            .map_err(|e| DomainError::remote(e.to_string()))?;

        embeddings
            .into_iter()
            .map(|(_doc, emb)| self.to_embedding(emb.first().vec))
            .collect()
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_batch_needs_no_client() {
        let embedder = TextEmbedding::new().with_dimension(8);
        assert!(embedder.embed_batch(&[]).await.unwrap().is_empty());
        assert_eq!(embedder.dimension(), 8);
    }

    #[test]
    fn test_wrong_dimension_is_rejected() {
        let embedder = TextEmbedding::new().with_dimension(3);
        let err = embedder.to_embedding(vec![0.1, 0.2]).unwrap_err();
        assert!(matches!(
            err,
            DomainError::DimensionMismatch {
                expected: 3,
                actual: 2
            }
        ));
        assert_eq!(embedder.to_embedding(vec![0.1, 0.2, 0.3]).unwrap().dimension(), 3);
    }

    fn config(model: &str, dimension: Option<usize>) -> EmbeddingConfig {
        EmbeddingConfig {
            model: model.to_string(),
            dimension,
            ..Default::default()
        }
    }

    #[test]
    fn test_dimension_follows_known_model() {
        let embedder = TextEmbedding::from_config(&config("text-embedding-3-small", None)).unwrap();
        assert_eq!(embedder.dimension(), 1536);

        let embedder = TextEmbedding::from_config(&config("text-embedding-3-large", Some(3072))).unwrap();
        assert_eq!(embedder.dimension(), 3072);
    }

    #[test]
    fn test_conflicting_dimension_fails_at_startup() {
        let err = TextEmbedding::from_config(&config("text-embedding-3-small", Some(768)))
            .err()
            .unwrap();
        assert!(matches!(err, DomainError::Validation(ref m) if m.contains("1536")));
    }

    #[test]
    fn test_unknown_model_needs_dimension() {
        assert!(TextEmbedding::from_config(&config("my-embedder", None)).is_err());
        let embedder = TextEmbedding::from_config(&config("my-embedder", Some(384))).unwrap();
        assert_eq!(embedder.dimension(), 384);
    }

    #[test]
    fn test_default_config_resolves() {
        let embedder = TextEmbedding::from_config(&EmbeddingConfig::default()).unwrap();
        assert_eq!(embedder.dimension(), 1536);
    }
}
