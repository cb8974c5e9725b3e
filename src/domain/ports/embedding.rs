use crate::domain::{errors::DomainError, Embedding};
use async_trait::async_trait;

/// Text to fixed-length vectors. The same text under the same model always
/// maps to the same vector.
#[async_trait]
pub trait EmbeddingService: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Embedding, DomainError>;

    /// One vector per input, in input order.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>, DomainError>;

    /// Length of every vector this service returns.
    fn dimension(&self) -> usize;
}
