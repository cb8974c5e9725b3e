use crate::domain::{errors::DomainError, CollectionRecord, Embedding, SearchHit};
use async_trait::async_trait;

/// A single named collection of `(id, vector)` records ranked by L2 distance.
#[async_trait]
pub trait VectorStore: Send + Sync {
    fn collection(&self) -> &str;
    fn dimension(&self) -> usize;

    async fn exists(&self) -> Result<bool, DomainError>;
    async fn drop_collection(&self) -> Result<(), DomainError>;
    async fn create(&self) -> Result<(), DomainError>;
    async fn insert(&self, records: &[CollectionRecord]) -> Result<(), DomainError>;

    /// Makes the collection searchable. Searching before this is an error.
    async fn load(&self) -> Result<(), DomainError>;

    /// Up to `top_k` hits, nearest first.
    async fn search(&self, query: &Embedding, top_k: usize)
        -> Result<Vec<SearchHit>, DomainError>;

    /// Drops any existing collection of the same name and creates it empty.
    async fn recreate(&self) -> Result<(), DomainError> {
        if self.exists().await? {
            self.drop_collection().await?;
        }
        self.create().await
    }
}

/// Rejects vectors whose length differs from the collection's dimension.
pub fn check_dimension(expected: usize, vector: &Embedding) -> Result<(), DomainError> {
    if vector.dimension() != expected {
        return Err(DomainError::DimensionMismatch {
            expected,
            actual: vector.dimension(),
        });
    }
    Ok(())
}
