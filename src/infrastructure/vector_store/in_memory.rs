use async_trait::async_trait;
use std::cmp::Ordering;
use std::sync::RwLock;

use crate::domain::{
    ports::{check_dimension, VectorStore},
    CollectionRecord, DomainError, Embedding, SearchHit,
};

#[derive(Default)]
struct MemoryCollection {
    records: Vec<CollectionRecord>,
    loaded: bool,
}

/// Process-local collection with exact L2 search.
pub struct InMemoryVectorStore {
    collection: String,
    dimension: usize,
    state: RwLock<Option<MemoryCollection>>,
}

impl InMemoryVectorStore {
    pub fn new(collection: impl Into<String>, dimension: usize) -> Self {
        Self {
            collection: collection.into(),
            dimension,
            state: RwLock::new(None),
        }
    }

    pub fn len(&self) -> usize {
        self.state
            .read()
            .map(|s| s.as_ref().map_or(0, |c| c.records.len()))
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn missing(&self) -> DomainError {
        DomainError::not_found(format!("collection {}", self.collection))
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    fn collection(&self) -> &str {
        &self.collection
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn exists(&self) -> Result<bool, DomainError> {
        let state = self
            .state
            .read()
            .map_err(|e| DomainError::internal(e.to_string()))?;
        Ok(state.is_some())
    }

    async fn drop_collection(&self) -> Result<(), DomainError> {
        let mut state = self
            .state
            .write()
            .map_err(|e| DomainError::internal(e.to_string()))?;
        *state = None;
        Ok(())
    }

    async fn create(&self) -> Result<(), DomainError> {
        let mut state = self
            .state
            .write()
            .map_err(|e| DomainError::internal(e.to_string()))?;
        if state.is_some() {
            return Err(DomainError::validation(format!(
                "collection {} already exists",
                self.collection
            )));
        }
        *state = Some(MemoryCollection::default());
        Ok(())
    }

    async fn insert(&self, records: &[CollectionRecord]) -> Result<(), DomainError> {
        for record in records {
            check_dimension(self.dimension, &record.vector)?;
        }

        let mut state = self
            .state
            .write()
            .map_err(|e| DomainError::internal(e.to_string()))?;
        let collection = state.as_mut().ok_or_else(|| self.missing())?;
        collection.records.extend_from_slice(records);
        Ok(())
    }

    async fn load(&self) -> Result<(), DomainError> {
        let mut state = self
            .state
            .write()
            .map_err(|e| DomainError::internal(e.to_string()))?;
        let collection = state.as_mut().ok_or_else(|| self.missing())?;
        collection.loaded = true;
        Ok(())
    }

    async fn search(
        &self,
        query: &Embedding,
        top_k: usize,
    ) -> Result<Vec<SearchHit>, DomainError> {
        check_dimension(self.dimension, query)?;

        let state = self
            .state
            .read()
            .map_err(|e| DomainError::internal(e.to_string()))?;
        let collection = state.as_ref().ok_or_else(|| self.missing())?;
        if !collection.loaded {
            return Err(DomainError::CollectionNotLoaded(self.collection.clone()));
        }

        let mut hits: Vec<SearchHit> = collection
            .records
            .iter()
            .map(|record| SearchHit {
                id: record.id,
                distance: query.l2_distance(&record.vector),
            })
            .collect();

        hits.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(Ordering::Equal)
                .then(a.id.cmp(&b.id))
        });
        hits.truncate(top_k);

        Ok(hits)
    }
}
