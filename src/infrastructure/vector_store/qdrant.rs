use async_trait::async_trait;
use qdrant_client::qdrant::{
    point_id::PointIdOptions, CreateCollectionBuilder, Distance, PointStruct, ScoredPoint,
    SearchParamsBuilder, SearchPointsBuilder, UpsertPointsBuilder, VectorParamsBuilder,
};
use qdrant_client::{Payload, Qdrant};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

use crate::domain::{
    ports::{check_dimension, VectorStore},
    CollectionRecord, DomainError, Embedding, SearchHit,
};

/// Qdrant collection with Euclid distance; the point score is the L2 distance.
pub struct QdrantVectorStore {
    client: Qdrant,
    collection: String,
    dimension: usize,
    search_ef: u64,
    loaded: AtomicBool,
}

impl QdrantVectorStore {
    pub fn new(url: &str, collection: &str, dimension: usize) -> Result<Self, DomainError> {
        let client = Qdrant::from_url(url)
            .build()
            .map_err(|e| DomainError::remote(e.to_string()))?;

        Ok(Self {
            client,
            collection: collection.to_string(),
            dimension,
            search_ef: 10,
            loaded: AtomicBool::new(false),
        })
    }

    /// Search breadth handed to the HNSW index.
    pub fn with_search_ef(mut self, search_ef: u64) -> Self {
        self.search_ef = search_ef;
        self
    }

    fn point_id(point: &ScoredPoint) -> Option<u64> {
        match point.id.as_ref()?.point_id_options.as_ref()? {
            PointIdOptions::Num(id) => Some(*id),
            PointIdOptions::Uuid(_) => None,
        }
    }
}

#[async_trait]
impl VectorStore for QdrantVectorStore {
    fn collection(&self) -> &str {
        &self.collection
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn exists(&self) -> Result<bool, DomainError> {
        self.client
            .collection_exists(&self.collection)
            .await
            .map_err(|e| DomainError::remote(e.to_string()))
    }

    async fn drop_collection(&self) -> Result<(), DomainError> {
        self.loaded.store(false, Ordering::SeqCst);
        self.client
            .delete_collection(&self.collection)
            .await
            .map_err(|e| DomainError::remote(e.to_string()))?;
        debug!(collection = %self.collection, "collection dropped");
        Ok(())
    }

    async fn create(&self) -> Result<(), DomainError> {
        self.loaded.store(false, Ordering::SeqCst);
        self.client
            .create_collection(
                CreateCollectionBuilder::new(&self.collection).vectors_config(
                    VectorParamsBuilder::new(self.dimension as u64, Distance::Euclid),
                ),
            )
            .await
            .map_err(|e| DomainError::remote(e.to_string()))?;
        debug!(collection = %self.collection, dimension = self.dimension, "collection created");
        Ok(())
    }

    async fn insert(&self, records: &[CollectionRecord]) -> Result<(), DomainError> {
        if records.is_empty() {
            return Ok(());
        }
        for record in records {
            check_dimension(self.dimension, &record.vector)?;
        }

        let points: Vec<PointStruct> = records
            .iter()
            .map(|r| PointStruct::new(r.id, r.vector.as_slice().to_vec(), Payload::new()))
            .collect();

        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection, points).wait(true))
            .await
            .map_err(|e| DomainError::remote(e.to_string()))?;

        Ok(())
    }

    async fn load(&self) -> Result<(), DomainError> {
        // Qdrant serves a collection as soon as it exists; confirm it does.
        self.client
            .collection_info(&self.collection)
            .await
            .map_err(|e| DomainError::remote(e.to_string()))?;
        self.loaded.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn search(
        &self,
        query: &Embedding,
        top_k: usize,
    ) -> Result<Vec<SearchHit>, DomainError> {
        check_dimension(self.dimension, query)?;
        if !self.loaded.load(Ordering::SeqCst) {
            return Err(DomainError::CollectionNotLoaded(self.collection.clone()));
        }
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let results = self
            .client
            .search_points(
                SearchPointsBuilder::new(&self.collection, query.as_slice().to_vec(), top_k as u64)
                    .params(SearchParamsBuilder::default().hnsw_ef(self.search_ef)),
            )
            .await
            .map_err(|e| DomainError::remote(e.to_string()))?;

        let mut hits: Vec<SearchHit> = results
            .result
            .iter()
            .filter_map(|point| {
                Some(SearchHit {
                    id: Self::point_id(point)?,
                    distance: point.score,
                })
            })
            .collect();
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));

        Ok(hits)
    }
}
