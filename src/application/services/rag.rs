use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument};

use crate::domain::{
    chunk_document,
    ports::{EmbeddingService, VectorStore},
    CollectionRecord, Document, DocumentChunk, DomainError, SearchHit,
};

#[derive(Debug, Clone, Serialize)]
pub struct IndexReport {
    pub collection: String,
    pub documents: usize,
    pub chunks: usize,
}

/// A search hit resolved to the chunk it was indexed from.
#[derive(Debug, Clone, Serialize)]
pub struct RetrievedPassage {
    pub id: u64,
    pub distance: f32,
    pub source: Option<String>,
    pub content: String,
}

impl RetrievedPassage {
    /// Pairs hits with `chunks[hit.id]`, dropping ids outside the slice.
    pub fn resolve(hits: &[SearchHit], chunks: &[DocumentChunk]) -> Vec<Self> {
        hits.iter()
            .filter_map(|hit| {
                let chunk = chunks.get(usize::try_from(hit.id).ok()?)?;
                Some(Self {
                    id: hit.id,
                    distance: hit.distance,
                    source: chunk.metadata.source.clone(),
                    content: chunk.content.clone(),
                })
            })
            .collect()
    }
}

/// Embedding, indexing and nearest-neighbour search over one collection.
pub struct RagService {
    embedding: Arc<dyn EmbeddingService>,
    vector_store: Arc<dyn VectorStore>,
    chunk_size: usize,
    default_top_k: usize,
}

impl RagService {
    /// Fails when the embedder and the collection disagree on dimension.
    pub fn new(
        embedding: Arc<dyn EmbeddingService>,
        vector_store: Arc<dyn VectorStore>,
        chunk_size: usize,
        default_top_k: usize,
    ) -> Result<Self, DomainError> {
        if embedding.dimension() != vector_store.dimension() {
            return Err(DomainError::DimensionMismatch {
                expected: vector_store.dimension(),
                actual: embedding.dimension(),
            });
        }
        Ok(Self {
            embedding,
            vector_store,
            chunk_size,
            default_top_k,
        })
    }

    pub fn default_top_k(&self) -> usize {
        self.default_top_k
    }

    /// Chunks every document in order; chunk `i` becomes record id `i`.
    pub fn chunk_documents(&self, documents: &[Document]) -> Vec<DocumentChunk> {
        documents
            .iter()
            .flat_map(|doc| chunk_document(doc, self.chunk_size))
            .collect()
    }

    /// Rebuilds the collection from `chunks`: embed, drop and create, insert
    /// ids `0..n`, load.
    #[instrument(skip(self, chunks), fields(count = chunks.len()))]
    pub async fn index_chunks(&self, chunks: &[DocumentChunk]) -> Result<(), DomainError> {
        let texts: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
        let embeddings = self.embedding.embed_batch(&texts).await?;
        if embeddings.len() != texts.len() {
            return Err(DomainError::remote(format!(
                "embedding returned {} vectors for {} texts",
                embeddings.len(),
                texts.len()
            )));
        }

        self.vector_store.recreate().await?;
        self.vector_store
            .insert(&CollectionRecord::sequential(embeddings))
            .await?;
        self.vector_store.load().await
    }

    #[instrument(skip(self, documents), fields(documents = documents.len()))]
    pub async fn index_documents(
        &self,
        documents: &[Document],
    ) -> Result<(Vec<DocumentChunk>, IndexReport), DomainError> {
        let chunks = self.chunk_documents(documents);
        self.index_chunks(&chunks).await?;

        let report = IndexReport {
            collection: self.vector_store.collection().to_string(),
            documents: documents.len(),
            chunks: chunks.len(),
        };
        info!(collection = %report.collection, chunks = report.chunks, "collection indexed");
        Ok((chunks, report))
    }

    #[instrument(skip(self))]
    pub async fn search(&self, query: &str, top_k: usize) -> Result<Vec<SearchHit>, DomainError> {
        let embedding = self.embedding.embed(query).await?;
        self.vector_store.search(&embedding, top_k).await
    }

    pub async fn search_default(&self, query: &str) -> Result<Vec<SearchHit>, DomainError> {
        self.search(query, self.default_top_k).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DocumentFormat;
    use crate::infrastructure::{HashingEmbedding, InMemoryVectorStore};
    use std::collections::HashSet;

    fn rag(store: Arc<InMemoryVectorStore>) -> RagService {
        RagService::new(Arc::new(HashingEmbedding::new(64)), store, 200, 5).unwrap()
    }

    fn doc(name: &str, text: &str) -> Document {
        Document::new(name, DocumentFormat::Pdf, text)
    }

    #[test]
    fn test_dimension_mismatch_is_rejected() {
        let store = Arc::new(InMemoryVectorStore::new("test", 32));
        let err = RagService::new(Arc::new(HashingEmbedding::new(64)), store, 200, 5)
            .err()
            .unwrap();
        assert!(matches!(
            err,
            DomainError::DimensionMismatch {
                expected: 32,
                actual: 64
            }
        ));
    }

    #[tokio::test]
    async fn test_index_then_search_covers_all_records() {
        let store = Arc::new(InMemoryVectorStore::new("test", 64));
        let rag = rag(store.clone());
        let docs = vec![
            doc("a.pdf", "Invoices are due in thirty days."),
            doc("b.pdf", "The hiking trail climbs two thousand metres.\n\nBring water."),
        ];

        let (chunks, report) = rag.index_documents(&docs).await.unwrap();
        assert_eq!(report.documents, 2);
        assert_eq!(report.chunks, chunks.len());
        assert_eq!(store.len(), chunks.len());

        let hits = rag.search("when are invoices due", 10).await.unwrap();
        assert_eq!(hits.len(), chunks.len());
        let ids: HashSet<u64> = hits.iter().map(|h| h.id).collect();
        assert_eq!(ids.len(), chunks.len());
        assert!(hits.windows(2).all(|w| w[0].distance <= w[1].distance));

        let passages = RetrievedPassage::resolve(&hits, &chunks);
        assert_eq!(passages[0].source.as_deref(), Some("a.pdf"));
    }

    #[tokio::test]
    async fn test_reindex_replaces_previous_collection() {
        let store = Arc::new(InMemoryVectorStore::new("test", 64));
        let rag = rag(store.clone());

        rag.index_documents(&[doc("a.pdf", "one\n\ntwo\n\nthree")])
            .await
            .unwrap();
        let (chunks, _) = rag.index_documents(&[doc("b.pdf", "four")]).await.unwrap();

        assert_eq!(chunks.len(), 1);
        assert_eq!(store.len(), 1);
        let hits = rag.search("anything", 10).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, 0);
    }

    #[tokio::test]
    async fn test_empty_documents_leave_empty_searchable_collection() {
        let store = Arc::new(InMemoryVectorStore::new("test", 64));
        let rag = rag(store);

        let (chunks, _) = rag.index_documents(&[doc("blank.pdf", "  ")]).await.unwrap();
        assert!(chunks.is_empty());
        assert!(rag.search_default("query").await.unwrap().is_empty());
    }

    #[test]
    fn test_resolve_drops_unknown_ids() {
        let chunks = vec![DocumentChunk::new(uuid::Uuid::new_v4(), "only", 0)];
        let hits = vec![
            SearchHit { id: 3, distance: 0.1 },
            SearchHit { id: 0, distance: 0.2 },
        ];
        let passages = RetrievedPassage::resolve(&hits, &chunks);
        assert_eq!(passages.len(), 1);
        assert_eq!(passages[0].content, "only");
    }
}
