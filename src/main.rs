use docquery::api::{create_router, AppState};
use docquery::application::{DocumentService, QueryService, RagService, SessionController};
use docquery::domain::ports::{EmbeddingService, VectorStore};
use docquery::infrastructure::config::{EmbeddingProvider, LogFormat, VectorBackend};
use docquery::infrastructure::{
    AppConfig, FormatDispatcher, HashingEmbedding, InMemoryVectorStore, NvidiaLlm,
    QdrantVectorStore, TextEmbedding,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let app_config = AppConfig::load()?;
    let config = &app_config.config;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log.filter));
    let registry = tracing_subscriber::registry().with(filter);
    match config.log.format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }

    let embedding: Arc<dyn EmbeddingService> = match config.embedding.provider {
        EmbeddingProvider::Hashing => Arc::new(HashingEmbedding::from_config(&config.embedding)),
        EmbeddingProvider::Openai => Arc::new(TextEmbedding::from_config(&config.embedding)?),
    };
    let dimension = embedding.dimension();
    info!(provider = ?config.embedding.provider, dimension, "embedding ready");

    let store = &config.vector_store;
    let vector_store: Arc<dyn VectorStore> = match store.backend {
        VectorBackend::Memory => {
            Arc::new(InMemoryVectorStore::new(&store.collection, dimension))
        }
        VectorBackend::Qdrant => Arc::new(
            QdrantVectorStore::new(&store.url, &store.collection, dimension)?
                .with_search_ef(store.nprobe),
        ),
    };
    info!(backend = ?store.backend, collection = %store.collection, "vector store ready");

    let rag = RagService::new(
        embedding,
        vector_store,
        config.rag.chunk_size,
        config.rag.top_k,
    )?;
    let llm = NvidiaLlm::from_config(&config.llm)?;
    let documents = DocumentService::with_directory_config(
        Arc::new(FormatDispatcher::new()),
        config.directory.clone(),
    );
    let query = QueryService::new(Arc::new(llm), app_config.prompts.clone());
    let controller = SessionController::new(Arc::new(documents), Arc::new(rag), Arc::new(query))
        .with_retrieval_fallback(config.rag.retrieval_only_without_llm);

    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);
    let state = AppState::new(controller, app_config);
    let app = create_router(state);

    info!("docquery listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
