pub mod config;
pub mod embedding;
pub mod extract;
pub mod llm;
pub mod vector_store;

pub use config::{AppConfig, Config, PromptsConfig};
pub use embedding::{HashingEmbedding, TextEmbedding};
pub use extract::FormatDispatcher;
pub use llm::NvidiaLlm;
pub use vector_store::{InMemoryVectorStore, QdrantVectorStore};
