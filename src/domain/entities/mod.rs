mod conversation;
mod document;
mod embedding;

pub use conversation::{Conversation, Message, MessageRole};
pub use document::{
    chunk_content, chunk_document, ChunkMetadata, Document, DocumentChunk, DocumentFormat,
    SheetKind, SUPPORTED_EXTENSIONS,
};
pub use embedding::{CollectionRecord, Embedding, SearchHit};
