pub mod document;
pub mod query;
pub mod rag;

pub use document::{DirectoryScan, DocumentService, SkippedFile};
pub use query::QueryService;
pub use rag::{IndexReport, RagService, RetrievedPassage};
