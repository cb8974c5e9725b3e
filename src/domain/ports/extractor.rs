use crate::domain::{errors::DomainError, Document};

/// Turns a raw uploaded file into a [`Document`].
///
/// Extraction is CPU-bound and synchronous; async callers should run it on a
/// blocking thread.
pub trait TextExtractor: Send + Sync {
    fn extract(&self, name: &str, bytes: &[u8]) -> Result<Document, DomainError>;
}
