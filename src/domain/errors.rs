use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to extract text from {name}: {reason}")]
    Extraction { name: String, reason: String },

    #[error("API key not found! Please set the {0} environment variable.")]
    MissingCredential(String),

    #[error("Remote service error: {0}")]
    RemoteService(String),

    #[error("Invalid directory: {0}")]
    InvalidDirectory(String),

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Collection is not loaded: {0}")]
    CollectionNotLoaded(String),

    #[error("No document loaded. Upload a file first.")]
    NoDocument,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn unsupported(extension: impl Into<String>) -> Self {
        Self::UnsupportedFormat(extension.into())
    }

    pub fn extraction(name: impl Into<String>, reason: impl ToString) -> Self {
        Self::Extraction {
            name: name.into(),
            reason: reason.to_string(),
        }
    }

    pub fn missing_credential(variable: impl Into<String>) -> Self {
        Self::MissingCredential(variable.into())
    }

    pub fn remote(msg: impl Into<String>) -> Self {
        Self::RemoteService(msg.into())
    }

    pub fn invalid_directory(path: impl Into<String>) -> Self {
        Self::InvalidDirectory(path.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Stable machine-readable name, used by the API error body.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnsupportedFormat(_) => "unsupported_format",
            Self::Extraction { .. } => "extraction_failure",
            Self::MissingCredential(_) => "missing_credential",
            Self::RemoteService(_) => "remote_service_failure",
            Self::InvalidDirectory(_) => "invalid_directory",
            Self::DimensionMismatch { .. } => "dimension_mismatch",
            Self::CollectionNotLoaded(_) => "collection_not_loaded",
            Self::NoDocument => "no_document",
            Self::NotFound(_) => "not_found",
            Self::Validation(_) => "validation",
            Self::Internal(_) => "internal",
        }
    }
}

pub type Result<T> = std::result::Result<T, DomainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_keeps_extension() {
        let err = DomainError::unsupported(".DOCX");
        assert!(matches!(&err, DomainError::UnsupportedFormat(ext) if ext == ".DOCX"));
        assert_eq!(err.kind(), "unsupported_format");
        assert_eq!(err.to_string(), "Unsupported file format: .DOCX");
    }

    #[test]
    fn test_missing_credential_message_names_variable() {
        let err = DomainError::missing_credential("NVIDIA_API_KEY");
        assert!(err.to_string().contains("NVIDIA_API_KEY"));
    }
}
