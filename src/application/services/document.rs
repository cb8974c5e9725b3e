use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use walkdir::WalkDir;

use crate::domain::{ports::TextExtractor, Document, DocumentFormat, DomainError};
use crate::infrastructure::config::DirectoryConfig;

/// A file the directory walk passed over.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedFile {
    pub path: String,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct DirectoryScan {
    pub documents: Vec<Document>,
    pub skipped: Vec<SkippedFile>,
}

/// File intake: uploaded bytes or a server-side directory in, documents out.
pub struct DocumentService {
    extractor: Arc<dyn TextExtractor>,
    directory: DirectoryConfig,
}

impl DocumentService {
    pub fn new(extractor: Arc<dyn TextExtractor>) -> Self {
        Self {
            extractor,
            directory: DirectoryConfig::default(),
        }
    }

    pub fn with_directory_config(extractor: Arc<dyn TextExtractor>, directory: DirectoryConfig) -> Self {
        Self { extractor, directory }
    }

    /// Extracts one uploaded file on a blocking thread.
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub async fn extract_upload(&self, name: &str, bytes: Vec<u8>) -> Result<Document, DomainError> {
        let extractor = self.extractor.clone();
        let file_name = name.to_string();

        let doc = tokio::task::spawn_blocking(move || extractor.extract(&file_name, &bytes))
            .await
            .map_err(|e| DomainError::extraction(name, format!("extraction task failed: {e}")))??;

        info!(document_id = %doc.id, format = %doc.format, chars = doc.text.len(), "document extracted");
        if doc.is_empty() {
            warn!(name = %doc.name, "document contains no text");
        }
        Ok(doc)
    }

    /// Lists the files a directory submission would process, in name order.
    ///
    /// Fails with `InvalidDirectory` before touching any file when `path` is
    /// missing, not a directory, or outside the configured root.
    pub fn list_files(&self, path: &Path) -> Result<Vec<PathBuf>, DomainError> {
        if !path.is_dir() {
            return Err(DomainError::invalid_directory(path.display().to_string()));
        }
        self.check_root(path)?;

        let max_depth = if self.directory.recursive { usize::MAX } else { 1 };
        let include_hidden = self.directory.include_hidden;

        let mut files = Vec::new();
        let walker = WalkDir::new(path)
            .follow_links(false)
            .max_depth(max_depth)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                include_hidden || e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.')
            });

        for entry in walker {
            let entry = entry.map_err(|e| DomainError::invalid_directory(e.to_string()))?;
            if entry.file_type().is_file() {
                files.push(entry.into_path());
            }
        }
        Ok(files)
    }

    fn check_root(&self, path: &Path) -> Result<(), DomainError> {
        let Some(root) = &self.directory.root else {
            return Ok(());
        };
        let outside = || {
            DomainError::invalid_directory(format!(
                "{} is outside the allowed root {}",
                path.display(),
                root.display()
            ))
        };
        let root = root.canonicalize().map_err(|_| outside())?;
        let target = path.canonicalize().map_err(|_| outside())?;
        if !target.starts_with(&root) {
            return Err(outside());
        }
        Ok(())
    }

    /// Extracts every selected file under `path`.
    ///
    /// Unsupported files are skipped or rejected per configuration; an
    /// extraction failure aborts the whole scan.
    #[instrument(skip(self), fields(path = %path.display()))]
    pub async fn extract_directory(&self, path: &Path) -> Result<DirectoryScan, DomainError> {
        let files = self.list_files(path)?;
        debug!(files = files.len(), "directory listed");

        let mut scan = DirectoryScan::default();
        for file in files {
            let relative = file
                .strip_prefix(path)
                .unwrap_or(&file)
                .to_string_lossy()
                .into_owned();

            if let Err(err) = DocumentFormat::from_file_name(&relative) {
                if self.directory.skip_unsupported {
                    debug!(file = %relative, "skipping unsupported file");
                    scan.skipped.push(SkippedFile {
                        path: relative,
                        reason: err.to_string(),
                    });
                    continue;
                }
                return Err(err);
            }

            let bytes = tokio::fs::read(&file)
                .await
                .map_err(|e| DomainError::extraction(&relative, e))?;
            scan.documents.push(self.extract_upload(&relative, bytes).await?);
        }

        if !scan.skipped.is_empty() {
            warn!(skipped = scan.skipped.len(), "some files were not processed");
        }
        Ok(scan)
    }
}
