use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use uuid::Uuid;

use crate::domain::errors::DomainError;

/// File extensions accepted for upload, lowercase and without the dot.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["pdf", "xlsx", "xls", "csv", "pptx", "ppt"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SheetKind {
    Csv,
    Excel,
}

/// The closed set of formats the extractors understand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "sheet", rename_all = "snake_case")]
pub enum DocumentFormat {
    Pdf,
    Spreadsheet(SheetKind),
    SlideDeck,
}

impl DocumentFormat {
    /// Resolves an extension such as `".PDF"` or `"csv"`.
    ///
    /// The error carries the extension exactly as given.
    pub fn from_extension(extension: &str) -> Result<Self, DomainError> {
        let normalized = extension.trim_start_matches('.').to_ascii_lowercase();
        match normalized.as_str() {
            "pdf" => Ok(Self::Pdf),
            "csv" => Ok(Self::Spreadsheet(SheetKind::Csv)),
            "xlsx" | "xls" => Ok(Self::Spreadsheet(SheetKind::Excel)),
            "pptx" | "ppt" => Ok(Self::SlideDeck),
            _ => Err(DomainError::unsupported(extension)),
        }
    }

    /// Resolves the format from a file name's extension.
    pub fn from_file_name(name: &str) -> Result<Self, DomainError> {
        let extension = Path::new(name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| format!(".{ext}"))
            .unwrap_or_default();
        Self::from_extension(&extension)
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Spreadsheet(SheetKind::Csv) => "text/csv",
            Self::Spreadsheet(SheetKind::Excel) => "application/vnd.ms-excel",
            Self::SlideDeck => "application/vnd.ms-powerpoint",
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pdf => write!(f, "pdf"),
            Self::Spreadsheet(SheetKind::Csv) => write!(f, "csv"),
            Self::Spreadsheet(SheetKind::Excel) => write!(f, "excel"),
            Self::SlideDeck => write!(f, "slides"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub name: String,
    pub format: DocumentFormat,
    pub text: String,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl Document {
    pub fn new(name: impl Into<String>, format: DocumentFormat, text: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: Uuid::new_v4(),
            metadata: serde_json::json!({
                "source": name,
                "type": format.content_type(),
            }),
            name,
            format,
            text: text.into(),
            created_at: Utc::now(),
        }
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub id: Uuid,
    pub document_id: Uuid,
    pub content: String,
    pub chunk_index: usize,
    pub metadata: ChunkMetadata,
}

impl DocumentChunk {
    pub fn new(document_id: Uuid, content: impl Into<String>, chunk_index: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            document_id,
            content: content.into(),
            chunk_index,
            metadata: ChunkMetadata::default(),
        }
    }

    pub fn with_metadata(mut self, metadata: ChunkMetadata) -> Self {
        self.metadata = metadata;
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub source: Option<String>,
    pub page: Option<usize>,
    pub section: Option<String>,
}

/// Splits a document into chunks by paragraph boundaries, tagged with its name.
pub fn chunk_document(doc: &Document, chunk_size: usize) -> Vec<DocumentChunk> {
    chunk_content(doc.id, &doc.text, chunk_size)
        .into_iter()
        .map(|chunk| {
            chunk.with_metadata(ChunkMetadata {
                source: Some(doc.name.clone()),
                ..Default::default()
            })
        })
        .collect()
}

/// Splits content into chunks by paragraph boundaries.
///
/// Paragraphs are joined until they exceed `chunk_size`, then a new chunk starts.
/// A paragraph longer than `chunk_size` is broken on line boundaries, and a
/// single over-long line on character boundaries.
/// Each chunk is assigned a sequential index starting from 0.
pub fn chunk_content(document_id: Uuid, content: &str, chunk_size: usize) -> Vec<DocumentChunk> {
    let chunk_size = chunk_size.max(1);
    let pieces: Vec<String> = content
        .split("\n\n")
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .flat_map(|paragraph| split_oversized(paragraph, chunk_size))
        .collect();

    let mut chunks = Vec::new();
    let mut current_chunk = String::new();
    let mut chunk_index = 0;

    for piece in pieces {
        let would_exceed =
            !current_chunk.is_empty() && current_chunk.len() + piece.len() + 2 > chunk_size;

        if would_exceed {
            chunks.push(DocumentChunk::new(document_id, &current_chunk, chunk_index));
            current_chunk.clear();
            chunk_index += 1;
        }

        if !current_chunk.is_empty() {
            current_chunk.push_str("\n\n");
        }
        current_chunk.push_str(&piece);
    }

    if !current_chunk.is_empty() {
        chunks.push(DocumentChunk::new(document_id, current_chunk, chunk_index));
    }

    chunks
}

fn split_oversized(paragraph: &str, chunk_size: usize) -> Vec<String> {
    if paragraph.len() <= chunk_size {
        return vec![paragraph.to_string()];
    }

    let mut pieces = Vec::new();
    let mut current = String::new();
    for line in paragraph.lines() {
        for part in split_line(line, chunk_size) {
            if !current.is_empty() && current.len() + part.len() + 1 > chunk_size {
                pieces.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push('\n');
            }
            current.push_str(part);
        }
    }
    if !current.trim().is_empty() {
        pieces.push(current);
    }
    pieces
}

fn split_line(line: &str, chunk_size: usize) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut rest = line;
    while rest.len() > chunk_size {
        let mut cut = chunk_size;
        while !rest.is_char_boundary(cut) {
            cut -= 1;
        }
        if cut == 0 {
            cut = rest.chars().next().map_or(rest.len(), char::len_utf8);
        }
        let (head, tail) = rest.split_at(cut);
        parts.push(head);
        rest = tail;
    }
    parts.push(rest);
    parts
}
