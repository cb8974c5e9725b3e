//! Question answering over uploaded documents.
//!
//! Text is extracted from PDFs, spreadsheets and slide decks, then either
//! sent whole to a chat-completion model or chunked into a vector index and
//! retrieved per question.

pub mod api;
pub mod application;
pub mod domain;
pub mod infrastructure;
