//! Per-session state.
//!
//! Each session is locked for the whole of an action, which serializes one
//! user's uploads and questions while separate sessions proceed in parallel.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::domain::{Conversation, Document, DocumentChunk, DomainError};

mod controller;

pub use controller::{ChatTurn, IntakeReport, SessionController, SessionView};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    FileProcessing,
    Ready,
    Querying,
}

/// How uploaded documents are queried.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Flow {
    /// Full text goes straight into the LLM prompt.
    #[default]
    Direct,
    /// Chunks are embedded and retrieved per question.
    Chat,
}

#[derive(Debug)]
pub struct Session {
    pub id: Uuid,
    pub state: SessionState,
    pub flow: Flow,
    pub documents: Vec<Document>,
    /// Indexed chunks; position equals record id in the collection.
    pub chunks: Vec<DocumentChunk>,
    pub conversation: Conversation,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            state: SessionState::Idle,
            flow: Flow::Direct,
            documents: Vec::new(),
            chunks: Vec::new(),
            conversation: Conversation::new(),
            created_at: Utc::now(),
        }
    }

    pub fn has_documents(&self) -> bool {
        !self.documents.is_empty()
    }

    pub fn begin_processing(&mut self) {
        self.state = SessionState::FileProcessing;
    }

    /// Replaces the loaded documents after a successful intake.
    pub fn finish_processing(&mut self, flow: Flow, documents: Vec<Document>, chunks: Vec<DocumentChunk>) {
        self.flow = flow;
        self.documents = documents;
        self.chunks = chunks;
        self.state = SessionState::Ready;
    }

    /// Leaves earlier documents untouched after a failed intake.
    pub fn abort_processing(&mut self) {
        self.state = self.resting_state();
    }

    pub fn begin_query(&mut self) -> Result<(), DomainError> {
        if !self.has_documents() {
            return Err(DomainError::NoDocument);
        }
        self.state = SessionState::Querying;
        Ok(())
    }

    pub fn finish_query(&mut self) {
        self.state = self.resting_state();
    }

    /// Drops documents and history; the shared collection is left alone.
    pub fn reset(&mut self) {
        self.documents.clear();
        self.chunks.clear();
        self.conversation.clear();
        self.flow = Flow::Direct;
        self.state = SessionState::Idle;
    }

    /// Text of all documents, in upload order.
    pub fn combined_text(&self) -> String {
        self.documents
            .iter()
            .map(|d| d.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    fn resting_state(&self) -> SessionState {
        if self.has_documents() {
            SessionState::Ready
        } else {
            SessionState::Idle
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

pub type SessionHandle = Arc<Mutex<Session>>;

#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<Uuid, SessionHandle>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self) -> Result<Uuid, DomainError> {
        let session = Session::new();
        let id = session.id;
        self.sessions
            .write()
            .map_err(|e| DomainError::internal(e.to_string()))?
            .insert(id, Arc::new(Mutex::new(session)));
        Ok(id)
    }

    pub fn get(&self, id: Uuid) -> Result<SessionHandle, DomainError> {
        self.sessions
            .read()
            .map_err(|e| DomainError::internal(e.to_string()))?
            .get(&id)
            .cloned()
            .ok_or_else(|| DomainError::not_found(format!("session {id}")))
    }

    pub fn remove(&self, id: Uuid) -> Result<(), DomainError> {
        self.sessions
            .write()
            .map_err(|e| DomainError::internal(e.to_string()))?
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| DomainError::not_found(format!("session {id}")))
    }

    pub fn len(&self) -> usize {
        self.sessions.read().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
