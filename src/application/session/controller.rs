use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, instrument};
use uuid::Uuid;

use super::{Flow, Session, SessionState, SessionStore};
use crate::application::services::{
    DocumentService, IndexReport, QueryService, RagService, RetrievedPassage, SkippedFile,
};
use crate::domain::{Document, DocumentChunk, DomainError, Message, MessageRole};

/// Read-only copy of a session for callers outside the lock.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub id: Uuid,
    pub state: SessionState,
    pub flow: Flow,
    pub documents: Vec<Document>,
    pub chunks: usize,
    pub history: Vec<Message>,
    pub created_at: DateTime<Utc>,
}

impl From<&Session> for SessionView {
    fn from(session: &Session) -> Self {
        Self {
            id: session.id,
            state: session.state,
            flow: session.flow,
            documents: session.documents.clone(),
            chunks: session.chunks.len(),
            history: session.conversation.messages.clone(),
            created_at: session.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct IntakeReport {
    pub flow: Flow,
    pub documents: Vec<Document>,
    pub skipped: Vec<SkippedFile>,
    pub index: Option<IndexReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatTurn {
    pub answer: String,
    pub passages: Vec<RetrievedPassage>,
    /// False when the answer lists passages because no LLM is configured.
    pub generated: bool,
}

/// Drives sessions through intake and questions.
pub struct SessionController {
    documents: Arc<DocumentService>,
    rag: Arc<RagService>,
    query: Arc<QueryService>,
    sessions: SessionStore,
    retrieval_fallback: bool,
}

impl SessionController {
    pub fn new(documents: Arc<DocumentService>, rag: Arc<RagService>, query: Arc<QueryService>) -> Self {
        Self {
            documents,
            rag,
            query,
            sessions: SessionStore::new(),
            retrieval_fallback: true,
        }
    }

    /// When disabled, chat without an LLM credential fails with
    /// `MissingCredential` like direct queries do.
    pub fn with_retrieval_fallback(mut self, enabled: bool) -> Self {
        self.retrieval_fallback = enabled;
        self
    }

    pub fn llm_configured(&self) -> bool {
        self.query.llm_configured()
    }

    pub fn create_session(&self) -> Result<Uuid, DomainError> {
        let id = self.sessions.create()?;
        info!(session_id = %id, "session created");
        Ok(id)
    }

    pub async fn snapshot(&self, id: Uuid) -> Result<SessionView, DomainError> {
        let handle = self.sessions.get(id)?;
        let session = handle.lock().await;
        Ok(SessionView::from(&*session))
    }

    pub fn remove(&self, id: Uuid) -> Result<(), DomainError> {
        self.sessions.remove(id)?;
        info!(session_id = %id, "session removed");
        Ok(())
    }

    /// Extracts uploaded files and loads them into the session.
    ///
    /// All files must extract; one failure leaves the session as it was.
    #[instrument(skip(self, files), fields(session_id = %id, files = files.len()))]
    pub async fn upload(
        &self,
        id: Uuid,
        files: Vec<(String, Vec<u8>)>,
        flow: Flow,
    ) -> Result<IntakeReport, DomainError> {
        if files.is_empty() {
            return Err(DomainError::validation("no files were uploaded"));
        }

        let handle = self.sessions.get(id)?;
        let mut session = handle.lock().await;
        session.begin_processing();

        let result = async {
            let mut documents = Vec::with_capacity(files.len());
            for (name, bytes) in files {
                documents.push(self.documents.extract_upload(&name, bytes).await?);
            }
            self.load(flow, documents, Vec::new()).await
        }
        .await;

        self.settle_intake(&mut session, flow, result)
    }

    /// Extracts every selected file under a server-side directory.
    #[instrument(skip(self), fields(session_id = %id, path = %path.display()))]
    pub async fn ingest_directory(
        &self,
        id: Uuid,
        path: &Path,
        flow: Flow,
    ) -> Result<IntakeReport, DomainError> {
        let handle = self.sessions.get(id)?;
        let mut session = handle.lock().await;
        session.begin_processing();

        let result = async {
            let scan = self.documents.extract_directory(path).await?;
            if scan.documents.is_empty() {
                return Err(DomainError::validation(format!(
                    "no supported files found in {}",
                    path.display()
                )));
            }
            self.load(flow, scan.documents, scan.skipped).await
        }
        .await;

        self.settle_intake(&mut session, flow, result)
    }

    /// Direct flow: the full text of every loaded document plus the question.
    #[instrument(skip(self, question), fields(session_id = %id))]
    pub async fn ask(&self, id: Uuid, question: &str) -> Result<String, DomainError> {
        let question = non_empty(question, "question")?;
        let handle = self.sessions.get(id)?;
        let mut session = handle.lock().await;
        session.begin_query()?;

        let result = self.query.ask_document(&session.combined_text(), question).await;
        if let Ok(answer) = &result {
            session.conversation.add_message(MessageRole::User, question);
            session.conversation.add_message(MessageRole::Assistant, answer.as_str());
        }
        session.finish_query();
        log_failure(result, "direct query failed")
    }

    /// Chat flow: retrieve passages, then answer with them and the history.
    #[instrument(skip(self, message), fields(session_id = %id))]
    pub async fn chat(&self, id: Uuid, message: &str) -> Result<ChatTurn, DomainError> {
        let message = non_empty(message, "message")?;
        let handle = self.sessions.get(id)?;
        let mut session = handle.lock().await;
        session.begin_query()?;

        let result = self.chat_turn(&session, message).await;
        if let Ok(turn) = &result {
            session.conversation.add_message(MessageRole::User, message);
            session.conversation.add_message(MessageRole::Assistant, turn.answer.as_str());
        }
        session.finish_query();
        log_failure(result, "chat turn failed")
    }

    /// Nearest passages for `query` without involving the LLM.
    #[instrument(skip(self, query), fields(session_id = %id))]
    pub async fn search(
        &self,
        id: Uuid,
        query: &str,
        k: Option<usize>,
    ) -> Result<Vec<RetrievedPassage>, DomainError> {
        let query = non_empty(query, "query")?;
        let k = k.unwrap_or_else(|| self.rag.default_top_k());
        if k == 0 {
            return Err(DomainError::validation("k must be at least 1"));
        }

        let handle = self.sessions.get(id)?;
        let mut session = handle.lock().await;
        session.begin_query()?;

        let result = match require_index(&session) {
            Ok(()) => self
                .rag
                .search(query, k)
                .await
                .map(|hits| RetrievedPassage::resolve(&hits, &session.chunks)),
            Err(e) => Err(e),
        };
        session.finish_query();
        log_failure(result, "search failed")
    }

    pub async fn clear_history(&self, id: Uuid) -> Result<SessionView, DomainError> {
        let handle = self.sessions.get(id)?;
        let mut session = handle.lock().await;
        session.conversation.clear();
        Ok(SessionView::from(&*session))
    }

    pub async fn reset(&self, id: Uuid) -> Result<SessionView, DomainError> {
        let handle = self.sessions.get(id)?;
        let mut session = handle.lock().await;
        session.reset();
        info!(session_id = %id, "session reset");
        Ok(SessionView::from(&*session))
    }

    async fn load(
        &self,
        flow: Flow,
        documents: Vec<Document>,
        skipped: Vec<SkippedFile>,
    ) -> Result<(IntakeReport, Vec<DocumentChunk>), DomainError> {
        let (chunks, index) = match flow {
            Flow::Direct => (Vec::new(), None),
            Flow::Chat => {
                let (chunks, report) = self.rag.index_documents(&documents).await?;
                (chunks, Some(report))
            }
        };
        let report = IntakeReport {
            flow,
            documents,
            skipped,
            index,
        };
        Ok((report, chunks))
    }

    fn settle_intake(
        &self,
        session: &mut Session,
        flow: Flow,
        result: Result<(IntakeReport, Vec<DocumentChunk>), DomainError>,
    ) -> Result<IntakeReport, DomainError> {
        match result {
            Ok((report, chunks)) => {
                session.finish_processing(flow, report.documents.clone(), chunks);
                info!(
                    session_id = %session.id,
                    documents = report.documents.len(),
                    ?flow,
                    "documents loaded"
                );
                Ok(report)
            }
            Err(e) => {
                session.abort_processing();
                error!(session_id = %session.id, error = %e, "document intake failed");
                Err(e)
            }
        }
    }

    async fn chat_turn(&self, session: &Session, message: &str) -> Result<ChatTurn, DomainError> {
        require_index(session)?;

        let hits = self.rag.search_default(message).await?;
        let passages = RetrievedPassage::resolve(&hits, &session.chunks);

        if self.retrieval_fallback && !self.query.llm_configured() {
            return Ok(ChatTurn {
                answer: self.query.passages_answer(&passages),
                passages,
                generated: false,
            });
        }

        let answer = self
            .query
            .ask_with_context(&passages, &session.conversation.messages, message)
            .await?;
        Ok(ChatTurn {
            answer,
            passages,
            generated: true,
        })
    }
}

fn require_index(session: &Session) -> Result<(), DomainError> {
    if session.flow != Flow::Chat {
        return Err(DomainError::validation(
            "documents were loaded for direct queries; upload them in chat mode to chat or search",
        ));
    }
    Ok(())
}

fn non_empty<'a>(text: &'a str, field: &str) -> Result<&'a str, DomainError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(DomainError::validation(format!("{field} must not be empty")));
    }
    Ok(text)
}

fn log_failure<T>(result: Result<T, DomainError>, what: &str) -> Result<T, DomainError> {
    if let Err(e) = &result {
        error!(error = %e, kind = e.kind(), "{what}");
    }
    result
}
