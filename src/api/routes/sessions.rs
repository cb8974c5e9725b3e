use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

use crate::api::{error::ApiError, state::AppState};
use crate::application::{ChatTurn, Flow, IntakeReport, SessionView};
use crate::application::services::RetrievedPassage;
use crate::domain::DomainError;

#[derive(Debug, Serialize)]
pub struct CreateSessionResponse {
    pub session_id: Uuid,
}

#[derive(Debug, Default, Deserialize)]
pub struct UploadQuery {
    #[serde(default)]
    pub mode: Flow,
}

#[derive(Debug, Deserialize)]
pub struct DirectoryRequest {
    pub path: String,
    #[serde(default)]
    pub mode: Flow,
}

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub question: String,
}

#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub answer: String,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    pub k: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub hits: Vec<RetrievedPassage>,
}

pub async fn create_session(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<CreateSessionResponse>), ApiError> {
    let session_id = state.controller.create_session()?;
    Ok((StatusCode::CREATED, Json(CreateSessionResponse { session_id })))
}

pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, ApiError> {
    Ok(Json(state.controller.snapshot(id).await?))
}

pub async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.controller.remove(id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Accepts one or more multipart `file` parts.
pub async fn upload(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<UploadQuery>,
    mut multipart: Multipart,
) -> Result<Json<IntakeReport>, ApiError> {
    let mut files = Vec::new();
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        let name = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| DomainError::validation("file part has no file name"))?;
        let bytes = field.bytes().await?;
        files.push((name, bytes.to_vec()));
    }

    Ok(Json(state.controller.upload(id, files, query.mode).await?))
}

pub async fn ingest_directory(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<DirectoryRequest>,
) -> Result<Json<IntakeReport>, ApiError> {
    let path = request.path.trim();
    if path.is_empty() {
        return Err(DomainError::validation("path must not be empty").into());
    }
    let report = state
        .controller
        .ingest_directory(id, &PathBuf::from(path), request.mode)
        .await?;
    Ok(Json(report))
}

pub async fn query(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, ApiError> {
    let answer = state.controller.ask(id, &request.question).await?;
    Ok(Json(QueryResponse { answer }))
}

pub async fn chat(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatTurn>, ApiError> {
    Ok(Json(state.controller.chat(id, &request.message).await?))
}

pub async fn search(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, ApiError> {
    let hits = state.controller.search(id, &request.query, request.k).await?;
    Ok(Json(SearchResponse { hits }))
}

pub async fn clear_history(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, ApiError> {
    Ok(Json(state.controller.clear_history(id).await?))
}

pub async fn reset(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, ApiError> {
    Ok(Json(state.controller.reset(id).await?))
}
