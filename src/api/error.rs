use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::domain::DomainError;

/// Error body: `{"error": kind, "message": text}`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
}

#[derive(Debug)]
pub struct ApiError(pub DomainError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            DomainError::UnsupportedFormat(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            DomainError::Extraction { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            DomainError::MissingCredential(_) => StatusCode::SERVICE_UNAVAILABLE,
            DomainError::RemoteService(_) => StatusCode::BAD_GATEWAY,
            DomainError::InvalidDirectory(_) | DomainError::Validation(_) => StatusCode::BAD_REQUEST,
            DomainError::CollectionNotLoaded(_) | DomainError::NoDocument => StatusCode::CONFLICT,
            DomainError::NotFound(_) => StatusCode::NOT_FOUND,
            DomainError::DimensionMismatch { .. } | DomainError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        Self(err)
    }
}

impl From<axum::extract::multipart::MultipartError> for ApiError {
    fn from(err: axum::extract::multipart::MultipartError) -> Self {
        Self(DomainError::validation(format!("invalid upload: {}", err.body_text())))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, kind = self.0.kind(), "request failed");
        } else {
            tracing::debug!(error = %self.0, kind = self.0.kind(), "request rejected");
        }

        let body = ErrorBody {
            error: self.0.kind(),
            message: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (DomainError::unsupported(".png"), StatusCode::UNSUPPORTED_MEDIA_TYPE),
            (DomainError::extraction("a.pdf", "bad xref"), StatusCode::UNPROCESSABLE_ENTITY),
            (DomainError::missing_credential("NVIDIA_API_KEY"), StatusCode::SERVICE_UNAVAILABLE),
            (DomainError::remote("500: boom"), StatusCode::BAD_GATEWAY),
            (DomainError::invalid_directory("/nope"), StatusCode::BAD_REQUEST),
            (
                DomainError::DimensionMismatch {
                    expected: 768,
                    actual: 384,
                },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                DomainError::CollectionNotLoaded("chunks".into()),
                StatusCode::CONFLICT,
            ),
            (DomainError::NoDocument, StatusCode::CONFLICT),
            (DomainError::not_found("session"), StatusCode::NOT_FOUND),
            (DomainError::validation("empty"), StatusCode::BAD_REQUEST),
            (DomainError::internal("poisoned"), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[tokio::test]
    async fn test_error_body() {
        let response = ApiError::from(DomainError::missing_credential("NVIDIA_API_KEY")).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "missing_credential");
        assert_eq!(
            body["message"],
            "API key not found! Please set the NVIDIA_API_KEY environment variable."
        );
    }
}
