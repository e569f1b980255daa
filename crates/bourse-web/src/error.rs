use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use bourse_core::{ControllerError, DataAccessError};
use thiserror::Error;
use uuid::Uuid;

use crate::response::ErrorResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("session {0} not found")]
    SessionNotFound(Uuid),

    #[error(transparent)]
    Controller(#[from] ControllerError),

    #[error(transparent)]
    DataAccess(#[from] DataAccessError),

    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::SessionNotFound(_) => StatusCode::NOT_FOUND,
            Self::Controller(_) => StatusCode::CONFLICT,
            Self::DataAccess(_) | Self::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::SessionNotFound(_) => "session_not_found",
            Self::Controller(ControllerError::ControlUnavailable { .. }) => "control_unavailable",
            Self::DataAccess(_) => "data_access",
            Self::Task(_) => "internal",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = ErrorResponse {
            code: self.code(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
