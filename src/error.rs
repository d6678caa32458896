use crate::api::ErrorResponse;
use crate::store::StoreError;
use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::rejection::{FormRejection, JsonRejection};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

/// Every way a request can fail. Converted to an [`ErrorResponse`] at the
/// handler boundary.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("Recipe not found")]
    NotFound,

    #[error(transparent)]
    Json(#[from] JsonRejection),

    #[error(transparent)]
    Form(#[from] FormRejection),

    #[error(transparent)]
    MultipartRejected(#[from] MultipartRejection),

    #[error(transparent)]
    Multipart(#[from] MultipartError),

    #[error("Failed to generate recipe id")]
    IdAllocation,

    #[error("{context}")]
    Store {
        context: &'static str,
        #[source]
        source: StoreError,
    },

    #[error("{context}")]
    Upload {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
}

impl AppError {
    pub fn store(context: &'static str, source: StoreError) -> Self {
        AppError::Store { context, source }
    }

    pub fn upload(context: &'static str, source: std::io::Error) -> Self {
        AppError::Upload { context, source }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Json(rejection) => rejection.status(),
            AppError::Form(rejection) => rejection.status(),
            AppError::MultipartRejected(rejection) => rejection.status(),
            AppError::Multipart(e) => e.status(),
            AppError::IdAllocation | AppError::Store { .. } | AppError::Upload { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn message(&self) -> String {
        match self {
            AppError::Json(rejection) => rejection.body_text(),
            AppError::Form(rejection) => rejection.body_text(),
            AppError::MultipartRejected(rejection) => rejection.body_text(),
            AppError::Multipart(e) if e.status() == StatusCode::PAYLOAD_TOO_LARGE => format!(
                "Upload too large. Maximum size is {} bytes per image",
                crate::uploads::MAX_FILE_SIZE
            ),
            AppError::Multipart(e) => format!("Failed to read multipart data: {}", e.body_text()),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        match &self {
            AppError::Store { context, source } => {
                tracing::error!("{}: {}", context, source);
            }
            AppError::Upload { context, source } => {
                tracing::error!("{}: {}", context, source);
            }
            AppError::IdAllocation => {
                tracing::error!("Recipe counter returned no usable value");
            }
            AppError::Multipart(e) => {
                tracing::warn!("Multipart read error: {}", e);
            }
            _ => {}
        }

        (
            status,
            Json(ErrorResponse {
                error: self.message(),
            }),
        )
            .into_response()
    }
}
