use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

/// Client-facing failures. The chat route answers under `reply`, the media routes under `error`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ApiError {
    #[error("Please enter a valid message.")]
    InvalidMessage,
    #[error("Error processing your message.")]
    ChatFailed,
    #[error("No file uploaded")]
    NoFileUploaded,
    #[error("No file selected")]
    NoFileSelected,
    #[error("Invalid or corrupted image file")]
    InvalidImage,
    #[error("Transcription failed")]
    TranscriptionFailed,
    #[error("Pest detection failed")]
    PestDetectionFailed,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidMessage
            | ApiError::NoFileUploaded
            | ApiError::NoFileSelected
            | ApiError::InvalidImage => StatusCode::BAD_REQUEST,
            ApiError::ChatFailed
            | ApiError::TranscriptionFailed
            | ApiError::PestDetectionFailed => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body_key(&self) -> &'static str {
        match self {
            ApiError::InvalidMessage | ApiError::ChatFailed => "reply",
            _ => "error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ self.body_key(): self.to_string() });
        (self.status(), Json(body)).into_response()
    }
}
