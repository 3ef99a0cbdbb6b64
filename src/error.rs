use axum::{
    Json,
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("No image file uploaded")]
    NoImage,

    #[error("Malformed upload")]
    MalformedUpload(#[source] MultipartError),

    #[error("Upload too large")]
    UploadTooLarge,

    #[error("Could not stage upload")]
    Staging(#[from] std::io::Error),

    #[error("Prediction failed")]
    Prediction(#[source] anyhow::Error),
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::UploadTooLarge
        } else {
            AppError::MalformedUpload(err)
        }
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NoImage | AppError::MalformedUpload(_) => StatusCode::BAD_REQUEST,
            AppError::UploadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Staging(_) | AppError::Prediction(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = match &self {
            AppError::Staging(err) => {
                tracing::error!(error = %err, "Failed to stage upload");
                server_fault()
            }
            AppError::Prediction(err) => {
                tracing::error!(error = ?err, "Prediction failed");
                server_fault()
            }
            AppError::MalformedUpload(err) => {
                tracing::debug!(error = %err, "Rejected malformed upload");
                json!({ "message": self.to_string() })
            }
            AppError::NoImage | AppError::UploadTooLarge => json!({ "message": self.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}

/// Error detail stays in the logs.
fn server_fault() -> serde_json::Value {
    json!({ "message": "Prediction failed", "error": "An error occurred" })
}
