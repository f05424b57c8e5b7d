use actix_multipart::MultipartError;
use actix_web::{error::BlockingError, http::StatusCode, HttpResponse, ResponseError};
use serde_json::{json, Value};
use thiserror::Error;

use crate::models::ErrorBody;

/// Failures of the outbound call to the hosted model.
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("model request failed with status {status}")]
    RequestFailed { status: u16, body: String },
    #[error("model request timed out")]
    Timeout,
    #[error("model returned an invalid response")]
    InvalidResponse(Value),
    #[error("error connecting to model: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

impl InferenceError {
    /// Transport-level failures may succeed on a second attempt; upstream
    /// verdicts never do.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Timeout)
    }
}

impl From<reqwest::Error> for InferenceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Transport(err)
        }
    }
}

/// Everything that can go wrong while serving `/predict`.
#[derive(Debug, Error)]
pub enum PredictError {
    #[error("no image uploaded")]
    MissingImage,
    #[error("malformed multipart body: {0}")]
    Multipart(String),
    #[error("upload exceeds {limit} bytes")]
    UploadTooLarge { limit: usize },
    #[error("failed to store upload: {0}")]
    Storage(#[from] std::io::Error),
    #[error("background task failed: {0}")]
    Task(String),
    #[error(transparent)]
    Inference(#[from] InferenceError),
}

impl From<MultipartError> for PredictError {
    fn from(err: MultipartError) -> Self {
        Self::Multipart(err.to_string())
    }
}

impl From<BlockingError> for PredictError {
    fn from(err: BlockingError) -> Self {
        Self::Task(err.to_string())
    }
}

impl PredictError {
    fn body(&self) -> ErrorBody {
        let (error, details) = match self {
            Self::MissingImage => ("No image uploaded", None),
            Self::Multipart(_) => ("Malformed upload", None),
            Self::UploadTooLarge { limit } => ("Image too large", Some(json!({ "limit": limit }))),
            Self::Storage(_) | Self::Task(_) => ("Failed to process upload", None),
            Self::Inference(InferenceError::RequestFailed { status, .. }) => {
                ("Model unavailable", Some(json!({ "status": status })))
            }
            Self::Inference(InferenceError::Timeout) => {
                ("Model unavailable", Some(json!({ "reason": "timeout" })))
            }
            Self::Inference(InferenceError::InvalidResponse(value)) => {
                ("Model inference failed", Some(value.clone()))
            }
            Self::Inference(InferenceError::Transport(_) | InferenceError::Client(_)) => {
                ("Error connecting to model", None)
            }
        };
        ErrorBody { error, details }
    }
}

impl ResponseError for PredictError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingImage | Self::Multipart(_) => StatusCode::BAD_REQUEST,
            Self::UploadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "predict failed");
        } else {
            tracing::warn!(error = %self, "predict rejected");
        }
        HttpResponse::build(status).json(self.body())
    }
}
