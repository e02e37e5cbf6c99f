//! Error types for the PDF layout server
//!
//! `ExtractError` is the pipeline taxonomy (intake, session, extraction).
//! `ApiError` translates it into HTTP responses.

use std::fmt;

use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::limits::whole_megabytes;

/// Pipeline result type
pub type Result<T> = std::result::Result<T, ExtractError>;

fn megabytes(bytes: &usize) -> usize {
    whole_megabytes(*bytes)
}

/// Pipeline stage an unclassified decoder failure came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeStage {
    Open,
    Extract,
}

impl fmt::Display for DecodeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeStage::Open => f.write_str("open PDF"),
            DecodeStage::Extract => f.write_str("extract text from PDF"),
        }
    }
}

/// Errors raised while validating, opening or extracting an upload
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Uploaded file is empty")]
    EmptyPayload,

    #[error(
        "File too large. Maximum size is {}MB, got {}MB",
        megabytes(.limit),
        megabytes(.actual)
    )]
    PayloadTooLarge { limit: usize, actual: usize },

    #[error("Only PDF files are supported")]
    FilenameRejected(Option<String>),

    #[error("Failed to save uploaded file: {0}")]
    StorageFailure(#[source] std::io::Error),

    #[error("Invalid or corrupted PDF file")]
    InvalidDocument(String),

    #[error("PDF is password-protected. Please provide a password.")]
    PasswordRequired,

    #[error("Invalid password for encrypted PDF")]
    InvalidPassword,

    #[error("PDF has too many pages. Maximum is {limit} pages, got {actual} pages")]
    TooManyPages { limit: usize, actual: usize },

    #[error("PDF too large to process")]
    ResourceExhausted,

    #[error("Failed to {stage}: {message}")]
    InternalDecodeFailure { stage: DecodeStage, message: String },

    #[error("Worker task failed: {0}")]
    Worker(String),
}

impl ExtractError {
    /// HTTP status for the primary parsing endpoint
    pub fn status_code(&self) -> StatusCode {
        match self {
            ExtractError::EmptyPayload
            | ExtractError::FilenameRejected(_)
            | ExtractError::InvalidDocument(_)
            | ExtractError::PasswordRequired => StatusCode::BAD_REQUEST,
            ExtractError::InvalidPassword => StatusCode::UNAUTHORIZED,
            ExtractError::PayloadTooLarge { .. }
            | ExtractError::TooManyPages { .. }
            | ExtractError::ResourceExhausted => StatusCode::PAYLOAD_TOO_LARGE,
            ExtractError::StorageFailure(_)
            | ExtractError::InternalDecodeFailure { .. }
            | ExtractError::Worker(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine readable error kind
    pub fn kind(&self) -> &'static str {
        match self {
            ExtractError::EmptyPayload => "empty_payload",
            ExtractError::PayloadTooLarge { .. } => "payload_too_large",
            ExtractError::FilenameRejected(_) => "filename_rejected",
            ExtractError::StorageFailure(_) => "storage_failure",
            ExtractError::InvalidDocument(_) => "invalid_document",
            ExtractError::PasswordRequired => "password_required",
            ExtractError::InvalidPassword => "invalid_password",
            ExtractError::TooManyPages { .. } => "too_many_pages",
            ExtractError::ResourceExhausted => "resource_exhausted",
            ExtractError::InternalDecodeFailure { .. } => "decode_failure",
            ExtractError::Worker(_) => "internal_error",
        }
    }

    /// Rejected before the upload ever reached storage
    pub fn is_intake(&self) -> bool {
        matches!(
            self,
            ExtractError::EmptyPayload
                | ExtractError::PayloadTooLarge { .. }
                | ExtractError::FilenameRejected(_)
        )
    }
}

/// HTTP-facing error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Failure on the primary parsing endpoint
    #[error(transparent)]
    Parse(#[from] ExtractError),

    /// Failure on the legacy plain-text endpoint
    #[error("{0}")]
    Legacy(ExtractError),

    /// Multipart body could not be read
    #[error("Failed to read upload: {message}")]
    Upload { status: StatusCode, message: String },

    #[error("No file provided. Use field name 'file' or 'pdf'")]
    MissingFile,
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        ApiError::Upload {
            status: err.status(),
            message: err.body_text(),
        }
    }
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            ApiError::Parse(e) => (e.status_code(), e.kind(), e.to_string()),
            ApiError::Legacy(e) if e.is_intake() => (e.status_code(), e.kind(), e.to_string()),
            ApiError::Legacy(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "processing_failed",
                format!("Failed to process PDF: {}", e),
            ),
            ApiError::Upload { status, .. } => (*status, "bad_upload", self.to_string()),
            ApiError::MissingFile => (StatusCode::BAD_REQUEST, "missing_file", self.to_string()),
        };

        if status.is_server_error() {
            tracing::error!("Request failed ({}): {}", status, message);
        } else {
            tracing::info!("Request rejected ({}): {}", status, message);
        }

        let body = Json(ErrorResponse {
            error: error_type.to_string(),
            message,
        });

        (status, body).into_response()
    }
}
