//! Intake guard
//!
//! Cheap checks on the raw upload before anything touches storage or the
//! decoder.

use axum::body::Bytes;

use crate::error::{ExtractError, Result};
use crate::limits::ResourceLimits;

/// Raw upload as received from the client
#[derive(Debug, Clone)]
pub struct UploadPayload {
    pub filename: Option<String>,
    pub content: Bytes,
}

impl UploadPayload {
    pub fn new(filename: Option<String>, content: impl Into<Bytes>) -> Self {
        Self {
            filename,
            content: content.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

/// Upload that passed the intake checks; content is never empty
#[derive(Debug, Clone)]
pub struct ValidatedPayload {
    filename: Option<String>,
    content: Bytes,
}

impl ValidatedPayload {
    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

/// Check the payload is non-empty and under the size ceiling
pub fn validate(payload: UploadPayload, limits: &ResourceLimits) -> Result<ValidatedPayload> {
    if payload.is_empty() {
        return Err(ExtractError::EmptyPayload);
    }

    let size = payload.len();
    if size > limits.max_file_size_bytes {
        return Err(ExtractError::PayloadTooLarge {
            limit: limits.max_file_size_bytes,
            actual: size,
        });
    }

    Ok(ValidatedPayload {
        filename: payload.filename,
        content: payload.content,
    })
}

/// Reject filenames without a `.pdf` extension (any case)
///
/// Only the plain-text endpoint gates on the filename; the parsing endpoint
/// leaves format detection to the decoder.
pub fn require_pdf_extension(filename: Option<&str>) -> Result<()> {
    let is_pdf = filename.is_some_and(|name| name.to_ascii_lowercase().ends_with(".pdf"));

    if is_pdf {
        Ok(())
    } else {
        Err(ExtractError::FilenameRejected(filename.map(str::to_string)))
    }
}
