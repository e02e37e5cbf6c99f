//! PDF decoder seam
//!
//! The pipeline never talks to a PDF library directly. It sees a
//! [`PdfDecoder`] that opens a file path and hands back a
//! [`DecodedDocument`]: encryption state, page count and the per-page
//! block/line/span tree.
//!
//! # Threading
//!
//! Decoded documents are not `Send`. A document is opened, used and closed
//! on the same blocking thread; only the decoder itself is shared.

mod mupdf_backend;
mod types;

#[cfg(test)]
pub(crate) mod testing;

use std::path::Path;

use thiserror::Error;

use crate::error::{DecodeStage, ExtractError};

pub use mupdf_backend::MuPdfDecoder;
pub use types::{Block, ImageBlock, Rect, TextBlock, TextLine, TextSpan};

/// Raw failure reported by a decoder
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DecodeError {
    /// Input is not a parseable PDF
    #[error("malformed document: {0}")]
    Format(String),

    /// Allocation failure or a decoder hard limit
    #[error("out of memory")]
    OutOfMemory,

    #[error("{0}")]
    Other(String),
}

impl DecodeError {
    /// Translate at a pipeline stage boundary
    ///
    /// A format error only means "invalid document" while opening; once the
    /// document is open it is reported as an internal decode failure.
    pub fn at_stage(self, stage: DecodeStage) -> ExtractError {
        match (self, stage) {
            (DecodeError::OutOfMemory, _) => ExtractError::ResourceExhausted,
            (DecodeError::Format(message), DecodeStage::Open) => {
                ExtractError::InvalidDocument(message)
            }
            (DecodeError::Format(message), stage) | (DecodeError::Other(message), stage) => {
                ExtractError::InternalDecodeFailure { stage, message }
            }
        }
    }
}

/// Opens PDF files
pub trait PdfDecoder: Send + Sync {
    /// Open the document at `path`
    fn open(&self, path: &Path) -> Result<Box<dyn DecodedDocument>, DecodeError>;
}

/// An open decoder handle
pub trait DecodedDocument {
    /// Whether the document is encrypted and still locked
    fn needs_password(&self) -> Result<bool, DecodeError>;

    /// Try a password; `Ok(false)` when it is rejected
    fn authenticate(&mut self, password: &str) -> Result<bool, DecodeError>;

    fn page_count(&self) -> Result<usize, DecodeError>;

    /// Layout tree of one page, in decoder order
    fn extract_blocks(&self, page_index: usize) -> Result<Vec<Block>, DecodeError>;

    /// Plain text of one page
    fn extract_text(&self, page_index: usize) -> Result<String, DecodeError>;

    /// Release the handle
    fn close(self: Box<Self>) -> Result<(), DecodeError>;
}
