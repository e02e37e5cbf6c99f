//! Parsing pipeline
//!
//! Intake guard → document session → span extraction, run once per request.
//! Everything after intake is blocking (temp file I/O, MuPDF), so it runs on
//! Tokio's blocking pool. The whole session lives inside one
//! `spawn_blocking` closure: if the request is abandoned the closure still
//! finishes and the session's `Drop` releases the document and artifact.

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use tracing::Instrument;
use uuid::Uuid;

use crate::decoder::PdfDecoder;
use crate::error::{ExtractError, Result};
use crate::extract::{extract_page_texts, extract_spans, TextSpanRecord};
use crate::intake::{require_pdf_extension, validate, UploadPayload, ValidatedPayload};
use crate::limits::ResourceLimits;
use crate::session::{DocumentSession, SessionOptions};

/// Plain-text extraction result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageTexts {
    pub filename: String,
    pub pages: usize,
    pub text: Vec<String>,
}

/// Shared, cheaply cloneable pipeline
#[derive(Clone)]
pub struct ParseService {
    inner: Arc<ParseServiceInner>,
}

struct ParseServiceInner {
    decoder: Arc<dyn PdfDecoder>,
    options: SessionOptions,
}

impl ParseService {
    pub fn new(decoder: Arc<dyn PdfDecoder>, limits: ResourceLimits, temp_dir: Option<PathBuf>) -> Self {
        Self {
            inner: Arc::new(ParseServiceInner {
                decoder,
                options: SessionOptions { limits, temp_dir },
            }),
        }
    }

    pub fn limits(&self) -> &ResourceLimits {
        &self.inner.options.limits
    }

    /// Layout-aware span extraction
    pub async fn parse(
        &self,
        payload: UploadPayload,
        password: Option<String>,
    ) -> Result<Vec<TextSpanRecord>> {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!("parse_pdf", %request_id);

        async move {
            let validated = validate(payload, self.limits())?;
            tracing::debug!(
                "Accepted upload {:?} ({} bytes)",
                validated.filename(),
                validated.len()
            );

            let inner = Arc::clone(&self.inner);
            let current = tracing::Span::current();
            let records = tokio::task::spawn_blocking(move || {
                current.in_scope(|| inner.parse_blocking(validated, password.as_deref()))
            })
            .await
            .map_err(|e| ExtractError::Worker(e.to_string()))??;

            tracing::info!("Extracted {} spans", records.len());
            Ok(records)
        }
        .instrument(span)
        .await
    }

    /// Plain text per page; requires a `.pdf` filename
    pub async fn extract_text(&self, payload: UploadPayload) -> Result<PageTexts> {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!("extract_text", %request_id);

        async move {
            require_pdf_extension(payload.filename.as_deref())?;
            let validated = validate(payload, self.limits())?;
            let filename = validated.filename().unwrap_or_default().to_string();

            let inner = Arc::clone(&self.inner);
            let current = tracing::Span::current();
            let text = tokio::task::spawn_blocking(move || {
                current.in_scope(|| inner.extract_text_blocking(validated))
            })
            .await
            .map_err(|e| ExtractError::Worker(e.to_string()))??;

            tracing::info!("Extracted plain text from {} pages", text.len());
            Ok(PageTexts {
                filename,
                pages: text.len(),
                text,
            })
        }
        .instrument(span)
        .await
    }
}

impl ParseServiceInner {
    fn parse_blocking(
        &self,
        payload: ValidatedPayload,
        password: Option<&str>,
    ) -> Result<Vec<TextSpanRecord>> {
        let session = DocumentSession::open(self.decoder.as_ref(), payload, password, &self.options)?;
        let records = extract_spans(&session);
        session.close();
        records
    }

    fn extract_text_blocking(&self, payload: ValidatedPayload) -> Result<Vec<String>> {
        let session = DocumentSession::open(self.decoder.as_ref(), payload, None, &self.options)?;
        let text = extract_page_texts(&session);
        session.close();
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::testing::{sample_pages, ScriptedDecoder, PDF_BYTES};
    use crate::decoder::DecodeError;
    use tempfile::TempDir;

    fn service(decoder: &ScriptedDecoder, dir: &TempDir, limits: ResourceLimits) -> ParseService {
        ParseService::new(
            Arc::new(decoder.clone()),
            limits,
            Some(dir.path().to_path_buf()),
        )
    }

    fn upload(bytes: &[u8]) -> UploadPayload {
        UploadPayload::new(Some("doc.pdf".into()), bytes.to_vec())
    }

    fn dir_is_empty(dir: &TempDir) -> bool {
        std::fs::read_dir(dir.path()).unwrap().next().is_none()
    }

    #[tokio::test]
    async fn test_parse_success() {
        let dir = TempDir::new().unwrap();
        let decoder = ScriptedDecoder::new(sample_pages());
        let service = service(&decoder, &dir, ResourceLimits::DEFAULT);

        let records = service.parse(upload(PDF_BYTES), None).await.unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(decoder.open_handles(), 0);
        assert!(dir_is_empty(&dir));
    }

    #[tokio::test]
    async fn test_oversized_upload_leaves_no_artifact() {
        let dir = TempDir::new().unwrap();
        let decoder = ScriptedDecoder::new(sample_pages());
        let limits = ResourceLimits {
            max_file_size_bytes: 8,
            ..ResourceLimits::DEFAULT
        };
        let service = service(&decoder, &dir, limits);

        let result = service.parse(upload(PDF_BYTES), None).await;
        assert!(matches!(result, Err(ExtractError::PayloadTooLarge { .. })));
        assert_eq!(decoder.open_handles(), 0);
        assert!(dir_is_empty(&dir));
    }

    #[tokio::test]
    async fn test_cleanup_under_failure_injection() {
        let dir = TempDir::new().unwrap();

        let cases: Vec<(ScriptedDecoder, Option<&str>, &[u8])> = vec![
            // decode-open failure
            (ScriptedDecoder::new(sample_pages()), None, &b"garbage"[..]),
            (
                ScriptedDecoder::new(sample_pages()).failing_open(DecodeError::OutOfMemory),
                None,
                PDF_BYTES,
            ),
            // authentication failure
            (ScriptedDecoder::new(sample_pages()).encrypted("pw"), None, PDF_BYTES),
            (ScriptedDecoder::new(sample_pages()).encrypted("pw"), Some("nope"), PDF_BYTES),
            // page-limit failure
            (ScriptedDecoder::new(sample_pages()).with_page_count(501), None, PDF_BYTES),
            // mid-traversal failure
            (
                ScriptedDecoder::new(sample_pages())
                    .failing_on_page(1, DecodeError::Other("bad xref".into())),
                None,
                PDF_BYTES,
            ),
        ];

        for (decoder, password, bytes) in cases {
            let service = service(&decoder, &dir, ResourceLimits::DEFAULT);
            let result = service.parse(upload(bytes), password.map(str::to_string)).await;

            assert!(result.is_err());
            assert_eq!(decoder.open_handles(), 0);
            assert!(dir_is_empty(&dir));
        }
    }

    #[tokio::test]
    async fn test_storage_failure_is_reported() {
        let dir = TempDir::new().unwrap();
        let decoder = ScriptedDecoder::new(sample_pages());
        let service = ParseService::new(
            Arc::new(decoder.clone()),
            ResourceLimits::DEFAULT,
            Some(dir.path().join("gone")),
        );

        let result = service.parse(upload(PDF_BYTES), None).await;
        assert!(matches!(result, Err(ExtractError::StorageFailure(_))));
        assert_eq!(decoder.open_handles(), 0);
    }

    #[tokio::test]
    async fn test_encrypted_round_trip() {
        let dir = TempDir::new().unwrap();
        let decoder = ScriptedDecoder::new(sample_pages()).encrypted("letmein");
        let service = service(&decoder, &dir, ResourceLimits::DEFAULT);

        let unlocked = service
            .parse(upload(PDF_BYTES), Some("letmein".into()))
            .await
            .unwrap();
        assert_eq!(unlocked.len(), 3);
        assert_eq!(decoder.open_handles(), 0);
        assert!(dir_is_empty(&dir));
    }

    #[tokio::test]
    async fn test_too_many_pages_never_extracts() {
        let dir = TempDir::new().unwrap();
        let decoder = ScriptedDecoder::new(sample_pages()).with_page_count(501);
        let service = service(&decoder, &dir, ResourceLimits::DEFAULT);

        let result = service.parse(upload(PDF_BYTES), None).await;
        assert!(matches!(
            result,
            Err(ExtractError::TooManyPages { limit: 500, actual: 501 })
        ));
        assert_eq!(decoder.pages_extracted(), 0);
    }

    #[tokio::test]
    async fn test_parse_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let decoder = ScriptedDecoder::new(sample_pages());
        let service = service(&decoder, &dir, ResourceLimits::DEFAULT);

        let first = service.parse(upload(PDF_BYTES), None).await.unwrap();
        let second = service.parse(upload(PDF_BYTES), None).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_extract_text() {
        let dir = TempDir::new().unwrap();
        let decoder = ScriptedDecoder::new(sample_pages());
        let service = service(&decoder, &dir, ResourceLimits::DEFAULT);

        let result = service.extract_text(upload(PDF_BYTES)).await.unwrap();
        assert_eq!(result.filename, "doc.pdf");
        assert_eq!(result.pages, 3);
        assert_eq!(result.text.len(), 3);
        assert!(dir_is_empty(&dir));
    }

    #[tokio::test]
    async fn test_extract_text_requires_pdf_filename() {
        let dir = TempDir::new().unwrap();
        let decoder = ScriptedDecoder::new(sample_pages());
        let service = service(&decoder, &dir, ResourceLimits::DEFAULT);

        let payload = UploadPayload::new(Some("doc.txt".into()), PDF_BYTES.to_vec());
        let result = service.extract_text(payload).await;
        assert!(matches!(result, Err(ExtractError::FilenameRejected(_))));
        assert_eq!(decoder.open_handles(), 0);
    }
}
