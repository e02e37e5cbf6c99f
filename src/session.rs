//! Document session
//!
//! Owns one decode attempt from start to finish. Acquisition happens in
//! stages, and any stage may fail after earlier ones succeeded:
//!
//! ```text
//! Empty ──► ArtifactHeld ──► DocumentOpen ──► Authenticated ──► LimitChecked
//!   │            │                 │                │                 │
//!   └────────────┴─────────────────┴────────────────┴─────────────────┘
//!                                  ▼
//!                     teardown (always, from Drop)
//!               1. close decoder handle  (errors logged)
//!               2. delete temp artifact  (errors logged)
//! ```
//!
//! Teardown releases exactly the resources acquired so far. It runs from
//! `Drop`, so early returns and panics release the same way as a normal close.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::decoder::{DecodedDocument, PdfDecoder};
use crate::error::{DecodeStage, ExtractError, Result};
use crate::intake::ValidatedPayload;
use crate::limits::ResourceLimits;

/// Acquisition progress of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStage {
    Empty,
    ArtifactHeld,
    DocumentOpen,
    Authenticated,
    LimitChecked,
    Released,
}

/// Where artifacts go and which ceilings apply
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    pub limits: ResourceLimits,
    /// Directory for temporary artifacts; OS default when `None`
    pub temp_dir: Option<PathBuf>,
}

// ============================================================================
// Temporary Artifact
// ============================================================================

/// On-disk copy of an upload, for decoders that need random file access
pub struct TemporaryArtifact {
    file: NamedTempFile,
}

impl TemporaryArtifact {
    /// Write `content` to a fresh `.pdf` temp file
    ///
    /// A partially written file is removed before the error is returned.
    pub fn create(dir: Option<&Path>, content: &[u8]) -> io::Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("upload-").suffix(".pdf");

        let mut file = match dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        file.write_all(content)?;
        file.flush()?;

        Ok(Self { file })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Delete the file
    pub fn remove(self) -> io::Result<()> {
        self.file.close()
    }
}

// ============================================================================
// Session
// ============================================================================

/// A decode attempt in progress; see module docs for the state machine
pub struct DocumentSession {
    stage: SessionStage,
    artifact: Option<TemporaryArtifact>,
    document: Option<Box<dyn DecodedDocument>>,
    page_count: usize,
}

impl DocumentSession {
    fn new() -> Self {
        Self {
            stage: SessionStage::Empty,
            artifact: None,
            document: None,
            page_count: 0,
        }
    }

    /// Run every acquisition stage
    ///
    /// On error, whatever was acquired is released before returning.
    pub fn open(
        decoder: &dyn PdfDecoder,
        payload: ValidatedPayload,
        password: Option<&str>,
        options: &SessionOptions,
    ) -> Result<ActiveSession> {
        let mut session = DocumentSession::new();

        session.materialize(&payload, options.temp_dir.as_deref())?;
        drop(payload);

        session.open_document(decoder)?;
        session.authenticate(password)?;
        session.check_page_count(&options.limits)?;

        Ok(ActiveSession { session })
    }

    pub fn stage(&self) -> SessionStage {
        self.stage
    }

    fn materialize(&mut self, payload: &ValidatedPayload, dir: Option<&Path>) -> Result<()> {
        let artifact = TemporaryArtifact::create(dir, payload.content()).map_err(|e| {
            if e.kind() == io::ErrorKind::OutOfMemory {
                ExtractError::ResourceExhausted
            } else {
                ExtractError::StorageFailure(e)
            }
        })?;

        tracing::debug!(
            "Wrote {} byte upload to {}",
            payload.len(),
            artifact.path().display()
        );
        self.artifact = Some(artifact);
        self.stage = SessionStage::ArtifactHeld;
        Ok(())
    }

    fn open_document(&mut self, decoder: &dyn PdfDecoder) -> Result<()> {
        let path = match &self.artifact {
            Some(artifact) => artifact.path(),
            None => {
                return Err(ExtractError::InternalDecodeFailure {
                    stage: DecodeStage::Open,
                    message: "no artifact to open".into(),
                })
            }
        };

        let document = decoder
            .open(path)
            .map_err(|e| e.at_stage(DecodeStage::Open))?;

        self.document = Some(document);
        self.stage = SessionStage::DocumentOpen;
        Ok(())
    }

    fn authenticate(&mut self, password: Option<&str>) -> Result<()> {
        let document = self.document_mut()?;

        let encrypted = document
            .needs_password()
            .map_err(|e| e.at_stage(DecodeStage::Open))?;

        if encrypted {
            // An empty password counts as no password
            let password = password
                .filter(|p| !p.is_empty())
                .ok_or(ExtractError::PasswordRequired)?;

            let accepted = document
                .authenticate(password)
                .map_err(|e| e.at_stage(DecodeStage::Open))?;
            if !accepted {
                return Err(ExtractError::InvalidPassword);
            }
            tracing::debug!("Authenticated encrypted document");
        }

        self.stage = SessionStage::Authenticated;
        Ok(())
    }

    fn check_page_count(&mut self, limits: &ResourceLimits) -> Result<()> {
        let page_count = self
            .document_mut()?
            .page_count()
            .map_err(|e| e.at_stage(DecodeStage::Open))?;

        if page_count > limits.max_page_count {
            return Err(ExtractError::TooManyPages {
                limit: limits.max_page_count,
                actual: page_count,
            });
        }

        self.page_count = page_count;
        self.stage = SessionStage::LimitChecked;
        Ok(())
    }

    fn document_mut(&mut self) -> Result<&mut Box<dyn DecodedDocument>> {
        self.document
            .as_mut()
            .ok_or_else(|| ExtractError::InternalDecodeFailure {
                stage: DecodeStage::Open,
                message: "document is not open".into(),
            })
    }

    /// Release whatever was acquired. Safe to call more than once.
    fn teardown(&mut self) {
        if self.stage == SessionStage::Released {
            return;
        }

        if let Some(document) = self.document.take() {
            if let Err(e) = document.close() {
                tracing::warn!("Ignoring error while closing document: {}", e);
            }
        }

        if let Some(artifact) = self.artifact.take() {
            let path = artifact.path().to_path_buf();
            match artifact.remove() {
                Ok(()) => tracing::debug!("Removed temporary artifact {}", path.display()),
                Err(e) => tracing::warn!(
                    "Ignoring error while removing {}: {}",
                    path.display(),
                    e
                ),
            }
        }

        self.stage = SessionStage::Released;
    }
}

impl Drop for DocumentSession {
    fn drop(&mut self) {
        self.teardown();
    }
}

// ============================================================================
// Active Session
// ============================================================================

/// A session that passed every stage and is ready for extraction
pub struct ActiveSession {
    session: DocumentSession,
}

impl ActiveSession {
    pub fn document(&self) -> Result<&dyn DecodedDocument> {
        match &self.session.document {
            Some(document) => Ok(&**document),
            None => Err(ExtractError::InternalDecodeFailure {
                stage: DecodeStage::Extract,
                message: "document is not open".into(),
            }),
        }
    }

    pub fn page_count(&self) -> usize {
        self.session.page_count
    }

    pub fn stage(&self) -> SessionStage {
        self.session.stage()
    }

    #[cfg(test)]
    pub(crate) fn artifact_path(&self) -> Option<&Path> {
        self.session.artifact.as_ref().map(TemporaryArtifact::path)
    }

    /// Close the document and delete the artifact
    pub fn close(mut self) {
        self.session.teardown();
    }
}
