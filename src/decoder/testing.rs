//! Scripted decoder for tests
//!
//! Reads the artifact it is given (so tests exercise the real temp file) and
//! answers from a script: pages, optional password, injected failures.
//! Open handles are counted so tests can assert every handle was closed.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::types::{Block, ImageBlock, Rect, TextBlock, TextLine, TextSpan};
use super::{DecodeError, DecodedDocument, PdfDecoder};

#[derive(Debug, Clone, Default)]
pub struct ScriptedDecoder {
    pages: Vec<Vec<Block>>,
    page_count: Option<usize>,
    password: Option<String>,
    fail_open: Option<DecodeError>,
    fail_on_page: Option<(usize, DecodeError)>,
    fail_close: bool,
    open_handles: Arc<AtomicUsize>,
    pages_extracted: Arc<AtomicUsize>,
}

impl ScriptedDecoder {
    pub fn new(pages: Vec<Vec<Block>>) -> Self {
        Self {
            pages,
            ..Default::default()
        }
    }

    /// Report this many pages regardless of the scripted ones
    pub fn with_page_count(mut self, count: usize) -> Self {
        self.page_count = Some(count);
        self
    }

    pub fn encrypted(mut self, password: &str) -> Self {
        self.password = Some(password.to_string());
        self
    }

    pub fn failing_open(mut self, err: DecodeError) -> Self {
        self.fail_open = Some(err);
        self
    }

    pub fn failing_on_page(mut self, page_index: usize, err: DecodeError) -> Self {
        self.fail_on_page = Some((page_index, err));
        self
    }

    pub fn failing_close(mut self) -> Self {
        self.fail_close = true;
        self
    }

    pub fn open_handles(&self) -> usize {
        self.open_handles.load(Ordering::SeqCst)
    }

    pub fn pages_extracted(&self) -> usize {
        self.pages_extracted.load(Ordering::SeqCst)
    }
}

impl PdfDecoder for ScriptedDecoder {
    fn open(&self, path: &Path) -> Result<Box<dyn DecodedDocument>, DecodeError> {
        let data = std::fs::read(path).map_err(|e| DecodeError::Other(e.to_string()))?;
        if !data.starts_with(b"%PDF") {
            return Err(DecodeError::Format("cannot recognize version marker".into()));
        }
        if let Some(err) = &self.fail_open {
            return Err(err.clone());
        }

        self.open_handles.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedDocument {
            script: self.clone(),
            locked: self.password.is_some(),
        }))
    }
}

struct ScriptedDocument {
    script: ScriptedDecoder,
    locked: bool,
}

impl ScriptedDocument {
    fn check_page(&self, page_index: usize) -> Result<(), DecodeError> {
        if self.locked {
            return Err(DecodeError::Other("document is locked".into()));
        }
        self.script.pages_extracted.fetch_add(1, Ordering::SeqCst);
        match &self.script.fail_on_page {
            Some((index, err)) if *index == page_index => Err(err.clone()),
            _ => Ok(()),
        }
    }
}

impl DecodedDocument for ScriptedDocument {
    fn needs_password(&self) -> Result<bool, DecodeError> {
        Ok(self.locked)
    }

    fn authenticate(&mut self, password: &str) -> Result<bool, DecodeError> {
        let accepted = self.script.password.as_deref().map_or(true, |p| p == password);
        if accepted {
            self.locked = false;
        }
        Ok(accepted)
    }

    fn page_count(&self) -> Result<usize, DecodeError> {
        Ok(self.script.page_count.unwrap_or(self.script.pages.len()))
    }

    fn extract_blocks(&self, page_index: usize) -> Result<Vec<Block>, DecodeError> {
        self.check_page(page_index)?;
        Ok(self.script.pages.get(page_index).cloned().unwrap_or_default())
    }

    fn extract_text(&self, page_index: usize) -> Result<String, DecodeError> {
        let blocks = self.extract_blocks(page_index)?;
        let mut text = String::new();
        for block in blocks {
            if let Block::Text(block) = block {
                for line in block.lines {
                    for span in line.spans {
                        text.push_str(&span.text);
                    }
                    text.push('\n');
                }
            }
        }
        Ok(text)
    }

    fn close(self: Box<Self>) -> Result<(), DecodeError> {
        self.script.open_handles.fetch_sub(1, Ordering::SeqCst);
        if self.script.fail_close {
            return Err(DecodeError::Other("close failed".into()));
        }
        Ok(())
    }
}

// ============================================================================
// Fixtures
// ============================================================================

pub const PDF_BYTES: &[u8] = b"%PDF-1.7\n1 0 obj\n<< >>\nendobj\n%%EOF\n";

pub fn span(text: &str, font: &str, size: f32, x: f32, y: f32) -> TextSpan {
    TextSpan {
        text: text.to_string(),
        size,
        font: font.to_string(),
        bbox: Rect::new(x, y, x + 50.0, y + size),
    }
}

pub fn text_block(lines: Vec<Vec<TextSpan>>) -> Block {
    let lines: Vec<TextLine> = lines
        .into_iter()
        .map(|spans| TextLine {
            bbox: spans
                .iter()
                .map(|s| s.bbox)
                .reduce(|a, b| a.union(&b))
                .unwrap_or_default(),
            spans,
        })
        .collect();
    let bbox = lines
        .iter()
        .map(|l| l.bbox)
        .reduce(|a, b| a.union(&b))
        .unwrap_or_default();
    Block::Text(TextBlock { bbox, lines })
}

pub fn image_block() -> Block {
    Block::Image(ImageBlock {
        bbox: Rect::new(0.0, 0.0, 100.0, 100.0),
    })
}

/// Three pages: heading + body, an image-only page, mixed page
pub fn sample_pages() -> Vec<Vec<Block>> {
    vec![
        vec![text_block(vec![
            vec![span(" Hello ", "Arial-BoldMT", 18.0, 72.0, 72.0)],
            vec![
                span("World", "Arial", 11.0, 72.0, 100.0),
                span("  ", "Arial", 11.0, 122.0, 100.0),
            ],
        ])],
        vec![image_block()],
        vec![
            image_block(),
            text_block(vec![vec![
                span("\t\n", "Times-Roman", 12.0, 72.0, 300.0),
                span("Closing", "Times-Bold", 12.0, 72.0, 320.0),
            ]]),
        ],
    ]
}
