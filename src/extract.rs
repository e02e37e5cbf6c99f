//! Span extraction
//!
//! Flattens each page's block/line/span tree into `TextSpanRecord`s, in
//! exactly the order the decoder yields them.

use serde::Serialize;

use crate::decoder::{Block, TextSpan};
use crate::error::{DecodeStage, Result};
use crate::session::ActiveSession;

/// Font-name fragment marking a bold face (case-sensitive)
const BOLD_MARKER: &str = "Bold";

/// One span of text with its layout metadata
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextSpanRecord {
    /// 0-based page index
    pub page: u32,
    /// Trimmed, never empty
    pub text: String,
    pub font_size: f32,
    pub bold: bool,
    /// `[left, top, right, bottom]`
    pub bbox: [f32; 4],
}

impl TextSpanRecord {
    /// Build a record from a decoder span; `None` for whitespace-only text
    pub fn from_span(page: u32, span: &TextSpan) -> Option<Self> {
        let text = span.text.trim();
        if text.is_empty() {
            return None;
        }

        Some(Self {
            page,
            text: text.to_string(),
            font_size: span.size,
            bold: is_bold(&span.font),
            bbox: span.bbox.to_array(),
        })
    }
}

/// Bold when the font name contains "Bold", e.g. "Arial-BoldMT"
pub fn is_bold(font_name: &str) -> bool {
    font_name.contains(BOLD_MARKER)
}

/// Append the records of one page's blocks
fn collect_page(page: u32, blocks: &[Block], out: &mut Vec<TextSpanRecord>) {
    for block in blocks {
        let Block::Text(text_block) = block else {
            continue;
        };

        for line in &text_block.lines {
            out.extend(
                line.spans
                    .iter()
                    .filter_map(|span| TextSpanRecord::from_span(page, span)),
            );
        }
    }
}

/// Extract every text span of an open document
///
/// All-or-nothing: a failure on any page discards what was collected.
pub fn extract_spans(session: &ActiveSession) -> Result<Vec<TextSpanRecord>> {
    let document = session.document()?;
    let mut records = Vec::new();

    for page_index in 0..session.page_count() {
        let blocks = document
            .extract_blocks(page_index)
            .map_err(|e| e.at_stage(DecodeStage::Extract))?;
        collect_page(page_index as u32, &blocks, &mut records);
    }

    tracing::debug!(
        "Extracted {} spans from {} pages",
        records.len(),
        session.page_count()
    );
    Ok(records)
}

/// Plain text of every page, one string per page
pub fn extract_page_texts(session: &ActiveSession) -> Result<Vec<String>> {
    let document = session.document()?;

    (0..session.page_count())
        .map(|page_index| {
            document
                .extract_text(page_index)
                .map_err(|e| e.at_stage(DecodeStage::Extract))
        })
        .collect()
}
