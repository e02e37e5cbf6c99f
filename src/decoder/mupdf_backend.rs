//! MuPDF-backed decoder
//!
//! Blocks, lines and per-character geometry come from MuPDF's structured
//! text page. Structured text characters carry no font, so each page is also
//! run through a recording device that notes the font of every glyph by its
//! device-space origin. Characters are then grouped into spans wherever the
//! font or size changes along a line.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use ::mupdf::{
    ColorParams, Colorspace, Device, Matrix, NativeDevice, Page, Point, Quad, StrokeState, Text,
    TextPage, TextPageOptions,
};

use super::types::{Block, ImageBlock, Rect, TextBlock, TextLine, TextSpan};
use super::{DecodeError, DecodedDocument, PdfDecoder};

/// Glyph origins are matched at 1/100 of a point
const ORIGIN_PRECISION: f32 = 100.0;

/// Sizes closer than this belong to the same span
const SIZE_TOLERANCE: f32 = 0.01;

const FZ_ERROR_SYSTEM: i32 = mupdf_sys::fz_error_type_FZ_ERROR_SYSTEM as i32;
const FZ_ERROR_LIMIT: i32 = mupdf_sys::fz_error_type_FZ_ERROR_LIMIT as i32;
const FZ_ERROR_UNSUPPORTED: i32 = mupdf_sys::fz_error_type_FZ_ERROR_UNSUPPORTED as i32;
const FZ_ERROR_FORMAT: i32 = mupdf_sys::fz_error_type_FZ_ERROR_FORMAT as i32;
const FZ_ERROR_SYNTAX: i32 = mupdf_sys::fz_error_type_FZ_ERROR_SYNTAX as i32;
const FZ_ERROR_REPAIRED: i32 = mupdf_sys::fz_error_type_FZ_ERROR_REPAIRED as i32;

/// Allocator failures are raised as system errors with these prefixes
const ALLOCATION_FAILURES: &[&str] = &["malloc", "calloc", "realloc"];

/// Decoder backed by MuPDF
#[derive(Debug, Clone, Copy, Default)]
pub struct MuPdfDecoder;

impl PdfDecoder for MuPdfDecoder {
    fn open(&self, path: &Path) -> Result<Box<dyn DecodedDocument>, DecodeError> {
        let path_str = path.to_string_lossy();
        let document = ::mupdf::Document::open(&*path_str)?;
        Ok(Box::new(MuPdfDocument { document }))
    }
}

struct MuPdfDocument {
    document: ::mupdf::Document,
}

impl MuPdfDocument {
    fn load_page(&self, page_index: usize) -> Result<Page, DecodeError> {
        let index = i32::try_from(page_index)
            .map_err(|_| DecodeError::Other(format!("page index {} out of range", page_index)))?;
        Ok(self.document.load_page(index)?)
    }
}

impl DecodedDocument for MuPdfDocument {
    fn needs_password(&self) -> Result<bool, DecodeError> {
        Ok(self.document.needs_password()?)
    }

    fn authenticate(&mut self, password: &str) -> Result<bool, DecodeError> {
        Ok(self.document.authenticate(password)?)
    }

    fn page_count(&self) -> Result<usize, DecodeError> {
        let count = self.document.page_count()?;
        Ok(count.max(0) as usize)
    }

    fn extract_blocks(&self, page_index: usize) -> Result<Vec<Block>, DecodeError> {
        let page = self.load_page(page_index)?;
        let fonts = GlyphFonts::record(&page)?;
        let text_page = page.to_text_page(TextPageOptions::PRESERVE_IMAGES)?;
        Ok(build_blocks(&text_page, &fonts))
    }

    fn extract_text(&self, page_index: usize) -> Result<String, DecodeError> {
        let page = self.load_page(page_index)?;
        Ok(page.to_text()?)
    }

    fn close(self: Box<Self>) -> Result<(), DecodeError> {
        // fz_drop_document runs in mupdf's Drop
        drop(self.document);
        Ok(())
    }
}

impl From<::mupdf::Error> for DecodeError {
    fn from(err: ::mupdf::Error) -> Self {
        match err {
            ::mupdf::Error::MuPdf(e) => classify_code(e.code, e.message),
            ::mupdf::Error::InvalidPdfDocument => {
                DecodeError::Format("invalid pdf document".to_string())
            }
            ::mupdf::Error::Io(e) if e.kind() == std::io::ErrorKind::OutOfMemory => {
                DecodeError::OutOfMemory
            }
            other => DecodeError::Other(other.to_string()),
        }
    }
}

/// Map a MuPDF error code to a decode error
fn classify_code(code: i32, message: String) -> DecodeError {
    match code {
        FZ_ERROR_FORMAT | FZ_ERROR_SYNTAX | FZ_ERROR_UNSUPPORTED | FZ_ERROR_REPAIRED => {
            DecodeError::Format(message)
        }
        FZ_ERROR_LIMIT => DecodeError::OutOfMemory,
        FZ_ERROR_SYSTEM if ALLOCATION_FAILURES.iter().any(|p| message.starts_with(p)) => {
            DecodeError::OutOfMemory
        }
        _ => DecodeError::Other(message),
    }
}

// ============================================================================
// Glyph fonts
// ============================================================================

type OriginKey = (i64, i64);

fn origin_key(point: Point) -> OriginKey {
    (
        (point.x * ORIGIN_PRECISION).round() as i64,
        (point.y * ORIGIN_PRECISION).round() as i64,
    )
}

/// Font name of every glyph drawn on a page, keyed by device-space origin
#[derive(Debug, Default)]
struct GlyphFonts {
    by_origin: HashMap<OriginKey, String>,
}

impl GlyphFonts {
    fn record(page: &Page) -> Result<Self, DecodeError> {
        let mut fonts = GlyphFonts::default();
        {
            let device = Device::from_native(&mut fonts)?;
            page.run(&device, &Matrix::IDENTITY)?;
        }
        Ok(fonts)
    }

    fn add_text(&mut self, text: &Text, ctm: &Matrix) {
        for span in text.spans() {
            let name = font_name(&span.font());
            for item in span.items() {
                let origin = Point::new(item.x(), item.y()).transform(ctm);
                self.by_origin
                    .entry(origin_key(origin))
                    .or_insert_with(|| name.clone());
            }
        }
    }

    fn lookup(&self, origin: Point) -> Option<&str> {
        self.by_origin.get(&origin_key(origin)).map(String::as_str)
    }
}

/// `Font::name` panics on names that are not UTF-8, and this runs inside a
/// MuPDF device callback where unwinding would abort.
fn font_name(font: &::mupdf::Font) -> String {
    panic::catch_unwind(AssertUnwindSafe(|| font.name().to_string())).unwrap_or_default()
}

impl NativeDevice for GlyphFonts {
    fn fill_text(
        &mut self,
        text: &Text,
        ctm: Matrix,
        _color_space: &Colorspace,
        _color: &[f32],
        _alpha: f32,
        _cp: ColorParams,
    ) {
        self.add_text(text, &ctm);
    }

    fn stroke_text(
        &mut self,
        text: &Text,
        _stroke_state: &StrokeState,
        ctm: Matrix,
        _color_space: &Colorspace,
        _color: &[f32],
        _alpha: f32,
        _cp: ColorParams,
    ) {
        self.add_text(text, &ctm);
    }

    fn clip_text(&mut self, text: &Text, ctm: Matrix, _scissor: ::mupdf::Rect) {
        self.add_text(text, &ctm);
    }

    fn clip_stroke_text(
        &mut self,
        text: &Text,
        _stroke_state: &StrokeState,
        ctm: Matrix,
        _scissor: ::mupdf::Rect,
    ) {
        self.add_text(text, &ctm);
    }

    fn ignore_text(&mut self, text: &Text, ctm: Matrix) {
        self.add_text(text, &ctm);
    }
}

// ============================================================================
// Structured text
// ============================================================================

fn to_rect(rect: ::mupdf::Rect) -> Rect {
    Rect::new(rect.x0, rect.y0, rect.x1, rect.y1)
}

fn quad_bounds(quad: &Quad) -> Rect {
    let xs = [quad.ul.x, quad.ur.x, quad.ll.x, quad.lr.x];
    let ys = [quad.ul.y, quad.ur.y, quad.ll.y, quad.lr.y];
    Rect::new(
        xs.iter().copied().fold(f32::INFINITY, f32::min),
        ys.iter().copied().fold(f32::INFINITY, f32::min),
        xs.iter().copied().fold(f32::NEG_INFINITY, f32::max),
        ys.iter().copied().fold(f32::NEG_INFINITY, f32::max),
    )
}

fn build_blocks(text_page: &TextPage, fonts: &GlyphFonts) -> Vec<Block> {
    text_page
        .blocks()
        .map(|block| {
            let bbox = to_rect(block.bounds());
            // Only image blocks carry a transform
            if block.ctm().is_some() {
                return Block::Image(ImageBlock { bbox });
            }
            let lines = block
                .lines()
                .map(|line| {
                    let chars = line.chars().filter_map(|ch| {
                        let c = ch.char()?;
                        Some(PlacedChar {
                            c,
                            font: fonts.lookup(ch.origin()).map(str::to_string),
                            size: ch.size(),
                            bbox: quad_bounds(&ch.quad()),
                        })
                    });
                    TextLine {
                        bbox: to_rect(line.bounds()),
                        spans: group_chars(chars),
                    }
                })
                .collect();
            Block::Text(TextBlock { bbox, lines })
        })
        .collect()
}

/// One structured-text character with its resolved font
#[derive(Debug, Clone)]
struct PlacedChar {
    c: char,
    /// `None` for characters MuPDF synthesized, such as inserted spaces
    font: Option<String>,
    size: f32,
    bbox: Rect,
}

/// Split a line's characters into spans of uniform font and size
///
/// Characters without a recorded font take the font of the one before.
fn group_chars(chars: impl IntoIterator<Item = PlacedChar>) -> Vec<TextSpan> {
    let mut spans: Vec<TextSpan> = Vec::new();

    for ch in chars {
        let font = match ch.font {
            Some(font) => font,
            None => spans.last().map(|s| s.font.clone()).unwrap_or_default(),
        };

        match spans.last_mut() {
            Some(span) if span.font == font && (span.size - ch.size).abs() < SIZE_TOLERANCE => {
                span.text.push(ch.c);
                span.bbox = span.bbox.union(&ch.bbox);
            }
            _ => spans.push(TextSpan {
                text: ch.c.to_string(),
                size: ch.size,
                font,
                bbox: ch.bbox,
            }),
        }
    }

    spans
}
