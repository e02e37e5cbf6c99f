//! Layout tree produced by a decoder for one page
//!
//! ```text
//! Page ─┬─ Block::Text ─┬─ TextLine ─┬─ TextSpan
//!       │               │            └─ TextSpan
//!       │               └─ TextLine ── TextSpan
//!       └─ Block::Image
//! ```

/// Axis-aligned rectangle in page coordinate units
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl Rect {
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// Smallest rectangle containing both
    pub fn union(&self, other: &Rect) -> Rect {
        Rect::new(
            self.x0.min(other.x0),
            self.y0.min(other.y0),
            self.x1.max(other.x1),
            self.y1.max(other.y1),
        )
    }

    /// `[left, top, right, bottom]`
    pub fn to_array(&self) -> [f32; 4] {
        [self.x0, self.y0, self.x1, self.y1]
    }
}

/// A decoder-identified region of a page
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Text(TextBlock),
    /// Images, figures and anything else without text lines
    Image(ImageBlock),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextBlock {
    pub bbox: Rect,
    pub lines: Vec<TextLine>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageBlock {
    pub bbox: Rect,
}

/// Spans sharing a baseline
#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    pub bbox: Rect,
    pub spans: Vec<TextSpan>,
}

/// Run of text in a single font and size
#[derive(Debug, Clone, PartialEq)]
pub struct TextSpan {
    /// Raw text, whitespace untouched
    pub text: String,
    /// Rendered font size
    pub size: f32,
    /// Font name as reported by the decoder (e.g. "Arial-BoldMT")
    pub font: String,
    pub bbox: Rect,
}
