//! Core data model: text fragments and their per-page context.
//!
//! A fragment is one unit of extracted, classifiable, translatable text plus
//! its layout metadata. Fragments are created by the extractor, tagged by the
//! classifier, consumed read-only by the translation adapter, and finally
//! paired with a [`TranslatedFragment`] that the page rebuilder renders back
//! into the original bounding box.

/// Maximum trailing context carried between fragments on a page, in characters.
pub const PREV_TEXT_WINDOW: usize = 200;

/// Fallback typeface when the document engine cannot resolve a block font.
pub const FALLBACK_FONT: &str = "Helvetica";

/// Bounding box in page coordinates (top-left origin, y grows downward).
///
/// Invariant: `x0 < x1` and `y0 < y1`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl BoundingBox {
    pub const fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }

    /// Whether the rectangle is properly ordered and non-degenerate.
    pub fn is_valid(&self) -> bool {
        self.x0 < self.x1 && self.y0 < self.y1
    }

    /// Smallest box containing both `self` and `other`.
    pub fn union(&self, other: &Self) -> Self {
        Self {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }

    /// Bounding box of a mupdf quad (4 points defining a quadrilateral).
    pub const fn from_quad(quad: &mupdf::Quad) -> Self {
        let x0 = quad.ul.x.min(quad.ur.x).min(quad.ll.x).min(quad.lr.x);
        let y0 = quad.ul.y.min(quad.ur.y).min(quad.ll.y).min(quad.lr.y);
        let x1 = quad.ul.x.max(quad.ur.x).max(quad.ll.x).max(quad.lr.x);
        let y1 = quad.ul.y.max(quad.ur.y).max(quad.ll.y).max(quad.lr.y);
        Self { x0, y0, x1, y1 }
    }
}

/// Structural category assigned to a fragment by the classifier.
///
/// Classification is a heuristic that only steers translation instructions;
/// it never affects where or whether a fragment is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockType {
    Heading,
    List,
    Body,
}

impl BlockType {
    /// Label used when embedding the type in a prompt.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Heading => "HEADING",
            Self::List => "LIST",
            Self::Body => "BODY",
        }
    }
}

impl std::fmt::Display for BlockType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One unit of translatable content with its layout metadata.
#[derive(Debug, Clone)]
pub struct TextFragment {
    /// Original-language text, non-empty
    pub text: String,
    /// Position on the page
    pub bbox: BoundingBox,
    /// Typeface name recorded from the source block
    pub font: String,
    /// Estimated font size in points
    pub font_size: f32,
    /// Structural category
    pub block_type: BlockType,
    /// Trailing window of previously processed text on the same page
    /// (most recent `PREV_TEXT_WINDOW` characters at most)
    pub prev_text: String,
    /// Page of origin (0-indexed)
    pub page_index: usize,
    /// Block of origin within the page
    pub block_index: usize,
}

/// Outcome of translating one fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranslationStatus {
    /// The service returned a translation
    Translated,
    /// Retries were exhausted; `translated_text` carries the original text
    Fallback,
}

/// A fragment paired with its translation, ready for page reconstruction.
///
/// Consumed exactly once by the rebuilder; the ordered sequence for a page is
/// a 1:1 mapping of the fragments submitted for that page.
#[derive(Debug, Clone)]
pub struct TranslatedFragment {
    pub translated_text: String,
    pub bbox: BoundingBox,
    pub font: String,
    pub font_size: f32,
    pub block_type: BlockType,
    pub block_index: usize,
    pub status: TranslationStatus,
}

impl TranslatedFragment {
    /// Pair a fragment with the text the service returned.
    pub fn from_fragment(fragment: &TextFragment, translated_text: String) -> Self {
        Self {
            translated_text,
            bbox: fragment.bbox,
            font: fragment.font.clone(),
            font_size: fragment.font_size,
            block_type: fragment.block_type,
            block_index: fragment.block_index,
            status: TranslationStatus::Translated,
        }
    }

    /// Fallback pairing: carry the original text, flagged.
    ///
    /// Dropping a failed fragment would break the positional 1:1 invariant
    /// the rebuilder relies on, so exhaustion always produces a fragment.
    pub fn fallback(fragment: &TextFragment) -> Self {
        Self {
            translated_text: fragment.text.clone(),
            bbox: fragment.bbox,
            font: fragment.font.clone(),
            font_size: fragment.font_size,
            block_type: fragment.block_type,
            block_index: fragment.block_index,
            status: TranslationStatus::Fallback,
        }
    }
}

/// Ambient state for one page: geometry plus the running trailing-context
/// accumulator. Owned exclusively by the per-page processing step and never
/// shared across pages.
#[derive(Debug, Clone)]
pub struct PageContext {
    /// Page of origin (0-indexed)
    pub page_index: usize,
    /// Page size in points (width, height)
    pub page_size: (f32, f32),
    /// Running accumulator of processed text on this page
    prev_text: String,
}

impl PageContext {
    pub const fn new(page_index: usize, page_size: (f32, f32)) -> Self {
        Self {
            page_index,
            page_size,
            prev_text: String::new(),
        }
    }

    /// The most recent `PREV_TEXT_WINDOW` characters of accumulated text.
    pub fn window(&self) -> &str {
        tail_chars(&self.prev_text, PREV_TEXT_WINDOW)
    }

    /// Append a processed fragment's text, trimming the accumulator to the
    /// window size so it never grows unboundedly.
    pub fn push_text(&mut self, text: &str) {
        if !self.prev_text.is_empty() {
            self.prev_text.push(' ');
        }
        self.prev_text.push_str(text);
        if self.prev_text.chars().count() > PREV_TEXT_WINDOW {
            self.prev_text = tail_chars(&self.prev_text, PREV_TEXT_WINDOW).to_string();
        }
    }
}

/// Last `n` characters of `s`, respecting char boundaries.
fn tail_chars(s: &str, n: usize) -> &str {
    let count = s.chars().count();
    if count <= n {
        return s;
    }
    let skip = count - n;
    match s.char_indices().nth(skip) {
        Some((idx, _)) => &s[idx..],
        None => s,
    }
}
