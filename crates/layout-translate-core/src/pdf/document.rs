//! Source document access.
//!
//! `PdfDocument` is the pipeline's view of the document collaborator: ordered
//! pages, per-page raw block descriptors with geometry, a best-effort font
//! lookup, and the mutation surface the page rebuilder commits through.
//!
//! Two libraries back it: mupdf reads structured text (blocks, lines, chars
//! with quads) from the original bytes, and lopdf holds the writable document
//! that reconstruction mutates and `save` serializes.

use std::path::Path;
use std::sync::Arc;

use lopdf::{Document as LoDocument, Object, ObjectId};
use mupdf::{Document as MuDocument, TextPageOptions};

use super::page_index::PageIndex;
use crate::error::{Error, Result};
use crate::fragment::BoundingBox;

/// Raw block descriptor, as read from one page.
///
/// This is the extractor's input: geometry and text straight from the
/// engine, before classification and context enrichment.
#[derive(Debug, Clone)]
pub struct RawBlock {
    /// Position of the block within its page's block sequence
    pub block_index: usize,
    /// Text/non-text discriminator
    pub kind: BlockKind,
    /// Joined text of the block's lines (dehyphenated across line breaks)
    pub text: String,
    /// Union of the block's character boxes; `None` when nothing was placed
    pub bbox: Option<BoundingBox>,
    /// Number of non-empty lines
    pub line_count: usize,
    /// Mean line height in points, for font size estimation
    pub mean_line_height: f32,
}

/// Discriminator for raw page content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Text,
    /// Image or vector content; carries no translatable text
    NonText,
}

/// A paged document opened for translation.
pub struct PdfDocument {
    /// Original bytes, read by the mupdf extraction side
    bytes: Arc<Vec<u8>>,
    /// Writable document, mutated by page reconstruction
    doc: LoDocument,
    page_count: usize,
    /// Content hash (md5 hex) identifying this document for caching
    cache_id: String,
}

impl PdfDocument {
    /// Open a document from bytes.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Result<Self> {
        let bytes = bytes.into();

        let mu_doc = MuDocument::from_bytes(&bytes, "")
            .map_err(|e| Error::DocumentOpen(format!("Failed to parse PDF: {e}")))?;

        let page_count = mu_doc
            .page_count()
            .map_err(|e| Error::DocumentOpen(format!("Failed to get page count: {e}")))?;

        let doc = LoDocument::load_mem(&bytes)
            .map_err(|e| Error::DocumentOpen(format!("Failed to load PDF structure: {e}")))?;

        let cache_id = format!("{:x}", md5::compute(&bytes));

        Ok(Self {
            bytes: Arc::new(bytes),
            doc,
            page_count: usize::try_from(page_count).unwrap_or(0),
            cache_id,
        })
    }

    /// Open a document from a file path.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref()).map_err(|e| {
            Error::DocumentOpen(format!(
                "Failed to read file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_bytes(bytes)
    }

    pub const fn page_count(&self) -> usize {
        self.page_count
    }

    /// Cache key component derived from document content.
    pub fn cache_id(&self) -> &str {
        &self.cache_id
    }

    /// Page size in points (width, height).
    pub fn page_size(&self, page_num: usize) -> Result<(f32, f32)> {
        let page_index = PageIndex::try_from_page_num(page_num, self.page_count)?;

        let doc = self.open_mupdf()?;
        let page = doc.load_page(page_index.into()).map_err(|e| Error::PageText {
            page: page_num,
            reason: format!("Failed to load page: {e}"),
        })?;

        let bounds = page.bounds().map_err(|e| Error::PageText {
            page: page_num,
            reason: format!("Failed to get bounds: {e}"),
        })?;

        Ok((bounds.x1 - bounds.x0, bounds.y1 - bounds.y0))
    }

    /// Read the raw blocks of a page in document order.
    ///
    /// Each mupdf block is a paragraph; its lines are joined with hyphenation
    /// handling. Blocks that place no characters are reported as non-text so
    /// the extractor can skip them.
    pub fn raw_blocks(&self, page_num: usize) -> Result<Vec<RawBlock>> {
        let page_index = PageIndex::try_from_page_num(page_num, self.page_count)?;

        let doc = self.open_mupdf()?;
        let page = doc.load_page(page_index.into()).map_err(|e| Error::PageText {
            page: page_num,
            reason: format!("Failed to load page: {e}"),
        })?;

        let text_page = page
            .to_text_page(TextPageOptions::empty())
            .map_err(|e| Error::PageText {
                page: page_num,
                reason: format!("Failed to get text page: {e}"),
            })?;

        let mut blocks = Vec::new();

        for (block_index, block) in text_page.blocks().enumerate() {
            let mut block_text = String::new();
            let mut block_bbox: Option<BoundingBox> = None;
            let mut line_count: usize = 0;
            let mut line_heights: Vec<f32> = Vec::new();

            for line in block.lines() {
                let mut line_text = String::new();
                let mut line_bbox: Option<BoundingBox> = None;

                for text_char in line.chars() {
                    if let Some(c) = text_char.char() {
                        line_text.push(c);
                    }

                    let char_bbox = BoundingBox::from_quad(&text_char.quad());
                    line_bbox = Some(line_bbox.map_or(char_bbox, |b| b.union(&char_bbox)));
                    block_bbox = Some(block_bbox.map_or(char_bbox, |b| b.union(&char_bbox)));
                }

                let line_trimmed = line_text.trim();
                if line_trimmed.is_empty() {
                    continue;
                }

                if let Some(lb) = line_bbox {
                    line_heights.push(lb.height());
                }
                line_count += 1;

                // Join lines: dehyphenate at line breaks, otherwise space-join
                if block_text.ends_with('-') {
                    block_text.pop();
                } else if !block_text.is_empty() {
                    block_text.push(' ');
                }
                block_text.push_str(line_trimmed);
            }

            let text = block_text.trim().to_string();
            let kind = if text.is_empty() {
                BlockKind::NonText
            } else {
                BlockKind::Text
            };

            #[allow(clippy::cast_precision_loss)]
            let mean_line_height = if line_heights.is_empty() {
                0.0
            } else {
                line_heights.iter().sum::<f32>() / line_heights.len() as f32
            };

            blocks.push(RawBlock {
                block_index,
                kind,
                text,
                bbox: block_bbox,
                line_count,
                mean_line_height,
            });
        }

        Ok(blocks)
    }

    /// Best-effort font lookup for a page.
    ///
    /// Resolves the page's first font resource and returns its BaseFont name.
    /// Any failure along the way yields `None`; the extractor substitutes the
    /// fallback typeface rather than failing the page.
    pub fn page_font(&self, page_num: usize) -> Option<String> {
        let page_id = self.page_id(page_num).ok()?;
        let page_dict = match self.doc.get_object(page_id).ok()? {
            Object::Dictionary(d) => d,
            _ => return None,
        };

        let resources = self.resolve_dict(page_dict.get(b"Resources").ok()?)?;
        let fonts = self.resolve_dict(resources.get(b"Font").ok()?)?;

        let (_, font_obj) = fonts.iter().next()?;
        let font_dict = self.resolve_dict(font_obj)?;

        match font_dict.get(b"BaseFont").ok()? {
            Object::Name(name) => Some(String::from_utf8_lossy(name).into_owned()),
            _ => None,
        }
    }

    /// lopdf object id for a page.
    pub(crate) fn page_id(&self, page_num: usize) -> Result<ObjectId> {
        let page_index = PageIndex::try_from_page_num(page_num, self.page_count)?;
        let pages = self.doc.get_pages();
        pages
            .get(&page_index.as_lopdf_page_number())
            .copied()
            .ok_or(Error::InvalidPage {
                page: page_num,
                total: self.page_count,
            })
    }

    pub(crate) const fn lopdf(&self) -> &LoDocument {
        &self.doc
    }

    pub(crate) fn lopdf_mut(&mut self) -> &mut LoDocument {
        &mut self.doc
    }

    /// Save the (possibly rebuilt) document to `path`.
    ///
    /// With `compress` set, object streams are deflated and unused objects
    /// pruned before writing.
    pub fn save(&mut self, path: impl AsRef<Path>, compress: bool) -> Result<()> {
        if compress {
            self.doc.compress();
        }

        self.doc
            .save(path.as_ref())
            .map_err(|e| Error::DocumentSave(format!("{}: {e}", path.as_ref().display())))?;
        Ok(())
    }

    /// Serialize the document to bytes (used by tests and in-memory flows).
    pub fn to_bytes(&mut self, compress: bool) -> Result<Vec<u8>> {
        if compress {
            self.doc.compress();
        }

        let mut output = Vec::new();
        self.doc
            .save_to(&mut output)
            .map_err(|e| Error::DocumentSave(e.to_string()))?;
        Ok(output)
    }

    fn open_mupdf(&self) -> Result<MuDocument> {
        MuDocument::from_bytes(&self.bytes, "")
            .map_err(|e| Error::DocumentOpen(format!("Failed to open document: {e}")))
    }

    /// Resolve an object that should be a dictionary, following one level of
    /// indirection.
    fn resolve_dict(&self, obj: &Object) -> Option<lopdf::Dictionary> {
        match obj {
            Object::Dictionary(d) => Some(d.clone()),
            Object::Reference(ref_id) => match self.doc.get_object(*ref_id) {
                Ok(Object::Dictionary(d)) => Some(d.clone()),
                _ => None,
            },
            _ => None,
        }
    }
}

impl std::fmt::Debug for PdfDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfDocument")
            .field("page_count", &self.page_count)
            .field("bytes_len", &self.bytes.len())
            .finish()
    }
}
