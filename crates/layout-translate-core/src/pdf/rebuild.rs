//! Page reconstruction: erase original content, render translated fragments.
//!
//! # Coordinate System
//!
//! Extraction coordinates come from mupdf with a **top-left origin** (y grows
//! downward); PDF content streams use a **bottom-left origin** (y grows
//! upward). Conversion is `pdf_y = page_height - mupdf_y`.
//!
//! # Commit discipline
//!
//! The whole replacement content stream is assembled, and the page object
//! validated, before the page is touched. The mutation itself (swap the
//! page's `Contents`, extend its font resources) cannot fail, so a page is
//! either fully rebuilt or left untouched — never half-erased.
//!
//! # Known limitations
//!
//! Replacing the page content destroys images and vector art along with the
//! original text (whole-page erase-and-rewrite, kept from the source
//! behavior). Translated text that overflows its bounding box at the
//! estimated font size is not reflowed.

use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use tracing::debug;

use super::document::PdfDocument;
use super::font::{BaseFont, encode_pdf_literal};
use crate::error::{Error, Result};
use crate::fragment::TranslatedFragment;

/// Line height as a multiple of font size.
const LINE_HEIGHT_FACTOR: f32 = 1.25;

/// Rebuilds pages in place with translated content.
#[derive(Debug, Clone, Copy, Default)]
pub struct PageRebuilder;

/// Pre-calculated render data for one fragment.
struct RenderBlock {
    font: BaseFont,
    font_size: f32,
    text_x: f32,
    /// Baseline of the first line, PDF coordinates
    text_start_y: f32,
    line_height: f32,
    lines: Vec<String>,
}

impl RenderBlock {
    fn from_fragment(fragment: &TranslatedFragment, page_height: f32) -> Self {
        let font = BaseFont::from_typeface(&fragment.font);
        let font_size = fragment.font_size;

        // Wrap to the original box width so text lands in the same slot
        let char_width = font_size * font.char_width_factor();
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let max_chars = (fragment.bbox.width() / char_width).floor().max(1.0) as usize;
        let lines = word_wrap(&fragment.translated_text, max_chars);

        // First baseline sits one font size below the box top (converted)
        let text_start_y = page_height - fragment.bbox.y0 - font_size;

        Self {
            font,
            font_size,
            text_x: fragment.bbox.x0,
            text_start_y,
            line_height: font_size * LINE_HEIGHT_FACTOR,
            lines,
        }
    }
}

impl PageRebuilder {
    pub const fn new() -> Self {
        Self
    }

    /// Replace a page's content with its translated fragments.
    ///
    /// Must only be called once the page's translations are fully available;
    /// an empty fragment list is a no-op so a page is never erased without
    /// replacement content.
    pub fn rebuild_page(
        &self,
        doc: &mut PdfDocument,
        page_num: usize,
        fragments: &[TranslatedFragment],
    ) -> Result<()> {
        if fragments.is_empty() {
            debug!("No fragments for page {page_num}, leaving page untouched");
            return Ok(());
        }

        let page_id = doc.page_id(page_num)?;
        let media_box = get_media_box(doc.lopdf(), page_id)?;

        for fragment in fragments {
            if !fragment.bbox.is_valid() {
                return Err(Error::Reconstruction {
                    page: page_num,
                    reason: format!("degenerate bbox for block {}", fragment.block_index),
                });
            }
        }

        let content = build_page_content(fragments, &media_box);

        // Validate the page object is mutable before committing anything
        match doc.lopdf().get_object(page_id) {
            Ok(Object::Dictionary(_)) => {}
            Ok(_) => {
                return Err(Error::Reconstruction {
                    page: page_num,
                    reason: "page object is not a dictionary".to_string(),
                });
            }
            Err(e) => {
                return Err(Error::Reconstruction {
                    page: page_num,
                    reason: format!("failed to load page object: {e}"),
                });
            }
        }

        let fonts_used: Vec<BaseFont> = {
            let mut fonts: Vec<BaseFont> = fragments
                .iter()
                .map(|f| BaseFont::from_typeface(&f.font))
                .collect();
            fonts.sort_by_key(|f| f.resource_key());
            fonts.dedup();
            fonts
        };

        // Commit point: everything below is infallible mutation
        commit_page_content(doc.lopdf_mut(), page_id, content, &fonts_used);

        debug!(
            "Rebuilt page {} with {} fragments",
            page_num,
            fragments.len()
        );
        Ok(())
    }
}

/// Build the full replacement content stream for a page.
///
/// Phase 1 covers the entire page with white (the erase); phase 2 renders
/// every fragment's text into its original bounding box.
fn build_page_content(fragments: &[TranslatedFragment], media_box: &[f32; 4]) -> String {
    use std::fmt::Write;

    let page_width = media_box[2] - media_box[0];
    let page_height = media_box[3] - media_box[1];

    let blocks: Vec<RenderBlock> = fragments
        .iter()
        .map(|f| RenderBlock::from_fragment(f, page_height))
        .collect();

    let mut content = String::new();
    content.push_str("q\n");

    // PHASE 1: full-page white rectangle
    content.push_str("1 1 1 rg\n");
    let _ = writeln!(
        content,
        "{} {} {page_width} {page_height} re f",
        media_box[0], media_box[1]
    );

    // PHASE 2: translated text, black fill
    content.push_str("0 0 0 rg\n0 Tr\n");
    for block in &blocks {
        for (j, line) in block.lines.iter().enumerate() {
            #[allow(clippy::cast_precision_loss)]
            let y = block.text_start_y - (j as f32 * block.line_height);

            content.push_str("BT\n");
            let _ = writeln!(content, "/{} {} Tf", block.font.resource_key(), block.font_size);
            let _ = writeln!(content, "{} {} Td", block.text_x, y);
            let _ = writeln!(content, "({}) Tj", encode_pdf_literal(line));
            content.push_str("ET\n");
        }
    }

    content.push_str("Q\n");
    content
}

/// Swap in the new content stream and register the base fonts it uses.
fn commit_page_content(
    doc: &mut Document,
    page_id: ObjectId,
    content: String,
    fonts: &[BaseFont],
) {
    let stream = Stream::new(Dictionary::new(), content.into_bytes());
    let content_id = doc.add_object(Object::Stream(stream));

    let mut font_ids = Vec::with_capacity(fonts.len());
    for font in fonts {
        let dict = Dictionary::from_iter([
            ("Type", Object::Name(b"Font".to_vec())),
            ("Subtype", Object::Name(b"Type1".to_vec())),
            ("BaseFont", Object::Name(font.pdf_name().as_bytes().to_vec())),
            ("Encoding", Object::Name(b"WinAnsiEncoding".to_vec())),
        ]);
        font_ids.push((font.resource_key(), doc.add_object(Object::Dictionary(dict))));
    }

    let mut resources = resolve_resources(doc, page_id);
    let mut font_dict = match resources.get(b"Font") {
        Ok(Object::Dictionary(d)) => d.clone(),
        Ok(Object::Reference(ref_id)) => match doc.get_object(*ref_id) {
            Ok(Object::Dictionary(d)) => d.clone(),
            _ => Dictionary::new(),
        },
        _ => Dictionary::new(),
    };
    for (key, id) in font_ids {
        font_dict.set(key, Object::Reference(id));
    }
    resources.set("Font", Object::Dictionary(font_dict));

    if let Ok(Object::Dictionary(page_dict)) = doc.get_object_mut(page_id) {
        // Replacing Contents is the erase: the original stream is unreferenced
        page_dict.set("Contents", Object::Reference(content_id));
        page_dict.set("Resources", Object::Dictionary(resources));
    }
}

/// Resolve a page's Resources dictionary, following references and
/// inheritance from parent Pages nodes (bounded walk for malformed files).
fn resolve_resources(doc: &Document, page_id: ObjectId) -> Dictionary {
    fn dict_of(doc: &Document, obj: &Object) -> Option<Dictionary> {
        match obj {
            Object::Dictionary(d) => Some(d.clone()),
            Object::Reference(ref_id) => match doc.get_object(*ref_id) {
                Ok(Object::Dictionary(d)) => Some(d.clone()),
                _ => None,
            },
            _ => None,
        }
    }

    let mut current = match doc.get_object(page_id) {
        Ok(Object::Dictionary(d)) => Some(d.clone()),
        _ => None,
    };

    for _ in 0..10 {
        let Some(dict) = current else { break };

        if let Ok(res_obj) = dict.get(b"Resources")
            && let Some(resources) = dict_of(doc, res_obj)
        {
            return resources;
        }

        current = match dict.get(b"Parent") {
            Ok(Object::Reference(parent_id)) => match doc.get_object(*parent_id) {
                Ok(Object::Dictionary(d)) => Some(d.clone()),
                _ => None,
            },
            _ => None,
        };
    }

    Dictionary::new()
}

/// Get the media box for a page, walking up to parent nodes when inherited.
fn get_media_box(doc: &Document, page_id: ObjectId) -> Result<[f32; 4]> {
    fn lookup(doc: &Document, obj: &Object, depth: usize) -> Option<[f32; 4]> {
        if depth == 0 {
            return None;
        }

        let dict = match obj {
            Object::Dictionary(d) => d,
            _ => return None,
        };

        if let Ok(Object::Array(arr)) = dict.get(b"MediaBox")
            && arr.len() == 4
        {
            let values: Vec<f32> = arr
                .iter()
                .filter_map(|o| match o {
                    #[allow(clippy::cast_precision_loss)]
                    Object::Integer(i) => Some(*i as f32),
                    Object::Real(r) => Some(*r),
                    _ => None,
                })
                .collect();

            if values.len() == 4 {
                return Some([values[0], values[1], values[2], values[3]]);
            }
        }

        if let Ok(Object::Reference(parent_id)) = dict.get(b"Parent")
            && let Ok(parent) = doc.get_object(*parent_id)
        {
            return lookup(doc, parent, depth - 1);
        }

        None
    }

    let page_obj = doc
        .get_object(page_id)
        .map_err(|e| Error::Lopdf(format!("Failed to get page object: {e}")))?;

    // Default to US Letter when no MediaBox is declared anywhere
    Ok(lookup(doc, page_obj, 10).unwrap_or([0.0, 0.0, 612.0, 792.0]))
}

/// Word wrap text to fit within `max_chars` per line.
fn word_wrap(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current_line = String::new();

    for word in text.split_whitespace() {
        if current_line.is_empty() {
            current_line = word.to_string();
        } else if current_line.chars().count() + 1 + word.chars().count() <= max_chars {
            current_line.push(' ');
            current_line.push_str(word);
        } else {
            lines.push(current_line);
            current_line = word.to_string();
        }
    }

    if !current_line.is_empty() {
        lines.push(current_line);
    }

    if lines.is_empty() {
        lines.push(String::new());
    }

    lines
}
