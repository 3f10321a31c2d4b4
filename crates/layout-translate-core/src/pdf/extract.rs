//! Block extraction: raw block descriptors -> text fragments.
//!
//! Extraction of distinct blocks is embarrassingly parallel; each call here
//! touches only its own `RawBlock`. The trailing-context enrichment that
//! needs page order runs as a separate sequential pass over the collected
//! fragments, with the accumulator passed in explicitly.

use std::sync::Arc;

use tracing::debug;

use super::document::{BlockKind, RawBlock};
use crate::classify::{BlockClassifier, HeuristicClassifier};
use crate::fragment::{FALLBACK_FONT, PageContext, TextFragment};

/// Minimum text length for a fragment; shorter blocks are page-number-like
/// artifacts and are skipped.
const MIN_TEXT_LEN: usize = 3;

/// Font size estimation: mupdf line heights run slightly under the visual
/// size, so scale up and clamp to a sane range.
const FONT_SIZE_SCALE: f32 = 1.18;
const FONT_SIZE_MIN: f32 = 6.0;
const FONT_SIZE_MAX: f32 = 36.0;

/// Turns raw blocks into classified text fragments.
pub struct FragmentExtractor {
    classifier: Arc<dyn BlockClassifier>,
}

impl FragmentExtractor {
    pub fn new() -> Self {
        Self {
            classifier: Arc::new(HeuristicClassifier),
        }
    }

    /// Use a custom classifier in place of the text heuristic.
    pub fn with_classifier(classifier: Arc<dyn BlockClassifier>) -> Self {
        Self { classifier }
    }

    /// Convert one raw block into a fragment.
    ///
    /// Returns `None` for non-text blocks and for malformed ones (missing
    /// geometry, empty or near-empty text); both are skipped, never fatal.
    /// A missing font degrades to the fallback typeface.
    pub fn extract(
        &self,
        raw: &RawBlock,
        page_index: usize,
        page_font: Option<&str>,
    ) -> Option<TextFragment> {
        if raw.kind != BlockKind::Text {
            return None;
        }

        let text = raw.text.trim();
        if text.len() < MIN_TEXT_LEN {
            return None;
        }

        let bbox = raw.bbox?;
        if !bbox.is_valid() {
            debug!(
                "Skipping block {} on page {}: degenerate bbox",
                raw.block_index, page_index
            );
            return None;
        }

        let font = page_font
            .filter(|f| !f.is_empty())
            .unwrap_or(FALLBACK_FONT)
            .to_string();

        let font_size = estimate_font_size(raw, bbox.height());
        let block_type = self.classifier.classify(text);

        Some(TextFragment {
            text: text.to_string(),
            bbox,
            font,
            font_size,
            block_type,
            prev_text: String::new(),
            page_index,
            block_index: raw.block_index,
        })
    }
}

impl Default for FragmentExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Sequential enrichment pass: give each fragment the trailing window of
/// text processed before it on the page, feeding the accumulator as we go.
pub fn assign_prev_text(fragments: &mut [TextFragment], ctx: &mut PageContext) {
    for fragment in fragments {
        fragment.prev_text = ctx.window().to_string();
        ctx.push_text(&fragment.text);
    }
}

#[allow(clippy::cast_precision_loss)]
fn estimate_font_size(raw: &RawBlock, bbox_height: f32) -> f32 {
    let base = if raw.mean_line_height > 0.0 {
        raw.mean_line_height
    } else {
        bbox_height / raw.line_count.max(1) as f32
    };
    (base * FONT_SIZE_SCALE).clamp(FONT_SIZE_MIN, FONT_SIZE_MAX)
}
