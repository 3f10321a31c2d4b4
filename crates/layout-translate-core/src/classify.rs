//! Heuristic block classification.
//!
//! String matching is a coarse stand-in for true layout analysis. The
//! classifier is kept behind a trait so a richer model (font-size or
//! position based) can replace it without touching the rest of the pipeline.

use crate::fragment::BlockType;

/// Capability: assign a structural category to a block's text.
pub trait BlockClassifier: Send + Sync {
    fn classify(&self, text: &str) -> BlockType;
}

/// Default text-content classifier.
///
/// Rules, first match wins:
/// 1. contains a digit AND shorter than 30 characters -> List
/// 2. lower-cased text contains "section" or "chapter" -> Heading
/// 3. otherwise -> Body
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicClassifier;

impl BlockClassifier for HeuristicClassifier {
    fn classify(&self, text: &str) -> BlockType {
        classify(text)
    }
}

/// Pure classification function; see [`HeuristicClassifier`] for the rules.
pub fn classify(text: &str) -> BlockType {
    if text.chars().any(|c| c.is_ascii_digit()) && text.chars().count() < 30 {
        return BlockType::List;
    }

    let lowered = text.to_lowercase();
    if lowered.contains("section") || lowered.contains("chapter") {
        return BlockType::Heading;
    }

    BlockType::Body
}
