use async_trait::async_trait;
use tracing::warn;

use crate::config::Lang;
use crate::error::Result;
use crate::fragment::{PageContext, TextFragment, TranslatedFragment};

/// Information about a translator backend
#[derive(Debug, Clone)]
pub struct TranslatorInfo {
    /// Human-readable name
    pub name: &'static str,
    /// Whether this translator requires an API key
    pub requires_api_key: bool,
}

/// Trait for translation backends.
///
/// A backend translates one fragment at a time; `translate_batch` drives a
/// page's worth of fragments through it. Implementations own their retry
/// policy — by the time `translate_fragment` returns an error, retries are
/// exhausted and the batch falls back for that fragment.
#[async_trait]
pub trait Translator: Send + Sync {
    /// Get information about this translator
    fn info(&self) -> TranslatorInfo;

    /// Get the translator name (convenience method)
    fn name(&self) -> &'static str {
        self.info().name
    }

    /// Translate a single fragment into the target language, preserving the
    /// layout markers embedded in its text.
    async fn translate_fragment(
        &self,
        fragment: &TextFragment,
        ctx: &PageContext,
        target: &Lang,
    ) -> Result<String>;

    /// Translate an ordered batch of fragments.
    ///
    /// Returns exactly one `TranslatedFragment` per input, in input order —
    /// a hard invariant the page rebuilder indexes on. A fragment whose
    /// translation fails (after the backend's own retries) is not dropped;
    /// it comes back as a flagged fallback carrying its original text.
    async fn translate_batch(
        &self,
        fragments: &[TextFragment],
        ctx: &PageContext,
        target: &Lang,
    ) -> Result<Vec<TranslatedFragment>> {
        let mut translated = Vec::with_capacity(fragments.len());

        for fragment in fragments {
            match self.translate_fragment(fragment, ctx, target).await {
                Ok(text) => {
                    translated.push(TranslatedFragment::from_fragment(fragment, text));
                }
                Err(e) => {
                    warn!(
                        "Fragment {}:{} failed translation, keeping original text: {e}",
                        fragment.page_index, fragment.block_index
                    );
                    translated.push(TranslatedFragment::fallback(fragment));
                }
            }
        }

        Ok(translated)
    }

    /// Check if the translator is available (e.g., API key configured)
    fn is_available(&self) -> bool {
        true
    }
}
