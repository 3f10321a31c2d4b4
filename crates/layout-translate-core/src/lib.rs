//! Layout Translate Core Library
//!
//! This library translates the textual content of a PDF while preserving its
//! visual layout:
//! - Structured text extraction with block geometry and typography
//! - Heuristic block classification (heading / list / body)
//! - Translation via OpenAI-compatible APIs, with layout-marker preservation
//! - In-memory caching of fragment translations
//! - Page reconstruction into the original bounding boxes
//!
//! Pages are processed sequentially; block extraction within a page runs on
//! a bounded worker pool. Per-page failures are isolated: a page that cannot
//! be translated keeps its original content and processing continues.

pub mod cache;
pub mod classify;
pub mod config;
pub mod error;
pub mod fragment;
pub mod pdf;
pub mod translator;

pub use cache::{CacheKey, TranslationCache};
pub use classify::{BlockClassifier, HeuristicClassifier, classify};
pub use config::{AppConfig, DEFAULT_TARGET_LANG, DEFAULT_WORKER_COUNT, Lang, TranslatorConfig};
pub use error::{Error, Result};
pub use fragment::{
    BlockType, BoundingBox, PageContext, TextFragment, TranslatedFragment, TranslationStatus,
};
pub use pdf::{FragmentExtractor, PageRebuilder, PdfDocument};
pub use translator::{OpenAiTranslator, Translator, create_translator};

use std::sync::Arc;

use futures::StreamExt;
use tracing::{debug, info, warn};

/// High-level document translator that combines all components
pub struct DocumentTranslator {
    translator: Arc<dyn Translator>,
    extractor: Arc<FragmentExtractor>,
    rebuilder: PageRebuilder,
    cache: TranslationCache,
    config: AppConfig,
}

/// Result of translating a single page
#[derive(Debug, Clone, Default)]
pub struct PageReport {
    /// Fragments rendered onto the page
    pub fragments: usize,
    /// Fragments that kept their original text after exhausted retries
    pub fallbacks: usize,
    /// Fragments resolved from the cache without a request
    pub cache_hits: usize,
}

/// Summary of a whole-document run
#[derive(Debug, Clone, Default)]
pub struct TranslationReport {
    pub pages_total: usize,
    /// Pages rebuilt with at least one translated fragment
    pub pages_translated: usize,
    /// Pages with no translatable text, left untouched
    pub pages_empty: usize,
    /// Pages whose batch failed; original content preserved
    pub pages_failed: Vec<usize>,
    pub fragments: usize,
    pub fallbacks: usize,
    pub cache_hits: usize,
}

impl DocumentTranslator {
    /// Create a new document translator with the given configuration
    pub fn new(config: AppConfig) -> Result<Self> {
        let translator = create_translator(&config.translator)?;
        Ok(Self::assemble(translator, config))
    }

    /// Create with a custom translator backend
    pub fn with_translator(translator: Arc<dyn Translator>, config: AppConfig) -> Self {
        Self::assemble(translator, config)
    }

    /// Replace the block classifier (heuristics are pluggable).
    pub fn with_classifier(mut self, classifier: Arc<dyn BlockClassifier>) -> Self {
        self.extractor = Arc::new(FragmentExtractor::with_classifier(classifier));
        self
    }

    fn assemble(translator: Arc<dyn Translator>, config: AppConfig) -> Self {
        let cache = TranslationCache::new(&config.cache);
        Self {
            translator,
            extractor: Arc::new(FragmentExtractor::new()),
            rebuilder: PageRebuilder::new(),
            cache,
            config,
        }
    }

    pub const fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn translator_info(&self) -> translator::TranslatorInfo {
        self.translator.info()
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Translate a single page in place.
    ///
    /// The page is rebuilt only once all of its translations are available;
    /// on error it is left untouched.
    pub async fn translate_page(&self, doc: &mut PdfDocument, page_num: usize) -> Result<PageReport> {
        let page_size = doc.page_size(page_num)?;
        let mut ctx = PageContext::new(page_num, page_size);

        let raw_blocks = doc.raw_blocks(page_num)?;
        let page_font = doc.page_font(page_num);

        // Fan extraction out over a bounded worker pool; `buffered` yields
        // results in submission order, which downstream indexing relies on.
        let extracted: Vec<Option<TextFragment>> =
            futures::stream::iter(raw_blocks.into_iter().map(|raw| {
                let extractor = Arc::clone(&self.extractor);
                let font = page_font.clone();
                tokio::task::spawn_blocking(move || extractor.extract(&raw, page_num, font.as_deref()))
            }))
            .buffered(self.config.worker_count.max(1))
            .map(|joined| match joined {
                Ok(fragment) => fragment,
                Err(e) => {
                    // A failed extraction worker skips its block, never the page
                    warn!("Extraction task failed on page {page_num}: {e}");
                    None
                }
            })
            .collect()
            .await;

        let mut fragments: Vec<TextFragment> = extracted.into_iter().flatten().collect();
        pdf::assign_prev_text(&mut fragments, &mut ctx);

        if fragments.is_empty() {
            debug!("Page {page_num} has no translatable text");
            return Ok(PageReport::default());
        }

        info!(
            "Translating page {} ({} fragments) with {}",
            page_num,
            fragments.len(),
            self.translator.name()
        );

        let (translated, cache_hits) = self.translate_with_cache(&fragments, &ctx).await?;

        let fallbacks = translated
            .iter()
            .filter(|t| t.status == TranslationStatus::Fallback)
            .count();

        self.rebuilder.rebuild_page(doc, page_num, &translated)?;

        Ok(PageReport {
            fragments: translated.len(),
            fallbacks,
            cache_hits,
        })
    }

    /// Translate every page of the document in order.
    ///
    /// Page failures are absorbed: the failed page keeps its original
    /// content, a warning is logged, and subsequent pages still run. The
    /// returned report says what happened to each class of page.
    pub async fn translate_document(
        &self,
        doc: &mut PdfDocument,
        progress_callback: Option<Box<dyn Fn(usize, usize) + Send>>,
    ) -> TranslationReport {
        let total_pages = doc.page_count();
        let mut report = TranslationReport {
            pages_total: total_pages,
            ..Default::default()
        };

        for page_num in 0..total_pages {
            match self.translate_page(doc, page_num).await {
                Ok(page) if page.fragments == 0 => report.pages_empty += 1,
                Ok(page) => {
                    report.pages_translated += 1;
                    report.fragments += page.fragments;
                    report.fallbacks += page.fallbacks;
                    report.cache_hits += page.cache_hits;
                }
                Err(e) => {
                    warn!("Page {page_num} left untranslated: {e}");
                    report.pages_failed.push(page_num);
                }
            }

            if let Some(ref callback) = progress_callback {
                callback(page_num + 1, total_pages);
            }
        }

        report
    }

    /// Resolve a page's fragments against the cache, send the misses as one
    /// ordered batch, and re-interleave so the output matches input order.
    async fn translate_with_cache(
        &self,
        fragments: &[TextFragment],
        ctx: &PageContext,
    ) -> Result<(Vec<TranslatedFragment>, usize)> {
        let target = &self.config.target_lang;
        let translator_name = self.translator.name();
        let model = &self.config.translator.model;

        let mut slots: Vec<Option<TranslatedFragment>> = vec![None; fragments.len()];
        let mut misses: Vec<usize> = Vec::new();
        let mut keys: Vec<CacheKey> = Vec::with_capacity(fragments.len());

        for (i, fragment) in fragments.iter().enumerate() {
            let key = CacheKey::from_fragment(&fragment.text, translator_name, model, target);
            if let Some(cached) = self.cache.get(&key).await {
                slots[i] = Some(TranslatedFragment::from_fragment(fragment, cached));
            } else {
                misses.push(i);
            }
            keys.push(key);
        }

        let cache_hits = fragments.len() - misses.len();

        if !misses.is_empty() {
            let pending: Vec<TextFragment> =
                misses.iter().map(|&i| fragments[i].clone()).collect();

            let translated = self
                .translator
                .translate_batch(&pending, ctx, target)
                .await?;

            // The 1:1 order-preserving contract is what lets us index back
            if translated.len() != pending.len() {
                return Err(Error::TranslationInvalidResponse(format!(
                    "batch returned {} fragments for {} inputs",
                    translated.len(),
                    pending.len()
                )));
            }

            for (&i, item) in misses.iter().zip(translated) {
                if item.status == TranslationStatus::Translated {
                    self.cache
                        .insert(&keys[i], item.translated_text.clone())
                        .await;
                }
                slots[i] = Some(item);
            }
        }

        // Every slot is filled: cache hits above, batch results here
        let translated = slots.into_iter().flatten().collect::<Vec<_>>();
        debug_assert_eq!(translated.len(), fragments.len());

        Ok((translated, cache_hits))
    }
}
