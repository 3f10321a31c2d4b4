//! Integration tests for layout-translate-core
//!
//! These tests verify the end-to-end workflow:
//! - PDF loading and block extraction
//! - Whole-document translation with mock backends
//! - Fallback and page-failure isolation
//! - Cache hits across pages
//! - Page reconstruction output

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use layout_translate_core::{
    AppConfig, DocumentTranslator, Error, Lang, PageContext, PdfDocument, Result, TextFragment,
    TranslatedFragment, Translator, translator::TranslatorInfo,
};
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream};

// =============================================================================
// Mock Translators
// =============================================================================

/// Prefixes every translation so output pages are distinguishable from input.
struct PrefixTranslator {
    calls: AtomicUsize,
}

impl PrefixTranslator {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Translator for PrefixTranslator {
    fn info(&self) -> TranslatorInfo {
        TranslatorInfo {
            name: "mock",
            requires_api_key: false,
        }
    }

    async fn translate_fragment(
        &self,
        fragment: &TextFragment,
        _ctx: &PageContext,
        _target: &Lang,
    ) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!("XLATE {}", fragment.text))
    }
}

/// Every fragment exhausts its retries; the pipeline must fall back.
struct ExhaustedTranslator;

#[async_trait]
impl Translator for ExhaustedTranslator {
    fn info(&self) -> TranslatorInfo {
        TranslatorInfo {
            name: "exhausted",
            requires_api_key: false,
        }
    }

    async fn translate_fragment(
        &self,
        _fragment: &TextFragment,
        _ctx: &PageContext,
        _target: &Lang,
    ) -> Result<String> {
        Err(Error::TranslationMaxRetriesExceeded)
    }
}

/// Fails the whole batch for one page, succeeds everywhere else.
struct PageFailTranslator {
    fail_page: usize,
}

#[async_trait]
impl Translator for PageFailTranslator {
    fn info(&self) -> TranslatorInfo {
        TranslatorInfo {
            name: "page-fail",
            requires_api_key: false,
        }
    }

    async fn translate_fragment(
        &self,
        fragment: &TextFragment,
        _ctx: &PageContext,
        _target: &Lang,
    ) -> Result<String> {
        Ok(format!("XLATE {}", fragment.text))
    }

    async fn translate_batch(
        &self,
        fragments: &[TextFragment],
        ctx: &PageContext,
        target: &Lang,
    ) -> Result<Vec<TranslatedFragment>> {
        if ctx.page_index == self.fail_page {
            return Err(Error::TranslationRequest(
                "simulated batch outage".to_string(),
            ));
        }

        let mut out = Vec::with_capacity(fragments.len());
        for fragment in fragments {
            let text = self.translate_fragment(fragment, ctx, target).await?;
            out.push(TranslatedFragment::from_fragment(fragment, text));
        }
        Ok(out)
    }
}

// =============================================================================
// Test Fixtures
// =============================================================================

/// Build a PDF in memory with one Helvetica text run per page.
fn test_pdf(pages: &[&str]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let page_tree_id = doc.new_object_id();

    let font_id = doc.add_object(lopdf::Dictionary::from_iter([
        ("Type", Object::Name(b"Font".to_vec())),
        ("Subtype", Object::Name(b"Type1".to_vec())),
        ("BaseFont", Object::Name(b"Helvetica".to_vec())),
    ]));

    let resources_id = doc.add_object(lopdf::Dictionary::from_iter([(
        "Font",
        Object::Dictionary(lopdf::Dictionary::from_iter([(
            "F1",
            Object::Reference(font_id),
        )])),
    )]));

    let mut kids = Vec::with_capacity(pages.len());
    for page_text in pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 18.into()]),
                Operation::new("Td", vec![72.into(), 700.into()]),
                Operation::new("Tj", vec![Object::string_literal(*page_text)]),
                Operation::new("ET", vec![]),
            ],
        };

        let content_bytes = content.encode().unwrap_or_default();
        let content_id = doc.add_object(Stream::new(lopdf::Dictionary::new(), content_bytes));

        let page_id = doc.add_object(lopdf::Dictionary::from_iter([
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(page_tree_id)),
            ("Contents", Object::Reference(content_id)),
            ("Resources", Object::Reference(resources_id)),
            (
                "MediaBox",
                Object::Array(vec![0.into(), 0.into(), 612.into(), 792.into()]),
            ),
        ]));
        kids.push(Object::Reference(page_id));
    }

    #[allow(clippy::cast_possible_wrap)]
    let page_tree = lopdf::Dictionary::from_iter([
        ("Type", Object::Name(b"Pages".to_vec())),
        ("Count", Object::Integer(pages.len() as i64)),
        ("Kids", Object::Array(kids)),
    ]);
    doc.objects
        .insert(page_tree_id, Object::Dictionary(page_tree));

    let catalog_id = doc.add_object(lopdf::Dictionary::from_iter([
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(page_tree_id)),
    ]));
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut output = Vec::new();
    doc.save_to(&mut output).unwrap_or_default();
    output
}

/// Build a single-page PDF with one text run per entry, spaced far enough
/// apart vertically to extract as distinct blocks.
fn multi_block_test_pdf(runs: &[&str]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let page_tree_id = doc.new_object_id();

    let font_id = doc.add_object(lopdf::Dictionary::from_iter([
        ("Type", Object::Name(b"Font".to_vec())),
        ("Subtype", Object::Name(b"Type1".to_vec())),
        ("BaseFont", Object::Name(b"Helvetica".to_vec())),
    ]));

    let resources_id = doc.add_object(lopdf::Dictionary::from_iter([(
        "Font",
        Object::Dictionary(lopdf::Dictionary::from_iter([(
            "F1",
            Object::Reference(font_id),
        )])),
    )]));

    let mut operations = Vec::new();
    for (i, run) in runs.iter().enumerate() {
        #[allow(clippy::cast_possible_wrap)]
        let y = 700 - (i as i64) * 100;
        operations.extend([
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 18.into()]),
            Operation::new("Td", vec![72.into(), y.into()]),
            Operation::new("Tj", vec![Object::string_literal(*run)]),
            Operation::new("ET", vec![]),
        ]);
    }

    let content_bytes = Content { operations }.encode().unwrap_or_default();
    let content_id = doc.add_object(Stream::new(lopdf::Dictionary::new(), content_bytes));

    let page_id = doc.add_object(lopdf::Dictionary::from_iter([
        ("Type", Object::Name(b"Page".to_vec())),
        ("Parent", Object::Reference(page_tree_id)),
        ("Contents", Object::Reference(content_id)),
        ("Resources", Object::Reference(resources_id)),
        (
            "MediaBox",
            Object::Array(vec![0.into(), 0.into(), 612.into(), 792.into()]),
        ),
    ]));

    let page_tree = lopdf::Dictionary::from_iter([
        ("Type", Object::Name(b"Pages".to_vec())),
        ("Count", Object::Integer(1)),
        ("Kids", Object::Array(vec![Object::Reference(page_id)])),
    ]);
    doc.objects
        .insert(page_tree_id, Object::Dictionary(page_tree));

    let catalog_id = doc.add_object(lopdf::Dictionary::from_iter([
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(page_tree_id)),
    ]));
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut output = Vec::new();
    doc.save_to(&mut output).unwrap_or_default();
    output
}

fn test_config() -> AppConfig {
    AppConfig::default()
}

/// All text mupdf can see on one page of a serialized document.
fn extracted_text(bytes: &[u8], page_num: usize) -> String {
    let doc = PdfDocument::from_bytes(bytes.to_vec()).expect("output should reload");
    doc.raw_blocks(page_num)
        .expect("output page should extract")
        .into_iter()
        .map(|b| b.text)
        .collect::<Vec<_>>()
        .join(" ")
}

// =============================================================================
// Document Loading Tests
// =============================================================================

#[test]
fn test_document_loads_with_page_count() {
    let bytes = test_pdf(&["Hello world on page one", "Second page content here"]);
    let doc = PdfDocument::from_bytes(bytes).expect("test PDF should load");
    assert_eq!(doc.page_count(), 2);
}

#[test]
fn test_invalid_bytes_fail_to_open() {
    assert!(PdfDocument::from_bytes(vec![0, 1, 2, 3]).is_err());
    assert!(PdfDocument::from_bytes(Vec::new()).is_err());
}

#[test]
fn test_raw_blocks_extract_page_text() {
    let bytes = test_pdf(&["Hello world on page one"]);
    let doc = PdfDocument::from_bytes(bytes).expect("test PDF should load");

    let blocks = doc.raw_blocks(0).expect("extraction should succeed");
    let text: String = blocks.iter().map(|b| b.text.as_str()).collect();
    assert!(
        text.contains("Hello world"),
        "expected page text, got: {text:?}"
    );
}

#[test]
fn test_page_font_resolves_base_font() {
    let bytes = test_pdf(&["Some page text here"]);
    let doc = PdfDocument::from_bytes(bytes).expect("test PDF should load");
    assert_eq!(doc.page_font(0).as_deref(), Some("Helvetica"));
}

// =============================================================================
// Whole-Document Translation Tests
// =============================================================================

#[tokio::test]
async fn test_translate_document_rewrites_every_page() {
    let bytes = test_pdf(&["Alpha paragraph of text", "Beta paragraph of text"]);
    let mut doc = PdfDocument::from_bytes(bytes).expect("test PDF should load");

    let translator = DocumentTranslator::with_translator(Arc::new(PrefixTranslator::new()), test_config());
    let report = translator.translate_document(&mut doc, None).await;

    assert_eq!(report.pages_total, 2);
    assert_eq!(report.pages_translated, 2);
    assert!(report.pages_failed.is_empty());
    assert_eq!(report.fallbacks, 0);

    let out = doc.to_bytes(false).expect("output should serialize");
    assert!(out.starts_with(b"%PDF"));

    let page0 = extracted_text(&out, 0);
    let page1 = extracted_text(&out, 1);
    assert!(page0.contains("XLATE Alpha paragraph"), "got: {page0:?}");
    assert!(page1.contains("XLATE Beta paragraph"), "got: {page1:?}");
}

#[tokio::test]
async fn test_fragment_order_preserved_on_page() {
    // Three separated text runs become three blocks; the rebuilt page must
    // keep them in extraction order.
    let bytes = multi_block_test_pdf(&["First block here", "Second block here", "Third block here"]);
    let mut doc = PdfDocument::from_bytes(bytes).expect("test PDF should load");

    let translator = DocumentTranslator::with_translator(Arc::new(PrefixTranslator::new()), test_config());
    let report = translator.translate_document(&mut doc, None).await;
    assert_eq!(report.pages_translated, 1);
    assert!(report.fragments >= 3, "expected three fragments, got {}", report.fragments);

    let out = doc.to_bytes(false).expect("output should serialize");
    let text = extracted_text(&out, 0);

    let first = text.find("XLATE First").expect("first block translated");
    let second = text.find("XLATE Second").expect("second block translated");
    let third = text.find("XLATE Third").expect("third block translated");
    assert!(first < second && second < third, "got: {text:?}");
}

#[tokio::test]
async fn test_layout_markers_survive_the_pipeline() {
    let bytes = test_pdf(&["{HEADING} Introduction with <b>bold</b> words"]);
    let mut doc = PdfDocument::from_bytes(bytes).expect("test PDF should load");

    let translator = DocumentTranslator::with_translator(Arc::new(PrefixTranslator::new()), test_config());
    let report = translator.translate_document(&mut doc, None).await;
    assert_eq!(report.pages_translated, 1);

    let out = doc.to_bytes(false).expect("output should serialize");
    let text = extracted_text(&out, 0);
    assert!(text.contains("{HEADING}"), "got: {text:?}");
    assert!(text.contains("<b>bold</b>"), "got: {text:?}");
}

#[tokio::test]
async fn test_progress_callback_reports_each_page() {
    let bytes = test_pdf(&["Page one body text", "Page two body text", "Page three body text"]);
    let mut doc = PdfDocument::from_bytes(bytes).expect("test PDF should load");

    let seen = Arc::new(AtomicUsize::new(0));
    let seen_cb = Arc::clone(&seen);

    let translator = DocumentTranslator::with_translator(Arc::new(PrefixTranslator::new()), test_config());
    let report = translator
        .translate_document(
            &mut doc,
            Some(Box::new(move |done, total| {
                assert!(done <= total);
                seen_cb.store(done, Ordering::SeqCst);
            })),
        )
        .await;

    assert_eq!(report.pages_total, 3);
    assert_eq!(seen.load(Ordering::SeqCst), 3);
}

// =============================================================================
// Fallback and Failure Isolation Tests
// =============================================================================

#[tokio::test]
async fn test_exhausted_retries_keep_original_text() {
    let bytes = test_pdf(&["Unchanging original sentence"]);
    let mut doc = PdfDocument::from_bytes(bytes).expect("test PDF should load");

    let translator = DocumentTranslator::with_translator(Arc::new(ExhaustedTranslator), test_config());
    let report = translator.translate_document(&mut doc, None).await;

    // The page is still rebuilt, with every fragment carrying original text
    assert_eq!(report.pages_translated, 1);
    assert_eq!(report.fallbacks, report.fragments);
    assert!(report.fallbacks > 0);

    let out = doc.to_bytes(false).expect("output should serialize");
    let text = extracted_text(&out, 0);
    assert!(
        text.contains("Unchanging original sentence"),
        "got: {text:?}"
    );
}

#[tokio::test]
async fn test_failed_page_is_isolated() {
    let bytes = test_pdf(&[
        "Opening page body text",
        "Middle page body text",
        "Closing page body text",
    ]);
    let mut doc = PdfDocument::from_bytes(bytes).expect("test PDF should load");

    let translator = DocumentTranslator::with_translator(
        Arc::new(PageFailTranslator { fail_page: 1 }),
        test_config(),
    );
    let report = translator.translate_document(&mut doc, None).await;

    assert_eq!(report.pages_translated, 2);
    assert_eq!(report.pages_failed, vec![1]);

    let out = doc.to_bytes(false).expect("output should serialize");
    let page0 = extracted_text(&out, 0);
    let page1 = extracted_text(&out, 1);
    let page2 = extracted_text(&out, 2);

    assert!(page0.contains("XLATE Opening page"), "got: {page0:?}");
    assert!(page2.contains("XLATE Closing page"), "got: {page2:?}");

    // The failed page keeps its original content stream, untouched
    assert!(page1.contains("Middle page body text"), "got: {page1:?}");
    assert!(!page1.contains("XLATE"), "got: {page1:?}");
}

// =============================================================================
// Cache Tests
// =============================================================================

#[tokio::test]
async fn test_repeated_text_served_from_cache() {
    // Identical text on both pages: the second page should hit the cache
    let bytes = test_pdf(&["Recurring footer sentence", "Recurring footer sentence"]);
    let mut doc = PdfDocument::from_bytes(bytes).expect("test PDF should load");

    let backend = Arc::new(PrefixTranslator::new());
    let translator = DocumentTranslator::with_translator(Arc::clone(&backend) as Arc<dyn Translator>, test_config());
    let report = translator.translate_document(&mut doc, None).await;

    assert_eq!(report.pages_translated, 2);
    assert_eq!(backend.calls.load(Ordering::SeqCst), 1, "second page should not re-request");
    assert_eq!(report.cache_hits, 1);
}

#[tokio::test]
async fn test_mixed_cache_hits_keep_block_order() {
    let backend = Arc::new(PrefixTranslator::new());
    let translator =
        DocumentTranslator::with_translator(Arc::clone(&backend) as Arc<dyn Translator>, test_config());

    // Warm the cache with the repeated sentence on its own page
    let warm = test_pdf(&["Recurring footer sentence"]);
    let mut warm_doc = PdfDocument::from_bytes(warm).expect("warm PDF should load");
    let report = translator.translate_document(&mut warm_doc, None).await;
    assert_eq!(report.pages_translated, 1);
    assert_eq!(backend.calls.load(Ordering::SeqCst), 1);

    // One page mixing a cached block between two fresh ones
    let bytes = multi_block_test_pdf(&[
        "Opening block text",
        "Recurring footer sentence",
        "Closing block text",
    ]);
    let mut doc = PdfDocument::from_bytes(bytes).expect("test PDF should load");
    let report = translator.translate_document(&mut doc, None).await;

    assert_eq!(report.pages_translated, 1);
    assert_eq!(report.cache_hits, 1);
    assert_eq!(
        backend.calls.load(Ordering::SeqCst),
        3,
        "only the two fresh blocks should reach the backend"
    );

    // Hits and batch results re-interleave back into block order
    let out = doc.to_bytes(false).expect("output should serialize");
    let text = extracted_text(&out, 0);
    let first = text.find("XLATE Opening block").expect("fresh block translated");
    let second = text.find("XLATE Recurring footer").expect("cached block rendered");
    let third = text.find("XLATE Closing block").expect("fresh block translated");
    assert!(first < second && second < third, "got: {text:?}");
}

#[tokio::test]
async fn test_disabled_cache_always_requests() {
    let bytes = test_pdf(&["Recurring footer sentence", "Recurring footer sentence"]);
    let mut doc = PdfDocument::from_bytes(bytes).expect("test PDF should load");

    let mut config = test_config();
    config.cache.enabled = false;

    let backend = Arc::new(PrefixTranslator::new());
    let translator =
        DocumentTranslator::with_translator(Arc::clone(&backend) as Arc<dyn Translator>, config);
    let report = translator.translate_document(&mut doc, None).await;

    assert_eq!(backend.calls.load(Ordering::SeqCst), 2);
    assert_eq!(report.cache_hits, 0);
}

// =============================================================================
// Output Tests
// =============================================================================

#[tokio::test]
async fn test_saved_output_is_valid_pdf() {
    let bytes = test_pdf(&["Document body for saving"]);
    let mut doc = PdfDocument::from_bytes(bytes).expect("test PDF should load");

    let translator = DocumentTranslator::with_translator(Arc::new(PrefixTranslator::new()), test_config());
    let report = translator.translate_document(&mut doc, None).await;
    assert_eq!(report.pages_translated, 1);

    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("out.pdf");
    doc.save(&path, true).expect("save should succeed");

    let saved = std::fs::read(&path).expect("saved file readable");
    assert!(saved.starts_with(b"%PDF"));

    let reloaded = PdfDocument::from_bytes(saved).expect("saved output should reload");
    assert_eq!(reloaded.page_count(), 1);
}
