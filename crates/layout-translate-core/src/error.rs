use thiserror::Error;

/// Unified error type for layout-translate-core
///
/// This enum encompasses all error cases that can occur in the library:
/// - Document operations (opening, reading blocks, rebuilding pages, saving)
/// - Translation operations (API requests, responses, rate limiting)
/// - Configuration loading
/// - General I/O operations
///
/// Per-block extraction problems are not errors: a malformed block is
/// skipped (the extractor returns `None`), never failing its page.
#[derive(Error, Debug)]
pub enum Error {
    // ==========================================================================
    // Document Errors
    // ==========================================================================
    /// Failed to open or parse the input document; fatal for the whole run
    #[error("failed to open document: {0}")]
    DocumentOpen(String),

    /// Invalid page number requested
    #[error("invalid page number {page} (document has {total} pages)")]
    InvalidPage { page: usize, total: usize },

    /// Failed to read a page's text layout
    #[error("failed to read text on page {page}: {reason}")]
    PageText { page: usize, reason: String },

    /// Failure while rebuilding a page with translated content.
    /// Raised before the erase is committed so the page stays untouched.
    #[error("failed to rebuild page {page}: {reason}")]
    Reconstruction { page: usize, reason: String },

    /// Failed to save the output document
    #[error("failed to save document: {0}")]
    DocumentSave(String),

    /// Error from the lopdf library
    #[error("lopdf error: {0}")]
    Lopdf(String),

    // ==========================================================================
    // Translation Errors
    // ==========================================================================
    /// Translation API request failed
    #[error("translation API request failed: {0}")]
    TranslationRequest(String),

    /// Invalid response from translation API
    #[error("invalid translation API response: {0}")]
    TranslationInvalidResponse(String),

    /// Rate limited by translation API
    #[error("translation rate limited{}", retry_after.map(|s| format!(", retry after {s} seconds")).unwrap_or_default())]
    TranslationRateLimited { retry_after: Option<u64> },

    /// Translation request timed out
    #[error("translation request timed out")]
    TranslationTimeout,

    /// Maximum retry attempts exceeded for translation
    #[error("translation failed after maximum retries")]
    TranslationMaxRetriesExceeded,

    // ==========================================================================
    // Configuration Errors
    // ==========================================================================
    /// Failed to load or parse configuration file
    #[error("failed to load config: {0}")]
    ConfigLoad(String),

    // ==========================================================================
    // I/O Errors
    // ==========================================================================
    /// General I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
