mod document;
mod extract;
mod font;
mod page_index;
mod rebuild;

pub use document::{BlockKind, PdfDocument, RawBlock};
pub use extract::{FragmentExtractor, assign_prev_text};
pub use font::BaseFont;
pub use page_index::PageIndex;
pub use rebuild::PageRebuilder;
