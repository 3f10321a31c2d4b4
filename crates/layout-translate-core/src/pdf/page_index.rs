//! Page index newtype bridging the three indexing conventions in play:
//! Rust's `usize`, mupdf's `i32`, and lopdf's 1-based `u32` page numbers.

use std::fmt;

use crate::error::Error;

/// A validated page index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PageIndex(i32);

impl PageIndex {
    /// Validate a page number against the document's page count.
    pub fn try_from_page_num(page_num: usize, total_pages: usize) -> Result<Self, Error> {
        if page_num >= total_pages {
            return Err(Error::InvalidPage {
                page: page_num,
                total: total_pages,
            });
        }

        let index = i32::try_from(page_num).map_err(|_| Error::InvalidPage {
            page: page_num,
            total: total_pages,
        })?;

        Ok(Self(index))
    }

    /// The 1-indexed page number for lopdf's page APIs.
    #[must_use]
    pub const fn as_lopdf_page_number(self) -> u32 {
        // Non-negative by construction; +1 cannot overflow for a real page count
        (self.0 + 1).cast_unsigned()
    }
}

impl From<PageIndex> for i32 {
    fn from(index: PageIndex) -> Self {
        index.0
    }
}

impl fmt::Display for PageIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
