//! Pager layer errors.

use crate::page::PageId;

/// Errors reported by a [`Pager`](crate::pager::Pager) implementation.
#[derive(Debug)]
pub enum PagerError {
    /// The page has not been allocated in this file, or has been deleted.
    PageNotFound(PageId),

    /// A buffer passed to `read_page`/`write_page` was not exactly
    /// `PAGE_SIZE` bytes.
    InvalidBufferSize {
        /// Expected buffer size (PAGE_SIZE)
        expected: usize,
        /// Actual buffer size provided
        actual: usize,
    },

    /// I/O error from the underlying file system.
    Io(std::io::Error),

    /// The pager has been closed; no further I/O is possible. Carries the
    /// filename for diagnostics.
    Closed(String),

    /// The backing file has an invalid format or size.
    Corrupted(String),
}

impl std::fmt::Display for PagerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PagerError::PageNotFound(page_no) => write!(f, "page {} not found", page_no),
            PagerError::InvalidBufferSize { expected, actual } => {
                write!(f, "invalid buffer size: expected {}, got {}", expected, actual)
            }
            PagerError::Io(e) => write!(f, "I/O error: {}", e),
            PagerError::Closed(name) => write!(f, "file {:?} is closed", name),
            PagerError::Corrupted(msg) => write!(f, "data corruption: {}", msg),
        }
    }
}

impl std::error::Error for PagerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PagerError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for PagerError {
    fn from(e: std::io::Error) -> Self {
        PagerError::Io(e)
    }
}
