//! Buffer pool errors.

use super::frame::FrameId;
use crate::error::PagerError;
use crate::page::PageId;

/// Errors surfaced by [`BufferPool`](super::BufferPool) operations.
///
/// Every variant that concerns a specific page carries enough identity
/// (filename, page number, frame index) to diagnose the call site.
/// Directory misses are not errors and never appear here: a fetch miss
/// starts the load path, and unpin/dispose of an uncached page are no-ops.
#[derive(Debug)]
pub enum BufferError {
    /// Every frame is pinned; the request cannot be served.
    Exhausted,

    /// `unpin_page` was called on a cached page whose pin count is already
    /// zero.
    NotPinned {
        file: String,
        page_no: PageId,
        frame_id: FrameId,
    },

    /// The operation requires the page to be unpinned, but it is held
    /// (flush of a file with a pinned page, dispose of a pinned page).
    PagePinned {
        file: String,
        page_no: PageId,
        frame_id: FrameId,
    },

    /// A flush scan found an invalid frame still associated with the file.
    /// Indicates internal corruption; the payload snapshots the offending
    /// descriptor.
    BadBuffer {
        frame_id: FrameId,
        dirty: bool,
        valid: bool,
        ref_bit: bool,
    },

    /// Underlying pager I/O error, propagated unchanged.
    Pager(PagerError),
}

impl std::fmt::Display for BufferError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BufferError::Exhausted => {
                write!(f, "buffer pool exhausted: all frames are pinned")
            }
            BufferError::NotPinned {
                file,
                page_no,
                frame_id,
            } => write!(
                f,
                "page {} of file {:?} (frame {}) is not pinned",
                page_no, file, frame_id
            ),
            BufferError::PagePinned {
                file,
                page_no,
                frame_id,
            } => write!(
                f,
                "page {} of file {:?} is pinned in frame {}",
                page_no, file, frame_id
            ),
            BufferError::BadBuffer {
                frame_id,
                dirty,
                valid,
                ref_bit,
            } => write!(
                f,
                "bad buffer in frame {}: dirty={} valid={} ref={}",
                frame_id, dirty, valid, ref_bit
            ),
            BufferError::Pager(e) => write!(f, "pager error: {}", e),
        }
    }
}

impl std::error::Error for BufferError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BufferError::Pager(e) => Some(e),
            _ => None,
        }
    }
}

impl From<PagerError> for BufferError {
    fn from(e: PagerError) -> Self {
        BufferError::Pager(e)
    }
}
