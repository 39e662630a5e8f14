//! The buffer pool: pinned page caching with clock replacement.
//!
//! # Example
//!
//! ```
//! use bufpool::buffer::BufferPool;
//! use bufpool::pager::{FileHandle, MemPager};
//!
//! let pool = BufferPool::new(8);
//! let file = FileHandle::new(MemPager::new("example.db"));
//!
//! // Allocate a page, write into it, release it dirty.
//! let page_no = {
//!     let page = pool.new_page(&file).unwrap();
//!     page.write()[0..5].copy_from_slice(b"hello");
//!     page.page_no()
//! };
//! pool.unpin_page(&file, page_no, true).unwrap();
//!
//! // Read it back through the cache.
//! let page = pool.fetch_page(&file, page_no).unwrap();
//! assert_eq!(&page.read()[0..5], b"hello");
//! pool.unpin_page(&file, page_no, false).unwrap();
//!
//! // Push it out to the file.
//! pool.flush_file(&file).unwrap();
//! ```

mod directory;
mod error;
mod frame;
mod guard;
mod pool;
mod replacer;
mod stats;

pub use error::BufferError;
pub use frame::FrameId;
pub use guard::{PageReadGuard, PageWriteGuard, PinnedPage};
pub use pool::BufferPool;
pub use stats::BufferStats;
