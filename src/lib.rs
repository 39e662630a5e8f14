//! Buffer pool manager for page-based storage engines.
//!
//! This crate is the caching layer that sits between per-file pagers
//! (page-granular file I/O, the [`pager`] module) and access-method
//! clients. The [`buffer::BufferPool`] owns a fixed set of page frames,
//! maps (file, page number) identities onto them, enforces a pinning
//! discipline, and recycles frames with a clock (second-chance) sweep,
//! writing modified pages back before a frame is reused or the pool is
//! torn down.

pub mod buffer;
pub mod error;
pub mod page;
pub mod pager;

pub use buffer::{BufferError, BufferPool, BufferStats, FrameId, PinnedPage};
pub use error::PagerError;
pub use page::{PAGE_SIZE, PageData, PageId};
pub use pager::{FileHandle, FilePager, MemPager, Pager};
