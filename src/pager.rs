//! Per-file page I/O backends.
//!
//! A [`Pager`] performs page-granular I/O against one open file. The buffer
//! pool consumes this trait and nothing else about the file format; the two
//! implementations here ([`FilePager`], [`MemPager`]) cover persistent use
//! and tests respectively.

mod file;
mod memory;

pub use file::FilePager;
pub use memory::MemPager;

use std::sync::Arc;

use crate::error::PagerError;
use crate::page::PageId;

/// Page-granular I/O over one open file.
///
/// All I/O is performed through caller-owned buffers of exactly `PAGE_SIZE`
/// bytes; the pager never caches. Page numbers are assigned by
/// `allocate_page` (densely, reusing numbers released by `delete_page`) and
/// a page's identity travels with every call as its `PageId`.
///
/// # Thread safety
///
/// Implementations must be `Send + Sync`. The buffer pool serializes its own
/// calls under its state lock, but a pager may also be driven directly by
/// other components.
pub trait Pager: Send + Sync {
    /// Reads a page into a caller-provided buffer.
    ///
    /// # Errors
    ///
    /// `PageNotFound` if the page was never allocated or has been deleted;
    /// `InvalidBufferSize` if `buf.len() != PAGE_SIZE`; `Closed` after
    /// `close`.
    fn read_page(&self, page_no: PageId, buf: &mut [u8]) -> Result<(), PagerError>;

    /// Writes a page from a caller-provided buffer.
    ///
    /// Same error contract as [`read_page`](Pager::read_page).
    fn write_page(&self, page_no: PageId, buf: &[u8]) -> Result<(), PagerError>;

    /// Allocates a new, logically zero-filled page and returns its number.
    ///
    /// Numbers released by `delete_page` are reused before the file grows.
    fn allocate_page(&self) -> Result<PageId, PagerError>;

    /// Removes a page from the file. Subsequent reads and writes of the
    /// page fail with `PageNotFound` until the number is reallocated.
    fn delete_page(&self, page_no: PageId) -> Result<(), PagerError>;

    /// Number of live (allocated, not deleted) pages.
    fn page_count(&self) -> usize;

    /// Name of the backing file, used only in diagnostics and errors.
    fn filename(&self) -> &str;

    /// Whether the file is still open. The buffer pool checks this during
    /// shutdown to decide whether a dirty page can still be written back.
    fn is_open(&self) -> bool;

    /// Flushes pending writes to durable storage. No-op for in-memory
    /// pagers.
    fn sync_all(&self) -> Result<(), PagerError>;
}

/// Identity key for an open file, used by the buffer pool's directory.
///
/// Derived from the address of the handle's shared allocation: stable for
/// the lifetime of the allocation, and unique among live handles. The pool
/// stores a `FileHandle` in every valid frame, which keeps the allocation
/// (and therefore the key) alive for as long as any directory entry refers
/// to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct FileKey(usize);

/// Shared handle to an open [`Pager`].
///
/// Equality is identity: two handles are equal iff they refer to the same
/// open file object. Two pagers opened on the same path are distinct files
/// as far as the buffer pool is concerned.
#[derive(Clone)]
pub struct FileHandle(Arc<dyn Pager>);

impl FileHandle {
    /// Wraps a pager in a shared handle.
    pub fn new<P: Pager + 'static>(pager: P) -> Self {
        Self(Arc::new(pager))
    }

    /// Wraps an existing shared pager. Useful when the caller wants to keep
    /// a typed `Arc` to the same object.
    pub fn from_arc(pager: Arc<dyn Pager>) -> Self {
        Self(pager)
    }

    pub(crate) fn key(&self) -> FileKey {
        FileKey(Arc::as_ptr(&self.0) as *const () as usize)
    }
}

impl std::ops::Deref for FileHandle {
    type Target = dyn Pager;

    fn deref(&self) -> &Self::Target {
        &*self.0
    }
}

impl PartialEq for FileHandle {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for FileHandle {}

impl std::fmt::Debug for FileHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("FileHandle").field(&self.filename()).finish()
    }
}
