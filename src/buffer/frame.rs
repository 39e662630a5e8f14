//! Frame table entries for the buffer pool.
//!
//! A frame is a slot that holds one page at a time. Its bookkeeping lives in
//! a [`FrameDesc`] under the pool's state lock, while the page bytes live in
//! a [`Frame`] behind a per-frame `RwLock` so that clients can hold byte
//! guards without holding pool state.

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::page::{PageData, PageId};
use crate::pager::FileHandle;

/// Identifier for a frame in the buffer pool.
///
/// `FrameId` is distinct from `PageId`: a `PageId` names a page of some
/// file, a `FrameId` names a physical memory slot. Frame ids are valid only
/// within one `BufferPool` instance and range from 0 to pool_size-1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameId(usize);

impl FrameId {
    /// Creates a new `FrameId`.
    pub const fn new(id: usize) -> Self {
        Self(id)
    }

    /// Returns the frame ID as a `usize`.
    pub const fn as_usize(&self) -> usize {
        self.0
    }
}

impl std::fmt::Display for FrameId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Descriptor for one frame: which page it holds and in what state.
///
/// # Lifecycle
///
/// A descriptor starts invalid. [`set`](FrameDesc::set) makes it valid when
/// a page is loaded or allocated into the frame; [`clear`](FrameDesc::clear)
/// returns it to the invalid state on eviction, flush, or dispose.
///
/// `file` and `valid` are deliberately separate fields rather than one
/// `Option`: a frame that names a file while `valid` is false is the
/// corruption state `flush_file` reports as `BadBuffer`.
pub(super) struct FrameDesc {
    /// Owning file while the frame holds a page.
    pub(super) file: Option<FileHandle>,
    /// Page number within `file`; meaningless unless `valid`.
    pub(super) page_no: PageId,
    /// Outstanding pins. Zero means the frame is evictable.
    pub(super) pin_count: u32,
    /// Second-chance bit, set on cache hits, cleared only by the clock
    /// sweep.
    pub(super) ref_bit: bool,
    /// Set when the cached page differs from the persisted one.
    pub(super) dirty: bool,
    /// Whether the frame currently holds a loaded page.
    pub(super) valid: bool,
}

impl FrameDesc {
    pub(super) fn new() -> Self {
        Self {
            file: None,
            page_no: PageId::new(0),
            pin_count: 0,
            ref_bit: false,
            dirty: false,
            valid: false,
        }
    }

    /// Assigns a page identity to the frame.
    ///
    /// The frame comes out valid, pinned exactly once, with ref and dirty
    /// bits clear.
    pub(super) fn set(&mut self, file: FileHandle, page_no: PageId) {
        self.file = Some(file);
        self.page_no = page_no;
        self.pin_count = 1;
        self.ref_bit = false;
        self.dirty = false;
        self.valid = true;
    }

    /// Resets the frame to the invalid state, releasing its file handle.
    pub(super) fn clear(&mut self) {
        self.file = None;
        self.page_no = PageId::new(0);
        self.pin_count = 0;
        self.ref_bit = false;
        self.dirty = false;
        self.valid = false;
    }

    /// Increments the pin count.
    pub(super) fn pin(&mut self) {
        self.pin_count = self.pin_count.checked_add(1).expect("pin_count overflow");
    }

    pub(super) fn is_pinned(&self) -> bool {
        self.pin_count > 0
    }

    /// Whether this valid frame belongs to the given file.
    pub(super) fn belongs_to(&self, file: &FileHandle) -> bool {
        self.file.as_ref().is_some_and(|f| f == file)
    }
}

/// The byte storage of one frame.
///
/// Clients read and write page contents through this lock while holding a
/// pin; the pool takes the read side during eviction and flush write-back.
pub(super) struct Frame {
    data: RwLock<PageData>,
}

impl Frame {
    pub(super) fn new() -> Self {
        Self {
            data: RwLock::new(PageData::new()),
        }
    }

    pub(super) fn read(&self) -> RwLockReadGuard<'_, PageData> {
        self.data.read()
    }

    pub(super) fn write(&self) -> RwLockWriteGuard<'_, PageData> {
        self.data.write()
    }

    pub(super) fn get_mut(&mut self) -> &mut PageData {
        self.data.get_mut()
    }
}
