//! Handles for pinned page access.

use std::ops::{Deref, DerefMut};

use parking_lot::{RwLockReadGuard, RwLockWriteGuard};

use super::frame::{Frame, FrameId};
use crate::page::{PageData, PageId};

/// A pinned page returned by
/// [`fetch_page`](super::BufferPool::fetch_page) and
/// [`new_page`](super::BufferPool::new_page).
///
/// The handle does not release the pin when dropped; the pin is released
/// only by [`unpin_page`](super::BufferPool::unpin_page). Until then the
/// frame cannot be evicted and the handle's [`read`](PinnedPage::read) and
/// [`write`](PinnedPage::write) guards observe the pinned page.
///
/// Using a handle after unpinning its page is a client bug: the frame may
/// by then hold a different page, so the guards would observe that page's
/// bytes instead. It is never unsound.
pub struct PinnedPage<'a> {
    frame: &'a Frame,
    frame_id: FrameId,
    page_no: PageId,
}

impl<'a> PinnedPage<'a> {
    pub(super) fn new(frame: &'a Frame, frame_id: FrameId, page_no: PageId) -> Self {
        Self {
            frame,
            frame_id,
            page_no,
        }
    }

    /// The page number this handle was pinned for. For
    /// [`new_page`](super::BufferPool::new_page) this is the number the
    /// pager assigned.
    pub fn page_no(&self) -> PageId {
        self.page_no
    }

    /// The frame holding the page.
    pub fn frame_id(&self) -> FrameId {
        self.frame_id
    }

    /// Locks the page bytes for shared reading.
    pub fn read(&self) -> PageReadGuard<'_> {
        PageReadGuard {
            lock: self.frame.read(),
        }
    }

    /// Locks the page bytes for exclusive writing.
    ///
    /// Writing does not mark the page dirty; the client declares dirtiness
    /// when it unpins.
    pub fn write(&self) -> PageWriteGuard<'_> {
        PageWriteGuard {
            lock: self.frame.write(),
        }
    }
}

impl std::fmt::Debug for PinnedPage<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PinnedPage")
            .field("page_no", &self.page_no)
            .field("frame_id", &self.frame_id)
            .finish()
    }
}

/// Shared lock over a pinned page's bytes.
pub struct PageReadGuard<'a> {
    lock: RwLockReadGuard<'a, PageData>,
}

impl Deref for PageReadGuard<'_> {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        self.lock.as_slice()
    }
}

/// Exclusive lock over a pinned page's bytes.
pub struct PageWriteGuard<'a> {
    lock: RwLockWriteGuard<'a, PageData>,
}

impl Deref for PageWriteGuard<'_> {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        self.lock.as_slice()
    }
}

impl DerefMut for PageWriteGuard<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.lock.as_mut_slice()
    }
}
