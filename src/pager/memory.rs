//! In-memory pager implementation.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;

use super::Pager;
use crate::error::PagerError;
use crate::page::{PAGE_SIZE, PageData, PageId};

/// In-memory pager for tests and development.
///
/// Pages live in a slot vector indexed by page number; deleting a page
/// empties its slot and the number becomes reusable (lowest number first).
///
/// The pager counts the reads and writes performed against it, which lets
/// tests observe buffer pool I/O from outside: that eviction wrote a
/// dirty page back exactly once, or that shutdown flushed at all.
pub struct MemPager {
    name: String,
    inner: Mutex<Slots>,
    open: AtomicBool,
    reads: AtomicU64,
    writes: AtomicU64,
}

struct Slots {
    pages: Vec<Option<PageData>>,
    free: BTreeSet<u32>,
}

impl MemPager {
    /// Creates a new empty in-memory pager. The name only shows up in
    /// diagnostics and error messages.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inner: Mutex::new(Slots {
                pages: Vec::new(),
                free: BTreeSet::new(),
            }),
            open: AtomicBool::new(true),
            reads: AtomicU64::new(0),
            writes: AtomicU64::new(0),
        }
    }

    /// Marks the pager closed; subsequent I/O fails with `Closed`.
    pub fn close(&self) {
        self.open.store(false, Ordering::Release);
    }

    /// Number of `read_page` calls served so far.
    pub fn read_count(&self) -> u64 {
        self.reads.load(Ordering::Acquire)
    }

    /// Number of `write_page` calls served so far.
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::Acquire)
    }

    fn check_open(&self) -> Result<(), PagerError> {
        if self.open.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(PagerError::Closed(self.name.clone()))
        }
    }
}

fn check_buf_len(len: usize) -> Result<(), PagerError> {
    if len == PAGE_SIZE {
        Ok(())
    } else {
        Err(PagerError::InvalidBufferSize {
            expected: PAGE_SIZE,
            actual: len,
        })
    }
}

impl Pager for MemPager {
    fn read_page(&self, page_no: PageId, buf: &mut [u8]) -> Result<(), PagerError> {
        self.check_open()?;
        check_buf_len(buf.len())?;

        let slots = self.inner.lock();
        let page = slots
            .pages
            .get(page_no.index())
            .and_then(|slot| slot.as_ref())
            .ok_or(PagerError::PageNotFound(page_no))?;

        buf.copy_from_slice(page.as_slice());
        self.reads.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    fn write_page(&self, page_no: PageId, buf: &[u8]) -> Result<(), PagerError> {
        self.check_open()?;
        check_buf_len(buf.len())?;

        let mut slots = self.inner.lock();
        let page = slots
            .pages
            .get_mut(page_no.index())
            .and_then(|slot| slot.as_mut())
            .ok_or(PagerError::PageNotFound(page_no))?;

        page.as_mut_slice().copy_from_slice(buf);
        self.writes.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    fn allocate_page(&self) -> Result<PageId, PagerError> {
        self.check_open()?;

        let mut slots = self.inner.lock();
        // Reuse the lowest freed number before growing.
        let reuse = slots.free.iter().next().copied();
        match reuse {
            Some(num) => {
                slots.free.remove(&num);
                slots.pages[num as usize] = Some(PageData::new());
                Ok(PageId::new(num))
            }
            None => {
                let page_no = PageId::new(slots.pages.len() as u32);
                slots.pages.push(Some(PageData::new()));
                Ok(page_no)
            }
        }
    }

    fn delete_page(&self, page_no: PageId) -> Result<(), PagerError> {
        self.check_open()?;

        let mut guard = self.inner.lock();
        let slots = &mut *guard;
        let idx = page_no.index();
        match slots.pages.get_mut(idx) {
            Some(slot @ Some(_)) => {
                *slot = None;
                slots.free.insert(page_no.page_num());
                Ok(())
            }
            _ => Err(PagerError::PageNotFound(page_no)),
        }
    }

    fn page_count(&self) -> usize {
        let slots = self.inner.lock();
        slots.pages.len() - slots.free.len()
    }

    fn filename(&self) -> &str {
        &self.name
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    fn sync_all(&self) -> Result<(), PagerError> {
        self.check_open()
    }
}
