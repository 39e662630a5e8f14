//! File-backed pager implementation.

use std::collections::BTreeSet;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use super::Pager;
use crate::error::PagerError;
use crate::page::{PAGE_SIZE, PageId};

/// File-backed pager.
///
/// Pages are stored as contiguous 8KB blocks:
///
/// ```text
/// +------------------+------------------+------------------+
/// | Page 0 (8KB)     | Page 1 (8KB)     | Page 2 (8KB)     | ...
/// +------------------+------------------+------------------+
/// ^ offset 0         ^ offset 8192      ^ offset 16384
/// ```
///
/// Deleted page numbers are kept in an in-memory free set and handed out
/// again by `allocate_page` (lowest number first) before the file grows;
/// the file itself never shrinks.
///
/// # Concurrency
///
/// A single mutex serializes all I/O through the one file handle. The
/// buffer pool already serializes its own calls, so the lock only matters
/// when a pager is shared outside the pool.
pub struct FilePager {
    path: PathBuf,
    name: String,
    inner: Mutex<FileInner>,
    open: AtomicBool,
}

struct FileInner {
    file: File,
    /// Slots in the file, including freed ones.
    slots: u32,
    free: BTreeSet<u32>,
}

impl FilePager {
    /// Opens or creates a pager file at the given path.
    ///
    /// # Errors
    ///
    /// `Corrupted` if an existing file's size is not a multiple of
    /// `PAGE_SIZE`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, PagerError> {
        let path = path.into();

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        let file_size = file.metadata()?.len();
        let slots = PageId::count_in(file_size).ok_or_else(|| {
            PagerError::Corrupted(format!(
                "file size {} is not a whole number of {}-byte pages",
                file_size, PAGE_SIZE
            ))
        })?;

        let name = path.display().to_string();
        Ok(Self {
            path,
            name,
            inner: Mutex::new(FileInner {
                file,
                slots,
                free: BTreeSet::new(),
            }),
            open: AtomicBool::new(true),
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Syncs and closes the pager. Subsequent I/O fails with `Closed`; a
    /// buffer pool shutting down afterwards skips this file's dirty pages.
    pub fn close(&self) -> Result<(), PagerError> {
        self.check_open()?;
        let inner = self.inner.lock();
        inner.file.sync_all()?;
        self.open.store(false, Ordering::Release);
        Ok(())
    }

    fn check_open(&self) -> Result<(), PagerError> {
        if self.open.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(PagerError::Closed(self.name.clone()))
        }
    }

    /// A page number is live if it is below the slot count and not freed.
    fn check_live(inner: &FileInner, page_no: PageId) -> Result<(), PagerError> {
        let num = page_no.page_num();
        if num >= inner.slots || inner.free.contains(&num) {
            return Err(PagerError::PageNotFound(page_no));
        }
        Ok(())
    }
}

impl Pager for FilePager {
    fn read_page(&self, page_no: PageId, buf: &mut [u8]) -> Result<(), PagerError> {
        self.check_open()?;
        if buf.len() != PAGE_SIZE {
            return Err(PagerError::InvalidBufferSize {
                expected: PAGE_SIZE,
                actual: buf.len(),
            });
        }

        let mut inner = self.inner.lock();
        Self::check_live(&inner, page_no)?;
        inner.file.seek(SeekFrom::Start(page_no.byte_offset()))?;
        inner.file.read_exact(buf)?;
        Ok(())
    }

    fn write_page(&self, page_no: PageId, buf: &[u8]) -> Result<(), PagerError> {
        self.check_open()?;
        if buf.len() != PAGE_SIZE {
            return Err(PagerError::InvalidBufferSize {
                expected: PAGE_SIZE,
                actual: buf.len(),
            });
        }

        let mut inner = self.inner.lock();
        Self::check_live(&inner, page_no)?;
        inner.file.seek(SeekFrom::Start(page_no.byte_offset()))?;
        inner.file.write_all(buf)?;
        Ok(())
    }

    fn allocate_page(&self) -> Result<PageId, PagerError> {
        self.check_open()?;

        let mut inner = self.inner.lock();
        // Reuse the lowest freed number before growing the file.
        let reuse = inner.free.iter().next().copied();
        let num = match reuse {
            Some(num) => {
                inner.free.remove(&num);
                num
            }
            None => {
                let num = inner.slots;
                inner.slots += 1;
                num
            }
        };

        // Fresh and reused pages alike start out zeroed on disk.
        let page_no = PageId::new(num);
        inner.file.seek(SeekFrom::Start(page_no.byte_offset()))?;
        inner.file.write_all(&[0u8; PAGE_SIZE])?;

        Ok(page_no)
    }

    fn delete_page(&self, page_no: PageId) -> Result<(), PagerError> {
        self.check_open()?;

        let mut inner = self.inner.lock();
        Self::check_live(&inner, page_no)?;
        inner.free.insert(page_no.page_num());
        Ok(())
    }

    fn page_count(&self) -> usize {
        let inner = self.inner.lock();
        (inner.slots - inner.free.len() as u32) as usize
    }

    fn filename(&self) -> &str {
        &self.name
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    fn sync_all(&self) -> Result<(), PagerError> {
        self.check_open()?;
        let inner = self.inner.lock();
        inner.file.sync_all()?;
        Ok(())
    }
}
