//! The buffer pool manager.

use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use super::directory::Directory;
use super::error::BufferError;
use super::frame::{Frame, FrameDesc, FrameId};
use super::guard::PinnedPage;
use super::replacer::ClockSweep;
use super::stats::BufferStats;
use crate::page::PageId;
use crate::pager::FileHandle;

/// In-memory page cache between per-file pagers and their clients.
///
/// The pool owns a fixed number of frames and maps (file, page number)
/// identities onto them on demand. Clients pin pages to hold them in
/// memory, declare dirtiness when unpinning, and the clock sweep recycles
/// unpinned frames when the pool is full, writing dirty victims back
/// before their frame is reused.
///
/// # Architecture
///
/// ```text
/// +---------------------+
/// |  Access methods     |
/// +---------------------+
///           |
///           v
/// +---------------------+     directory: (file, page) -> frame
/// |     BufferPool      |     clock sweep over frame descriptors
/// +---------------------+
///           |
///           v
/// +---------------------+
/// |  Pager (per file)   |
/// +---------------------+
/// ```
///
/// # Locking
///
/// One mutex covers the directory, the frame descriptors, the clock hand
/// and the statistics, and is held across pager I/O: an eviction's
/// write-back completes before any other operation can touch the frame
/// table, so a frame's old contents are never mid-flight while a competing
/// fetch selects it. Page bytes sit outside that lock behind per-frame
/// `RwLock`s, so clients holding byte guards never block unrelated pool
/// operations.
///
/// Lock order is state, then frame bytes. Client code must finish with a
/// page's byte guards before unpinning it.
pub struct BufferPool {
    /// Frame buffers, indexed identically to the descriptor table.
    frames: Vec<Frame>,
    /// Coarse state lock.
    state: Mutex<PoolState>,
    pool_size: usize,
}

struct PoolState {
    directory: Directory,
    descs: Vec<FrameDesc>,
    clock: ClockSweep,
    stats: BufferStats,
}

impl BufferPool {
    /// Creates a pool with `pool_size` frames, all empty.
    ///
    /// # Panics
    ///
    /// Panics if `pool_size` is 0.
    pub fn new(pool_size: usize) -> Self {
        assert!(pool_size > 0, "pool_size must be > 0");

        let frames: Vec<_> = (0..pool_size).map(|_| Frame::new()).collect();
        let descs: Vec<_> = (0..pool_size).map(|_| FrameDesc::new()).collect();

        Self {
            frames,
            state: Mutex::new(PoolState {
                directory: Directory::with_capacity(pool_size),
                descs,
                clock: ClockSweep::new(pool_size),
                stats: BufferStats::default(),
            }),
            pool_size,
        }
    }

    /// Number of frames in the pool.
    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// Number of pages currently cached.
    pub fn page_count(&self) -> usize {
        self.state.lock().directory.len()
    }

    /// Snapshot of the access counters.
    pub fn stats(&self) -> BufferStats {
        self.state.lock().stats
    }

    /// Zeroes the access counters.
    pub fn reset_stats(&self) {
        self.state.lock().stats = BufferStats::default();
    }

    /// Fetches a page, pinning it in a frame.
    ///
    /// A cached page is served from its frame: the ref bit is set and the
    /// pin count incremented. Otherwise a frame is recycled (possibly
    /// evicting its previous page) and the page is read from `file`; the
    /// new frame comes out pinned exactly once.
    ///
    /// Every call must be matched by an
    /// [`unpin_page`](BufferPool::unpin_page) for the same page.
    ///
    /// # Errors
    ///
    /// [`BufferError::Exhausted`] if every frame is pinned. Pager errors
    /// propagate unchanged; on a failed read the recycled frame is left
    /// empty and unmapped.
    pub fn fetch_page(
        &self,
        file: &FileHandle,
        page_no: PageId,
    ) -> Result<PinnedPage<'_>, BufferError> {
        let mut state = self.state.lock();
        state.stats.accesses += 1;

        if let Some(frame_id) = state.directory.lookup(file.key(), page_no) {
            let desc = &mut state.descs[frame_id.as_usize()];
            desc.ref_bit = true;
            desc.pin();
            trace!(file = file.filename(), page = page_no.page_num(), frame = frame_id.as_usize(), "fetch hit");
            return Ok(PinnedPage::new(
                &self.frames[frame_id.as_usize()],
                frame_id,
                page_no,
            ));
        }

        let frame_id = self.alloc_frame(&mut state)?;
        let idx = frame_id.as_usize();

        {
            let mut data = self.frames[idx].write();
            // On failure the frame stays invalid with no directory entry.
            file.read_page(page_no, data.as_mut_slice())?;
        }
        state.stats.disk_reads += 1;
        trace!(file = file.filename(), page = page_no.page_num(), frame = idx, "fetch miss");

        state
            .directory
            .insert(file.key(), page_no, frame_id)
            .expect("missed page cannot already be mapped");
        state.descs[idx].set(file.clone(), page_no);

        Ok(PinnedPage::new(&self.frames[idx], frame_id, page_no))
    }

    /// Releases one pin on a page.
    ///
    /// Unpinning a page that is not cached is a no-op: clients may unpin
    /// pages in patterns that race with flushes. `mark_dirty` records that
    /// the client modified the page; the dirty bit is sticky and only
    /// cleared by write-back. The ref bit is untouched; only the clock
    /// sweep clears it.
    ///
    /// # Errors
    ///
    /// [`BufferError::NotPinned`] if the page is cached with a pin count of
    /// zero.
    pub fn unpin_page(
        &self,
        file: &FileHandle,
        page_no: PageId,
        mark_dirty: bool,
    ) -> Result<(), BufferError> {
        let mut state = self.state.lock();

        let Some(frame_id) = state.directory.lookup(file.key(), page_no) else {
            return Ok(());
        };

        let desc = &mut state.descs[frame_id.as_usize()];
        if desc.pin_count == 0 {
            return Err(BufferError::NotPinned {
                file: file.filename().to_string(),
                page_no,
                frame_id,
            });
        }

        desc.pin_count -= 1;
        if mark_dirty {
            desc.dirty = true;
        }
        Ok(())
    }

    /// Allocates a new page in `file` and pins it in a frame.
    ///
    /// The frame is claimed before the pager is consulted, so an exhausted
    /// pool never grows the file. The returned handle carries the page
    /// number the pager assigned; the page reads as zeroes.
    ///
    /// # Errors
    ///
    /// [`BufferError::Exhausted`] if every frame is pinned; pager errors
    /// propagate unchanged.
    pub fn new_page(&self, file: &FileHandle) -> Result<PinnedPage<'_>, BufferError> {
        let mut state = self.state.lock();

        let frame_id = self.alloc_frame(&mut state)?;
        let idx = frame_id.as_usize();

        // On failure the frame stays invalid with no directory entry.
        let page_no = file.allocate_page()?;

        // The recycled buffer still holds the evicted page's bytes.
        self.frames[idx].write().zero();

        debug!(file = file.filename(), page = page_no.page_num(), frame = idx, "new page");
        state
            .directory
            .insert(file.key(), page_no, frame_id)
            .expect("pager assigned a page number that is still cached");
        state.descs[idx].set(file.clone(), page_no);

        Ok(PinnedPage::new(&self.frames[idx], frame_id, page_no))
    }

    /// Flushes every cached page of `file` and drops it from the pool.
    ///
    /// The scan fails fast: the first invalid or pinned frame belonging to
    /// the file aborts the flush with an error, and frames already
    /// processed stay flushed (clean, unmapped). Frames of other files are
    /// skipped without side effect.
    ///
    /// # Errors
    ///
    /// [`BufferError::PagePinned`] if a page of the file is still pinned;
    /// [`BufferError::BadBuffer`] if an invalid frame claims to belong to
    /// the file (internal corruption); pager write errors propagate.
    pub fn flush_file(&self, file: &FileHandle) -> Result<(), BufferError> {
        let mut state = self.state.lock();

        for idx in 0..self.pool_size {
            let desc = &state.descs[idx];
            if !desc.belongs_to(file) {
                continue;
            }
            let (page_no, dirty, valid, ref_bit, pinned) = (
                desc.page_no,
                desc.dirty,
                desc.valid,
                desc.ref_bit,
                desc.is_pinned(),
            );

            state.stats.accesses += 1;

            if !valid {
                return Err(BufferError::BadBuffer {
                    frame_id: FrameId::new(idx),
                    dirty,
                    valid,
                    ref_bit,
                });
            }
            if pinned {
                return Err(BufferError::PagePinned {
                    file: file.filename().to_string(),
                    page_no,
                    frame_id: FrameId::new(idx),
                });
            }

            if dirty {
                let data = self.frames[idx].read();
                file.write_page(page_no, data.as_slice())?;
                drop(data);
                state.stats.disk_writes += 1;
                state.descs[idx].dirty = false;
                debug!(file = file.filename(), page = page_no.page_num(), frame = idx, "flushed dirty page");
            }

            state.directory.remove(file.key(), page_no);
            state.descs[idx].clear();
        }

        Ok(())
    }

    /// Deletes a page from `file`, dropping it from the pool first.
    ///
    /// A cached copy is discarded without write-back, since the page is
    /// going away. The pager's `delete_page` is called whether or not the page
    /// was cached.
    ///
    /// # Errors
    ///
    /// [`BufferError::PagePinned`] if the page is cached and pinned; the
    /// file is left untouched in that case. Pager errors propagate.
    pub fn delete_page(&self, file: &FileHandle, page_no: PageId) -> Result<(), BufferError> {
        let mut state = self.state.lock();

        if let Some(frame_id) = state.directory.lookup(file.key(), page_no) {
            let idx = frame_id.as_usize();
            if state.descs[idx].is_pinned() {
                return Err(BufferError::PagePinned {
                    file: file.filename().to_string(),
                    page_no,
                    frame_id,
                });
            }
            state.directory.remove(file.key(), page_no);
            state.descs[idx].clear();
        }

        file.delete_page(page_no)?;
        Ok(())
    }

    /// Writes back all dirty pages and tears the pool down, returning the
    /// final counters.
    ///
    /// Equivalent to dropping the pool, except the statistics survive.
    pub fn shutdown(mut self) -> BufferStats {
        self.write_back_all();
        let stats = self.state.get_mut().stats;

        // Write-back already ran; suppress the pool's Drop so it does not
        // run a second pass (and re-log any failed writes) on return.
        let mut this = std::mem::ManuallyDrop::new(self);
        // SAFETY: `this` is not used past this point; each owning field is
        // dropped exactly once here, and `pool_size` is Copy.
        unsafe {
            std::ptr::drop_in_place(&mut this.frames);
            std::ptr::drop_in_place(&mut this.state);
        }

        stats
    }

    /// Recycles a frame for a new occupant.
    ///
    /// Runs the clock sweep; a valid victim is written back if dirty, then
    /// unmapped and cleared. The descriptor is cleared unconditionally, so
    /// an evicted frame never carries a stale dirty bit.
    fn alloc_frame(&self, state: &mut PoolState) -> Result<FrameId, BufferError> {
        let Some(frame_id) = state.clock.find_victim(&mut state.descs) else {
            return Err(BufferError::Exhausted);
        };
        let idx = frame_id.as_usize();

        if state.descs[idx].valid {
            let file = state.descs[idx]
                .file
                .clone()
                .expect("valid frame must have a file");
            let page_no = state.descs[idx].page_no;

            if state.descs[idx].dirty {
                // Write-back completes before the frame can be reused; a
                // failure leaves the victim cached, dirty and mapped.
                let data = self.frames[idx].read();
                file.write_page(page_no, data.as_slice())?;
                drop(data);
                state.stats.disk_writes += 1;
                debug!(file = file.filename(), page = page_no.page_num(), frame = idx, "evicted dirty page");
            }

            state.directory.remove(file.key(), page_no);
            state.descs[idx].clear();
        }

        Ok(frame_id)
    }

    /// Best-effort write-back of every dirty frame whose file is still
    /// open. Used by shutdown; never fails.
    fn write_back_all(&mut self) {
        for idx in 0..self.pool_size {
            let state = self.state.get_mut();
            let desc = &state.descs[idx];
            if !desc.valid || !desc.dirty {
                continue;
            }
            let file = desc.file.clone().expect("valid frame must have a file");
            if !file.is_open() {
                // A closed file's pages are assumed already durable.
                continue;
            }
            let page_no = desc.page_no;

            let data = self.frames[idx].get_mut();
            match file.write_page(page_no, data.as_slice()) {
                Ok(()) => {
                    let state = self.state.get_mut();
                    state.stats.disk_writes += 1;
                    state.descs[idx].dirty = false;
                }
                Err(e) => {
                    warn!(
                        file = file.filename(),
                        page = page_no.page_num(),
                        error = %e,
                        "shutdown write-back failed"
                    );
                }
            }
        }
    }

    #[cfg(test)]
    fn check_invariants(&self) {
        let state = self.state.lock();

        // Clock hand in range.
        assert!(state.clock.hand() < self.pool_size);

        // Every valid frame is mapped to itself, exactly once.
        let mut mapped = 0;
        for (idx, desc) in state.descs.iter().enumerate() {
            if desc.valid {
                let file = desc.file.as_ref().expect("valid frame must have a file");
                assert_eq!(
                    state.directory.lookup(file.key(), desc.page_no),
                    Some(FrameId::new(idx)),
                    "valid frame {} is not mapped to itself",
                    idx
                );
                mapped += 1;
            } else {
                assert_eq!(desc.pin_count, 0);
                assert!(!desc.dirty);
            }
        }

        // And every directory entry points at a matching valid frame.
        assert_eq!(state.directory.len(), mapped);
        for (&(file_key, page_no), &frame_id) in state.directory.iter() {
            let desc = &state.descs[frame_id.as_usize()];
            assert!(desc.valid);
            assert_eq!(desc.page_no, page_no);
            assert_eq!(desc.file.as_ref().unwrap().key(), file_key);
        }
    }
}

impl Drop for BufferPool {
    fn drop(&mut self) {
        self.write_back_all();
    }
}

impl std::fmt::Display for BufferPool {
    /// One line per frame, for diagnostics.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        let mut valid_frames = 0;

        for (idx, desc) in state.descs.iter().enumerate() {
            if desc.valid {
                valid_frames += 1;
                writeln!(
                    f,
                    "frame {:>4}: file={:?} page={} pin={} ref={} dirty={}",
                    idx,
                    desc.file.as_ref().map_or("?", |h| h.filename()),
                    desc.page_no,
                    desc.pin_count,
                    desc.ref_bit,
                    desc.dirty,
                )?;
            } else {
                writeln!(f, "frame {:>4}: <empty>", idx)?;
            }
        }

        write!(
            f,
            "clock hand: {} | valid frames: {}/{} | {}",
            state.clock.hand(),
            valid_frames,
            self.pool_size,
            state.stats
        )
    }
}
