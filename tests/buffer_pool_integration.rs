//! Integration tests for BufferPool.
//!
//! Covers the end-to-end caching scenarios with both the in-memory and
//! file-backed pagers: hit/miss accounting, clean and dirty eviction,
//! exhaustion, flush refusal, dispose, and shutdown write-back.

use std::sync::Arc;

use bufpool::{
    BufferError, BufferPool, FileHandle, FilePager, MemPager, PAGE_SIZE, PageId, Pager, PagerError,
};
use tempfile::tempdir;

/// Pre-allocates `n` pages in the pager, stamping byte 0 of page i with i.
fn seed_pages(pager: &dyn Pager, n: u32) {
    for i in 0..n {
        let page_no = pager.allocate_page().unwrap();
        let mut buf = vec![0u8; PAGE_SIZE];
        buf[0] = i as u8;
        pager.write_page(page_no, &buf).unwrap();
    }
}

/// Generic runner: basic write/flush/readback cycle.
fn run_basic_cycle(file: FileHandle) {
    let pool = BufferPool::new(8);

    let page_no = {
        let page = pool.new_page(&file).unwrap();
        page.write()[0..4].copy_from_slice(&[0xDE, 0xAD, 0xBE, 0xEF]);
        page.page_no()
    };
    pool.unpin_page(&file, page_no, true).unwrap();

    pool.flush_file(&file).unwrap();
    assert_eq!(pool.page_count(), 0);

    // Fetch reloads from the pager.
    let page = pool.fetch_page(&file, page_no).unwrap();
    assert_eq!(&page.read()[0..4], &[0xDE, 0xAD, 0xBE, 0xEF]);
    pool.unpin_page(&file, page_no, false).unwrap();
}

#[test]
fn test_basic_cycle_with_mem_pager() {
    run_basic_cycle(FileHandle::new(MemPager::new("basic.db")));
}

#[test]
fn test_basic_cycle_with_file_pager() {
    let dir = tempdir().unwrap();
    let pager = FilePager::open(dir.path().join("basic.db")).unwrap();
    run_basic_cycle(FileHandle::new(pager));
}

/// Scenario: miss then hit. The second fetch performs no I/O and stacks a
/// second pin.
#[test]
fn test_miss_then_hit() {
    let pager = Arc::new(MemPager::new("a.db"));
    let file = FileHandle::from_arc(pager.clone());
    seed_pages(&*pager, 1);
    let pool = BufferPool::new(3);

    pool.fetch_page(&file, PageId::new(0)).unwrap();
    assert_eq!(pool.stats().disk_reads, 1);

    pool.fetch_page(&file, PageId::new(0)).unwrap();
    assert_eq!(pool.stats().disk_reads, 1);
    assert_eq!(pool.stats().accesses, 2);
    assert_eq!(pager.read_count(), 1);

    // Pin count is 2: two unpins succeed, a third reports NotPinned.
    pool.unpin_page(&file, PageId::new(0), false).unwrap();
    pool.unpin_page(&file, PageId::new(0), false).unwrap();
    assert!(matches!(
        pool.unpin_page(&file, PageId::new(0), false),
        Err(BufferError::NotPinned { .. })
    ));
}

/// Scenario: eviction of a clean page writes nothing.
#[test]
fn test_clean_eviction() {
    let pager = Arc::new(MemPager::new("a.db"));
    let file = FileHandle::from_arc(pager.clone());
    seed_pages(&*pager, 3);
    let pool = BufferPool::new(2);

    for i in 0..3 {
        pool.fetch_page(&file, PageId::new(i)).unwrap();
        pool.unpin_page(&file, PageId::new(i), false).unwrap();
    }

    assert_eq!(pool.stats().disk_reads, 3);
    assert_eq!(pool.stats().disk_writes, 0);
    assert_eq!(pager.write_count(), 3); // only the seed writes

    // Page 0 was the victim: fetching it again is the one extra read.
    pool.fetch_page(&file, PageId::new(0)).unwrap();
    assert_eq!(pool.stats().disk_reads, 4);
    assert_eq!(pool.stats().disk_writes, 0);
}

/// Scenario: evicting a dirty page writes it back before the replacement
/// page is read.
#[test]
fn test_dirty_eviction_writes_back() {
    let pager = Arc::new(MemPager::new("a.db"));
    let file = FileHandle::from_arc(pager.clone());
    seed_pages(&*pager, 2);
    let pool = BufferPool::new(1);

    {
        let page = pool.fetch_page(&file, PageId::new(0)).unwrap();
        page.write()[10] = 0x55;
    }
    pool.unpin_page(&file, PageId::new(0), true).unwrap();

    let seed_writes = pager.write_count();
    let seed_reads = pager.read_count();

    pool.fetch_page(&file, PageId::new(1)).unwrap();
    assert_eq!(pool.stats().disk_writes, 1);
    assert_eq!(pager.write_count(), seed_writes + 1);
    assert_eq!(pager.read_count(), seed_reads + 1);
    pool.unpin_page(&file, PageId::new(1), false).unwrap();

    // The write-back landed in the pager.
    let mut buf = vec![0u8; PAGE_SIZE];
    pager.read_page(PageId::new(0), &mut buf).unwrap();
    assert_eq!(buf[10], 0x55);
}

/// Scenario: all frames pinned. The failing fetch leaves the pool exactly
/// as it was.
#[test]
fn test_buffer_exhaustion_leaves_pool_unchanged() {
    let pager = Arc::new(MemPager::new("a.db"));
    let file = FileHandle::from_arc(pager.clone());
    seed_pages(&*pager, 3);
    let pool = BufferPool::new(2);

    pool.fetch_page(&file, PageId::new(0)).unwrap();
    pool.fetch_page(&file, PageId::new(1)).unwrap();

    let reads_before = pool.stats().disk_reads;
    let writes_before = pool.stats().disk_writes;

    assert!(matches!(
        pool.fetch_page(&file, PageId::new(2)),
        Err(BufferError::Exhausted)
    ));

    assert_eq!(pool.page_count(), 2);
    assert_eq!(pool.stats().disk_reads, reads_before);
    assert_eq!(pool.stats().disk_writes, writes_before);

    // Both pages are still cached under their original pins.
    pool.fetch_page(&file, PageId::new(0)).unwrap();
    pool.fetch_page(&file, PageId::new(1)).unwrap();
    assert_eq!(pool.stats().disk_reads, reads_before);
}

/// Scenario: flush refuses a pinned page without writing or clearing
/// anything.
#[test]
fn test_flush_refuses_pinned() {
    let pager = Arc::new(MemPager::new("a.db"));
    let file = FileHandle::from_arc(pager.clone());
    seed_pages(&*pager, 1);
    let pool = BufferPool::new(2);

    pool.fetch_page(&file, PageId::new(0)).unwrap();

    assert!(matches!(
        pool.flush_file(&file),
        Err(BufferError::PagePinned { .. })
    ));

    assert_eq!(pager.write_count(), 1); // the seed write only
    assert_eq!(pool.page_count(), 1);

    // Still a cache hit afterwards.
    pool.fetch_page(&file, PageId::new(0)).unwrap();
    assert_eq!(pool.stats().disk_reads, 1);
}

/// Scenario: pool destruction flushes dirty pages of still-open files.
#[test]
fn test_shutdown_flushes_dirty() {
    let pager = Arc::new(MemPager::new("a.db"));
    let file = FileHandle::from_arc(pager.clone());
    let pool = BufferPool::new(4);

    let page_no = {
        let page = pool.new_page(&file).unwrap();
        page.write()[0] = 0x77;
        page.page_no()
    };
    pool.unpin_page(&file, page_no, true).unwrap();

    let stats = pool.shutdown();
    assert_eq!(stats.disk_writes, 1);
    assert_eq!(pager.write_count(), 1);

    let mut buf = vec![0u8; PAGE_SIZE];
    pager.read_page(page_no, &mut buf).unwrap();
    assert_eq!(buf[0], 0x77);
}

/// Shutdown write-back also works end-to-end through a real file.
#[test]
fn test_shutdown_persists_through_file_pager() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("shutdown.db");

    let page_no = {
        let file = FileHandle::new(FilePager::open(&path).unwrap());
        let pool = BufferPool::new(4);
        let page_no = {
            let page = pool.new_page(&file).unwrap();
            page.write()[123] = 0x42;
            page.page_no()
        };
        pool.unpin_page(&file, page_no, true).unwrap();
        page_no
        // Pool dropped here: Drop flushes the dirty page.
    };

    let file = FileHandle::new(FilePager::open(&path).unwrap());
    let pool = BufferPool::new(4);
    let page = pool.fetch_page(&file, page_no).unwrap();
    assert_eq!(page.read()[123], 0x42);
    pool.unpin_page(&file, page_no, false).unwrap();
}

/// Law: fetch then unpin leaves the page cached, clean, with no pins.
#[test]
fn test_fetch_unpin_leaves_cached_clean_unpinned() {
    let pager = Arc::new(MemPager::new("a.db"));
    let file = FileHandle::from_arc(pager.clone());
    seed_pages(&*pager, 1);
    let pool = BufferPool::new(2);

    pool.fetch_page(&file, PageId::new(0)).unwrap();
    pool.unpin_page(&file, PageId::new(0), false).unwrap();

    // Cached: refetch performs no I/O.
    pool.fetch_page(&file, PageId::new(0)).unwrap();
    assert_eq!(pool.stats().disk_reads, 1);
    pool.unpin_page(&file, PageId::new(0), false).unwrap();

    // No pins left.
    assert!(matches!(
        pool.unpin_page(&file, PageId::new(0), false),
        Err(BufferError::NotPinned { .. })
    ));

    // Clean: flushing the file writes nothing.
    let seed_writes = pager.write_count();
    pool.flush_file(&file).unwrap();
    assert_eq!(pager.write_count(), seed_writes);
}

/// Law: allocate, dirty, flush results in exactly one write of that page.
#[test]
fn test_alloc_dirty_flush_writes_once() {
    let pager = Arc::new(MemPager::new("a.db"));
    let file = FileHandle::from_arc(pager.clone());
    let pool = BufferPool::new(4);

    let page_no = {
        let page = pool.new_page(&file).unwrap();
        page.write()[0] = 1;
        page.page_no()
    };
    pool.unpin_page(&file, page_no, true).unwrap();

    pool.flush_file(&file).unwrap();
    assert_eq!(pager.write_count(), 1);
    assert_eq!(pool.stats().disk_writes, 1);
}

/// Law: after dispose, the page is not cached and a refetch goes to the
/// pager (where it fails, the page being gone).
#[test]
fn test_dispose_uncaches_and_refetch_reads_file() {
    let pager = Arc::new(MemPager::new("a.db"));
    let file = FileHandle::from_arc(pager.clone());
    seed_pages(&*pager, 1);
    let pool = BufferPool::new(2);

    pool.fetch_page(&file, PageId::new(0)).unwrap();
    pool.unpin_page(&file, PageId::new(0), false).unwrap();

    pool.delete_page(&file, PageId::new(0)).unwrap();
    assert_eq!(pool.page_count(), 0);

    assert!(matches!(
        pool.fetch_page(&file, PageId::new(0)),
        Err(BufferError::Pager(PagerError::PageNotFound(_)))
    ));
    assert_eq!(pool.page_count(), 0);
}

/// Pages of distinct files with the same page number never alias, and an
/// eviction storm over one file leaves the other file's pages intact.
#[test]
fn test_two_files_do_not_alias() {
    let pa = Arc::new(MemPager::new("a.db"));
    let pb = Arc::new(MemPager::new("b.db"));
    let a = FileHandle::from_arc(pa.clone());
    let b = FileHandle::from_arc(pb.clone());
    seed_pages(&*pa, 8);
    seed_pages(&*pb, 1);
    let pool = BufferPool::new(4);

    // Dirty (b, 0) and keep it unpinned.
    {
        let page = pool.fetch_page(&b, PageId::new(0)).unwrap();
        page.write()[1] = 0xBB;
    }
    pool.unpin_page(&b, PageId::new(0), true).unwrap();

    // Churn through file a, forcing evictions.
    for i in 0..8 {
        pool.fetch_page(&a, PageId::new(i)).unwrap();
        pool.unpin_page(&a, PageId::new(i), false).unwrap();
    }

    // (b, 0) was evicted at some point and written back.
    let mut buf = vec![0u8; PAGE_SIZE];
    pb.read_page(PageId::new(0), &mut buf).unwrap();
    assert_eq!(buf[1], 0xBB);

    // Fetching it again yields b's page, not one of a's.
    let page = pool.fetch_page(&b, PageId::new(0)).unwrap();
    assert_eq!(page.read()[0], 0);
    assert_eq!(page.read()[1], 0xBB);
    pool.unpin_page(&b, PageId::new(0), false).unwrap();
}

/// The diagnostic dump names every frame.
#[test]
fn test_display_dump() {
    let file = FileHandle::new(MemPager::new("dump.db"));
    let pool = BufferPool::new(3);

    let page_no = pool.new_page(&file).unwrap().page_no();
    pool.unpin_page(&file, page_no, false).unwrap();

    let dump = format!("{pool}");
    assert!(dump.contains("dump.db"));
    assert!(dump.contains("valid frames: 1/3"));
}
