//! The (file, page) → frame directory.

use std::collections::HashMap;

use super::frame::FrameId;
use crate::page::PageId;
use crate::pager::FileKey;

/// Attempted to map a (file, page) pair that is already mapped.
///
/// This never escapes the buffer module; under the pool's invariants a
/// duplicate insert indicates internal corruption.
#[derive(Debug, PartialEq, Eq)]
pub(super) struct DuplicateEntry;

/// Maps a cached page's identity to the frame holding it.
///
/// Backed by a SipHash-keyed `HashMap`, so lookup cost does not depend on
/// adversarial page-number patterns. File identity enters the key as the
/// handle's [`FileKey`]; two open files on the same path occupy disjoint key
/// ranges.
///
/// Misses are returned as `None` and are ordinary control flow for the
/// pool: a fetch miss starts the load path, unpin and dispose treat a miss
/// as a no-op. Only the pool's own bugs could make `insert` collide.
pub(super) struct Directory {
    map: HashMap<(FileKey, PageId), FrameId>,
}

impl Directory {
    /// Creates a directory sized for a pool of `capacity` frames. At most
    /// one entry per frame can exist, so the map never rehashes.
    pub(super) fn with_capacity(capacity: usize) -> Self {
        Self {
            map: HashMap::with_capacity(capacity),
        }
    }

    pub(super) fn insert(
        &mut self,
        file: FileKey,
        page_no: PageId,
        frame_id: FrameId,
    ) -> Result<(), DuplicateEntry> {
        match self.map.entry((file, page_no)) {
            std::collections::hash_map::Entry::Occupied(_) => Err(DuplicateEntry),
            std::collections::hash_map::Entry::Vacant(v) => {
                v.insert(frame_id);
                Ok(())
            }
        }
    }

    pub(super) fn lookup(&self, file: FileKey, page_no: PageId) -> Option<FrameId> {
        self.map.get(&(file, page_no)).copied()
    }

    pub(super) fn remove(&mut self, file: FileKey, page_no: PageId) -> Option<FrameId> {
        self.map.remove(&(file, page_no))
    }

    /// Number of cached pages.
    pub(super) fn len(&self) -> usize {
        self.map.len()
    }

    #[cfg(test)]
    pub(super) fn iter(&self) -> impl Iterator<Item = (&(FileKey, PageId), &FrameId)> {
        self.map.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pager::{FileHandle, MemPager};

    fn key(name: &str) -> FileKey {
        FileHandle::new(MemPager::new(name)).key()
    }

    #[test]
    fn test_insert_lookup_remove() {
        let mut dir = Directory::with_capacity(4);
        let f = key("a.db");

        assert_eq!(dir.lookup(f, PageId::new(1)), None);

        dir.insert(f, PageId::new(1), FrameId::new(3)).unwrap();
        assert_eq!(dir.lookup(f, PageId::new(1)), Some(FrameId::new(3)));
        assert_eq!(dir.len(), 1);

        assert_eq!(dir.remove(f, PageId::new(1)), Some(FrameId::new(3)));
        assert_eq!(dir.lookup(f, PageId::new(1)), None);
        assert_eq!(dir.remove(f, PageId::new(1)), None);
        assert_eq!(dir.len(), 0);
    }

    #[test]
    fn test_duplicate_insert_rejected() {
        let mut dir = Directory::with_capacity(4);
        let f = key("a.db");

        dir.insert(f, PageId::new(1), FrameId::new(0)).unwrap();
        assert_eq!(
            dir.insert(f, PageId::new(1), FrameId::new(2)),
            Err(DuplicateEntry)
        );
        // Original mapping survives the rejected insert.
        assert_eq!(dir.lookup(f, PageId::new(1)), Some(FrameId::new(0)));
    }

    #[test]
    fn test_same_page_number_different_files() {
        let mut dir = Directory::with_capacity(4);
        let a = key("a.db");
        let b = key("b.db");

        dir.insert(a, PageId::new(5), FrameId::new(0)).unwrap();
        dir.insert(b, PageId::new(5), FrameId::new(1)).unwrap();

        assert_eq!(dir.lookup(a, PageId::new(5)), Some(FrameId::new(0)));
        assert_eq!(dir.lookup(b, PageId::new(5)), Some(FrameId::new(1)));

        dir.remove(a, PageId::new(5));
        assert_eq!(dir.lookup(b, PageId::new(5)), Some(FrameId::new(1)));
    }
}
