use std::collections::HashMap;

use thiserror::Error;

use crate::common::types::{FileId, FrameId, PageId};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PageTableError {
    #[error("Page {page_id} of file {file_id} is already in frame {frame_id}")]
    AlreadyPresent {
        file_id: FileId,
        page_id: PageId,
        frame_id: FrameId,
    },
    #[error("Page {page_id} of file {file_id} is not in the page table")]
    NotFound { file_id: FileId, page_id: PageId },
}

/// Maps (file, page) pairs to the frame caching them.
///
/// A miss on `lookup` is the normal cold-page path and is reported as `None`.
#[derive(Debug, Default)]
pub struct PageTable {
    entries: HashMap<(FileId, PageId), FrameId>,
}

impl PageTable {
    pub fn with_capacity(pool_size: usize) -> Self {
        // Some headroom over the frame count keeps the map from rehashing
        let capacity = pool_size + pool_size / 5 + 1;
        Self {
            entries: HashMap::with_capacity(capacity),
        }
    }

    pub fn lookup(&self, file_id: FileId, page_id: PageId) -> Option<FrameId> {
        self.entries.get(&(file_id, page_id)).copied()
    }

    pub fn insert(&mut self, file_id: FileId, page_id: PageId, frame_id: FrameId) -> Result<(), PageTableError> {
        if let Some(&existing) = self.entries.get(&(file_id, page_id)) {
            return Err(PageTableError::AlreadyPresent {
                file_id,
                page_id,
                frame_id: existing,
            });
        }
        self.entries.insert((file_id, page_id), frame_id);
        Ok(())
    }

    pub fn remove(&mut self, file_id: FileId, page_id: PageId) -> Result<FrameId, PageTableError> {
        self.entries
            .remove(&(file_id, page_id))
            .ok_or(PageTableError::NotFound { file_id, page_id })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_lookup_remove() {
        let mut table = PageTable::with_capacity(4);

        table.insert(1, 10, 0).unwrap();
        table.insert(2, 10, 1).unwrap();

        assert_eq!(table.lookup(1, 10), Some(0));
        assert_eq!(table.lookup(2, 10), Some(1));
        assert_eq!(table.lookup(1, 11), None);
        assert_eq!(table.len(), 2);

        assert_eq!(table.remove(1, 10), Ok(0));
        assert_eq!(table.lookup(1, 10), None);
    }

    #[test]
    fn test_duplicate_insert_rejected() {
        let mut table = PageTable::default();
        table.insert(1, 1, 0).unwrap();

        assert_eq!(
            table.insert(1, 1, 3),
            Err(PageTableError::AlreadyPresent {
                file_id: 1,
                page_id: 1,
                frame_id: 0
            })
        );
        assert_eq!(table.lookup(1, 1), Some(0));
    }

    #[test]
    fn test_remove_missing() {
        let mut table = PageTable::default();
        assert_eq!(
            table.remove(7, 7),
            Err(PageTableError::NotFound {
                file_id: 7,
                page_id: 7
            })
        );
        assert!(table.is_empty());
    }
}
