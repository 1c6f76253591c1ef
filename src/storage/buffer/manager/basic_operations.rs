use log::{debug, warn};

use crate::common::types::{INVALID_PAGE_ID, PageId};
use crate::storage::buffer::error::BufferPoolError;
use crate::storage::buffer::manager::frame_management::Fill;
use crate::storage::disk::FileHandle;
use super::{BufferPoolManager, PageRef};

impl BufferPoolManager {
    /// Fetch a page, reading it from its file if it is not cached.
    ///
    /// The page comes back pinned; release it with [`Self::unpin_page`].
    pub fn fetch_page(&self, file: &FileHandle, page_id: PageId) -> Result<PageRef<'_>, BufferPoolError> {
        if page_id == INVALID_PAGE_ID {
            return Err(BufferPoolError::InvalidOperation("Cannot fetch invalid page ID".to_string()));
        }

        self.pin_page(file, page_id, Fill::Read)
    }

    /// Allocate a new page in `file` and pin it in the buffer pool.
    ///
    /// If no frame can host the page, it is deleted from the file again
    /// before the error is returned.
    pub fn new_page(&self, file: &FileHandle) -> Result<(PageId, PageRef<'_>), BufferPoolError> {
        let page = file.allocate_page()?;
        let page_id = page.page_id;

        let page_ref = match self.pin_page(file, page_id, Fill::Fresh(page)) {
            Ok(page_ref) => page_ref,
            Err(e) => {
                if let Err(delete_err) = file.delete_page(page_id) {
                    warn!("Failed to delete orphaned page {} of {}: {}", page_id, file, delete_err);
                }
                return Err(e);
            }
        };
        debug!("Allocated page {} of {} in frame {}", page_id, file, page_ref.frame_id());
        Ok((page_id, page_ref))
    }

    /// Release one pin on a page, marking it dirty if requested.
    ///
    /// Unpinning a page that is not cached is tolerated and does nothing:
    /// the page may already have been flushed or disposed by its owner.
    /// Unpinning a cached page with no pins left is a caller bug and fails
    /// with `NotPinned`.
    pub fn unpin_page(&self, file: &FileHandle, page_id: PageId, is_dirty: bool) -> Result<(), BufferPoolError> {
        if page_id == INVALID_PAGE_ID {
            return Err(BufferPoolError::InvalidOperation("Cannot unpin invalid page ID".to_string()));
        }

        let mut state = self.state.lock();
        let Some(frame_id) = state.page_table.lookup(file.id(), page_id) else {
            debug!("Ignoring unpin of uncached page {} of {}", page_id, file);
            return Ok(());
        };

        let desc = &mut state.frames[frame_id as usize];
        if desc.pin_count == 0 {
            return Err(BufferPoolError::NotPinned {
                file: file.name().to_string(),
                page_id,
                frame_id,
            });
        }

        desc.pin_count -= 1;
        if is_dirty {
            desc.dirty = true;
        }

        Ok(())
    }

    /// Remove a page from the buffer pool and delete it from its file.
    ///
    /// Cached bytes are discarded without writeback. The file is asked to
    /// delete the page whether or not it was cached.
    pub fn dispose_page(&self, file: &FileHandle, page_id: PageId) -> Result<(), BufferPoolError> {
        if page_id == INVALID_PAGE_ID {
            return Err(BufferPoolError::InvalidOperation("Cannot delete invalid page ID".to_string()));
        }

        {
            let mut state = self.state.lock();
            while let Some(frame_id) = state.page_table.lookup(file.id(), page_id) {
                let desc = &state.frames[frame_id as usize];
                if desc.io_in_progress {
                    self.io_done.wait(&mut state);
                    continue;
                }
                if desc.is_pinned() {
                    return Err(BufferPoolError::PagePinned {
                        file: file.name().to_string(),
                        page_id,
                        frame_id,
                    });
                }
                if desc.dirty {
                    debug!("Discarding dirty page {} of {} on dispose", page_id, file);
                }

                self.release_frame(&mut state, frame_id)?;
                break;
            }
        }

        file.delete_page(page_id)?;
        Ok(())
    }
}
