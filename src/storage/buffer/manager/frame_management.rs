use std::sync::atomic::Ordering;

use log::{debug, warn};
use parking_lot::MutexGuard;

use crate::common::types::{FrameId, Page, PageId};
use crate::storage::buffer::error::BufferPoolError;
use crate::storage::disk::FileHandle;
use super::{BufferPoolManager, PageRef, PoolState};

/// Where the bytes of a newly installed page come from
pub(crate) enum Fill {
    /// Read the page from its file
    Read,
    /// A page the file has just allocated
    Fresh(Page),
}

impl BufferPoolManager {
    /// Pin a page, loading it into a frame chosen by the clock on a miss.
    pub(crate) fn pin_page(
        &self,
        file: &FileHandle,
        page_id: PageId,
        fill: Fill,
    ) -> Result<PageRef<'_>, BufferPoolError> {
        let mut state = self.state.lock();

        let frame_id = loop {
            if let Some(frame_id) = state.page_table.lookup(file.id(), page_id) {
                let desc = &mut state.frames[frame_id as usize];
                if desc.io_in_progress {
                    self.io_done.wait(&mut state);
                    continue;
                }
                if matches!(fill, Fill::Fresh(_)) {
                    // A page the file just handed out cannot already be cached
                    return Err(desc.corrupt());
                }
                desc.referenced = true;
                desc.pin_count += 1;
                state.stats.hits += 1;
                return Ok(self.page_ref(frame_id, page_id));
            }

            let frame_id = {
                let PoolState { frames, replacer, .. } = &mut *state;
                replacer.victim(frames)?
            };

            let victim = &state.frames[frame_id as usize];
            if victim.valid && victim.dirty {
                self.write_back(&mut state, frame_id)?;
                // Someone may have loaded our page while the lock was released
                if state.page_table.lookup(file.id(), page_id).is_some() {
                    continue;
                }
            }

            self.evict(&mut state, frame_id)?;
            let desc = &mut state.frames[frame_id as usize];
            desc.set(file.clone(), page_id);
            desc.io_in_progress = true;
            state.page_table.insert(file.id(), page_id, frame_id)?;
            state.stats.misses += 1;
            break frame_id;
        };

        let result = MutexGuard::unlocked(&mut state, || self.fill_frame(frame_id, file, page_id, fill));

        state.frames[frame_id as usize].io_in_progress = false;
        self.io_done.notify_all();

        if let Err(err) = result {
            state.page_table.remove(file.id(), page_id)?;
            state.frames[frame_id as usize].clear();
            return Err(err);
        }

        Ok(self.page_ref(frame_id, page_id))
    }

    fn fill_frame(&self, frame_id: FrameId, file: &FileHandle, page_id: PageId, fill: Fill) -> Result<(), BufferPoolError> {
        let page = match fill {
            Fill::Read => file.read_page(page_id)?,
            Fill::Fresh(page) => page,
        };

        let slot = &self.slots[frame_id as usize];
        let mut guard = slot.page.write();
        *guard = page;
        slot.generation.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    /// Write a dirty frame back to its file with the state lock released.
    ///
    /// The frame keeps its page table entry and is marked busy meanwhile. On
    /// failure it is left dirty and occupied.
    pub(crate) fn write_back(
        &self,
        state: &mut MutexGuard<'_, PoolState>,
        frame_id: FrameId,
    ) -> Result<(), BufferPoolError> {
        let idx = frame_id as usize;
        let (file, page_id) = {
            let desc = &mut state.frames[idx];
            let file = match (&desc.file, desc.valid) {
                (Some(file), true) => file.clone(),
                _ => return Err(desc.corrupt()),
            };
            desc.dirty = false;
            desc.io_in_progress = true;
            (file, desc.page_id)
        };

        let result = MutexGuard::unlocked(state, || {
            let page = self.slots[idx].page.read();
            file.write_page(&page)
        });

        state.frames[idx].io_in_progress = false;
        self.io_done.notify_all();

        match result {
            Ok(()) => {
                state.stats.writebacks += 1;
                debug!("Wrote back page {} of {} from frame {}", page_id, file, frame_id);
                Ok(())
            }
            Err(err) => {
                state.frames[idx].dirty = true;
                warn!("Writeback of page {} of {} failed: {}", page_id, file, err);
                Err(err.into())
            }
        }
    }

    /// Drop a clean, unpinned page from its frame so the frame can be reused
    fn evict(&self, state: &mut PoolState, frame_id: FrameId) -> Result<(), BufferPoolError> {
        let desc = &state.frames[frame_id as usize];
        if !desc.valid {
            return Ok(());
        }
        if desc.dirty || desc.is_pinned() || desc.io_in_progress {
            return Err(desc.corrupt());
        }

        let page_id = desc.page_id;
        self.release_frame(state, frame_id)?;
        state.stats.evictions += 1;
        debug!("Evicted page {} from frame {}", page_id, frame_id);
        Ok(())
    }

    /// Remove a frame's page table entry and mark the frame invalid
    pub(crate) fn release_frame(&self, state: &mut PoolState, frame_id: FrameId) -> Result<(), BufferPoolError> {
        let desc = &state.frames[frame_id as usize];
        let (file_id, page_id) = desc.key().ok_or_else(|| desc.corrupt())?;

        state.page_table.remove(file_id, page_id)?;
        state.frames[frame_id as usize].clear();
        self.slots[frame_id as usize].generation.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }
}
