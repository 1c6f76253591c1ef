use log::debug;

use crate::common::types::{FrameId, PageId};
use crate::storage::buffer::error::BufferPoolError;
use crate::storage::buffer::frame::FrameDesc;
use crate::storage::disk::FileHandle;
use super::BufferPoolManager;

impl BufferPoolManager {
    /// Write a cached page back to its file if it is dirty.
    ///
    /// The page stays cached. Does nothing if the page is not cached.
    pub fn flush_page(&self, file: &FileHandle, page_id: PageId) -> Result<(), BufferPoolError> {
        let mut state = self.state.lock();

        while let Some(frame_id) = state.page_table.lookup(file.id(), page_id) {
            let desc = &state.frames[frame_id as usize];
            if desc.io_in_progress {
                self.io_done.wait(&mut state);
                continue;
            }
            if desc.dirty {
                self.write_back(&mut state, frame_id)?;
            }
            break;
        }

        Ok(())
    }

    /// Write back every dirty page of `file`, keeping the pages cached.
    pub fn sync_file(&self, file: &FileHandle) -> Result<(), BufferPoolError> {
        self.write_back_where(|desc| desc.owned_by(file))
    }

    /// Write back every dirty page in the pool.
    pub fn flush_all(&self) -> Result<(), BufferPoolError> {
        self.write_back_where(|_| true)
    }

    /// Write back and release every page of `file`.
    ///
    /// Dirty frames are written in frame order. The first pinned frame aborts
    /// the flush with `PagePinned`: pages written before it stay written and
    /// every frame of the file stays cached. A frame that names `file` while
    /// invalid fails with `CorruptState`. Only when the whole file is clean
    /// and unpinned are its frames released.
    pub fn flush_file(&self, file: &FileHandle) -> Result<(), BufferPoolError> {
        let mut state = self.state.lock();
        let mut next = 0;

        loop {
            while next < self.pool_size {
                let desc = &state.frames[next];
                if !desc.owned_by(file) {
                    next += 1;
                    continue;
                }
                if !desc.valid {
                    return Err(desc.corrupt());
                }
                if desc.io_in_progress {
                    self.io_done.wait(&mut state);
                    continue;
                }
                if desc.dirty {
                    // Revisit the same frame afterwards for the pin check
                    self.write_back(&mut state, next as FrameId)?;
                    continue;
                }
                if desc.is_pinned() {
                    return Err(BufferPoolError::PagePinned {
                        file: file.name().to_string(),
                        page_id: desc.page_id,
                        frame_id: next as FrameId,
                    });
                }
                next += 1;
            }

            // Frames behind us may have changed while a writeback ran unlocked
            match state
                .frames
                .iter()
                .position(|desc| desc.owned_by(file) && (desc.dirty || desc.is_pinned() || desc.io_in_progress))
            {
                Some(frame_id) => next = frame_id,
                None => break,
            }
        }

        let owned: Vec<FrameId> = state
            .frames
            .iter()
            .filter(|desc| desc.owned_by(file))
            .map(|desc| desc.frame_id())
            .collect();
        for &frame_id in &owned {
            self.release_frame(&mut state, frame_id)?;
        }

        debug!("Flushed {} and released {} frames", file, owned.len());
        Ok(())
    }

    fn write_back_where(&self, select: impl Fn(&FrameDesc) -> bool) -> Result<(), BufferPoolError> {
        let mut state = self.state.lock();
        let mut next = 0;

        while next < self.pool_size {
            let desc = &state.frames[next];
            if !desc.dirty || !select(desc) {
                next += 1;
                continue;
            }
            if !desc.valid {
                return Err(desc.corrupt());
            }
            if desc.io_in_progress {
                self.io_done.wait(&mut state);
                continue;
            }
            self.write_back(&mut state, next as FrameId)?;
            next += 1;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::disk::MemoryFile;

    #[test]
    fn test_flush_file_rejects_invalid_owned_frame() {
        let pool = BufferPoolManager::new(3).unwrap();
        let file = FileHandle::new(MemoryFile::with_pages("flush", 2));

        pool.fetch_page(&file, 1).unwrap();
        pool.unpin_page(&file, 1, true).unwrap();
        pool.state.lock().frames[2].file = Some(file.clone());

        match pool.flush_file(&file) {
            Err(BufferPoolError::CorruptState { frame_id, valid, .. }) => {
                assert_eq!(frame_id, 2);
                assert!(!valid);
            }
            other => panic!("expected CorruptState, got {:?}", other),
        }

        // Nothing is released when the flush fails
        assert_eq!(pool.cached_pages(), 1);
        assert_eq!(pool.frame_of(&file, 1), Some(0));
        let snapshot = pool.snapshot();
        assert!(snapshot.frame(0).unwrap().valid);
        assert!(!snapshot.frame(0).unwrap().dirty);

        pool.state.lock().frames[2].file = None;
        pool.flush_file(&file).unwrap();
        assert_eq!(pool.cached_pages(), 0);
    }
}
