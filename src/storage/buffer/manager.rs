pub mod basic_operations;
pub mod diagnostics;
pub mod flush;
pub mod frame_management;

use std::sync::atomic::Ordering;

use log::error;
use parking_lot::{Condvar, Mutex, RwLockReadGuard, RwLockWriteGuard};

use crate::common::types::{FrameId, Page, PageId};
use crate::storage::buffer::config::BufferPoolConfig;
use crate::storage::buffer::error::BufferPoolError;
use crate::storage::buffer::frame::{FrameDesc, FrameSlot};
use crate::storage::buffer::page_table::PageTable;
use crate::storage::buffer::replacer::ClockReplacer;
use crate::storage::disk::FileHandle;

pub use diagnostics::{FrameSnapshot, PoolSnapshot, PoolStats};

/// Metadata guarded by the pool's state lock
pub(crate) struct PoolState {
    pub(crate) frames: Vec<FrameDesc>,
    pub(crate) page_table: PageTable,
    pub(crate) replacer: ClockReplacer,
    pub(crate) stats: PoolStats,
}

/// A fixed set of frames caching pages of any number of files.
///
/// Frame metadata, the page table and the clock hand sit behind one mutex
/// that is released around every call into a [`PageFile`]. Page bytes are
/// guarded per frame and reached through [`PageRef`].
///
/// [`PageFile`]: crate::storage::disk::PageFile
pub struct BufferPoolManager {
    pub(crate) pool_size: usize,
    pub(crate) slots: Vec<FrameSlot>,
    pub(crate) state: Mutex<PoolState>,
    /// Signalled whenever a frame's I/O finishes
    pub(crate) io_done: Condvar,
}

impl BufferPoolManager {
    pub fn new(pool_size: usize) -> Result<Self, BufferPoolError> {
        Self::with_config(BufferPoolConfig::new(pool_size))
    }

    pub fn with_config(config: BufferPoolConfig) -> Result<Self, BufferPoolError> {
        config.validate()?;
        let pool_size = config.pool_size;

        let frames = (0..pool_size).map(|i| FrameDesc::new(i as FrameId)).collect();
        let slots = (0..pool_size).map(|_| FrameSlot::new()).collect();

        Ok(Self {
            pool_size,
            slots,
            state: Mutex::new(PoolState {
                frames,
                page_table: PageTable::with_capacity(pool_size),
                replacer: ClockReplacer::new(pool_size),
                stats: PoolStats::default(),
            }),
            io_done: Condvar::new(),
        })
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// Frame currently caching the page, if any
    pub fn frame_of(&self, file: &FileHandle, page_id: PageId) -> Option<FrameId> {
        self.state.lock().page_table.lookup(file.id(), page_id)
    }

    /// Number of pages currently cached
    pub fn cached_pages(&self) -> usize {
        self.state.lock().page_table.len()
    }

    pub(crate) fn page_ref(&self, frame_id: FrameId, page_id: PageId) -> PageRef<'_> {
        PageRef {
            pool: self,
            frame_id,
            page_id,
            generation: self.slots[frame_id as usize].generation.load(Ordering::Acquire),
        }
    }
}

impl Drop for BufferPoolManager {
    fn drop(&mut self) {
        if let Err(err) = self.flush_all() {
            error!("Failed to write back dirty pages on shutdown: {}", err);
        }
    }
}

/// Handle to a page pinned in the buffer pool.
///
/// The handle does not unpin on drop; pair every fetch with
/// [`BufferPoolManager::unpin_page`]. Once the frame has been handed to a
/// different page, `read` and `write` fail with `StaleHandle`.
pub struct PageRef<'a> {
    pool: &'a BufferPoolManager,
    frame_id: FrameId,
    page_id: PageId,
    generation: u64,
}

impl<'a> PageRef<'a> {
    pub fn frame_id(&self) -> FrameId {
        self.frame_id
    }

    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    pub fn read(&self) -> Result<RwLockReadGuard<'a, Page>, BufferPoolError> {
        let pool: &'a BufferPoolManager = self.pool;
        let slot = &pool.slots[self.frame_id as usize];
        let guard = slot.page.read();
        if slot.generation.load(Ordering::Acquire) != self.generation {
            return Err(BufferPoolError::StaleHandle {
                frame_id: self.frame_id,
            });
        }
        Ok(guard)
    }

    pub fn write(&self) -> Result<RwLockWriteGuard<'a, Page>, BufferPoolError> {
        let pool: &'a BufferPoolManager = self.pool;
        let slot = &pool.slots[self.frame_id as usize];
        let guard = slot.page.write();
        if slot.generation.load(Ordering::Acquire) != self.generation {
            return Err(BufferPoolError::StaleHandle {
                frame_id: self.frame_id,
            });
        }
        Ok(guard)
    }
}
