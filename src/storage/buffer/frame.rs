use std::sync::atomic::AtomicU64;

use parking_lot::RwLock;

use crate::common::types::{FileId, FrameId, Page, PageId, INVALID_PAGE_ID};
use crate::storage::buffer::error::BufferPoolError;
use crate::storage::disk::FileHandle;

/// Bookkeeping for one buffer pool frame.
///
/// A descriptor only ever changes while the pool's state lock is held.
#[derive(Debug, Clone)]
pub struct FrameDesc {
    frame_id: FrameId,
    pub(crate) file: Option<FileHandle>,
    pub(crate) page_id: PageId,
    pub(crate) valid: bool,
    pub(crate) dirty: bool,
    pub(crate) referenced: bool,
    pub(crate) pin_count: u32,
    /// A read or writeback for this frame is running outside the state lock
    pub(crate) io_in_progress: bool,
}

impl FrameDesc {
    pub fn new(frame_id: FrameId) -> Self {
        Self {
            frame_id,
            file: None,
            page_id: INVALID_PAGE_ID,
            valid: false,
            dirty: false,
            referenced: false,
            pin_count: 0,
            io_in_progress: false,
        }
    }

    pub fn frame_id(&self) -> FrameId {
        self.frame_id
    }

    /// Take ownership of a page: valid, pinned once, referenced, clean
    pub fn set(&mut self, file: FileHandle, page_id: PageId) {
        self.file = Some(file);
        self.page_id = page_id;
        self.valid = true;
        self.dirty = false;
        self.referenced = true;
        self.pin_count = 1;
    }

    pub fn clear(&mut self) {
        self.file = None;
        self.page_id = INVALID_PAGE_ID;
        self.valid = false;
        self.dirty = false;
        self.referenced = false;
        self.pin_count = 0;
        self.io_in_progress = false;
    }

    pub fn owned_by(&self, file: &FileHandle) -> bool {
        self.file.as_ref() == Some(file)
    }

    pub fn key(&self) -> Option<(FileId, PageId)> {
        match (&self.file, self.valid) {
            (Some(file), true) => Some((file.id(), self.page_id)),
            _ => None,
        }
    }

    pub fn is_pinned(&self) -> bool {
        self.pin_count > 0
    }

    pub fn is_evictable(&self) -> bool {
        self.valid && !self.referenced && self.pin_count == 0 && !self.io_in_progress
    }

    pub(crate) fn corrupt(&self) -> BufferPoolError {
        BufferPoolError::CorruptState {
            frame_id: self.frame_id,
            valid: self.valid,
            dirty: self.dirty,
            referenced: self.referenced,
        }
    }
}

/// The bytes of one frame plus the generation used to detect stale handles
pub(crate) struct FrameSlot {
    pub(crate) page: RwLock<Page>,
    pub(crate) generation: AtomicU64,
}

impl FrameSlot {
    pub(crate) fn new() -> Self {
        Self {
            page: RwLock::new(Page::default()),
            generation: AtomicU64::new(0),
        }
    }
}
