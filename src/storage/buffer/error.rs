use thiserror::Error;

use crate::common::types::{FrameId, PageId};
use crate::storage::buffer::page_table::PageTableError;
use crate::storage::disk::DiskManagerError;

#[derive(Error, Debug)]
pub enum BufferPoolError {
    #[error("Buffer pool exhausted: all {pool_size} frames are pinned")]
    PoolExhausted { pool_size: usize },
    #[error("Page {page_id} of {file} in frame {frame_id} is not pinned")]
    NotPinned {
        file: String,
        page_id: PageId,
        frame_id: FrameId,
    },
    #[error("Page {page_id} of {file} in frame {frame_id} is pinned")]
    PagePinned {
        file: String,
        page_id: PageId,
        frame_id: FrameId,
    },
    #[error("Corrupt frame {frame_id}: valid={valid} dirty={dirty} referenced={referenced}")]
    CorruptState {
        frame_id: FrameId,
        valid: bool,
        dirty: bool,
        referenced: bool,
    },
    #[error("Stale page handle for frame {frame_id}: the frame has been reused")]
    StaleHandle { frame_id: FrameId },
    #[error("Page table error: {0}")]
    PageTable(#[from] PageTableError),
    #[error("Disk manager error: {0}")]
    DiskManagerError(#[from] DiskManagerError),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
}
