// Clockpool buffer manager

pub mod common;
pub mod storage;

// Re-export key items for convenient access
pub use common::types::{FileId, FrameId, PAGE_SIZE, Page, PageId};
pub use storage::buffer::{BufferPoolConfig, BufferPoolError, BufferPoolManager, PageRef, PoolSnapshot};
pub use storage::disk::{DiskFile, DiskManagerError, FileHandle, MemoryFile, PageFile};
