pub mod disk_manager;
pub mod file;
pub mod memory;

pub use disk_manager::{DiskFile, DiskManagerError, FileHeader};
pub use file::{FileHandle, PageFile};
pub use memory::{IoStats, MemoryFile};
