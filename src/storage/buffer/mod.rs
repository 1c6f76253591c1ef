pub mod config;
pub mod error;
pub mod frame;
pub mod manager;
pub mod page_table;
mod replacer;

pub use config::BufferPoolConfig;
pub use error::BufferPoolError;
pub use manager::{BufferPoolManager, FrameSnapshot, PageRef, PoolSnapshot, PoolStats};
pub use page_table::{PageTable, PageTableError};
