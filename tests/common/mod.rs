#![allow(dead_code)]

use std::sync::Arc;

use anyhow::Result;
use tempfile::NamedTempFile;

use clockpool::storage::buffer::BufferPoolManager;
use clockpool::storage::disk::{DiskFile, FileHandle, MemoryFile};

// Create a buffer pool with an in-memory file that already holds `pages` pages
pub fn create_memory_pool(pool_size: usize, pages: u32) -> Result<(BufferPoolManager, FileHandle, Arc<MemoryFile>)> {
    let memory = Arc::new(MemoryFile::with_pages("mem", pages));
    let file = FileHandle::from_arc(memory.clone());
    let buffer_pool = BufferPoolManager::new(pool_size)?;
    Ok((buffer_pool, file, memory))
}

// Create a buffer pool over a page file in a temporary location
pub fn create_disk_pool(pool_size: usize) -> Result<(BufferPoolManager, FileHandle, NamedTempFile)> {
    let temp_file = NamedTempFile::new()?;
    let file = FileHandle::new(DiskFile::open(temp_file.path())?);
    let buffer_pool = BufferPoolManager::new(pool_size)?;
    Ok((buffer_pool, file, temp_file))
}

// Generate test data of specified size
pub fn generate_test_data(size: usize) -> Vec<u8> {
    (0..size).map(|i| (i % 256) as u8).collect()
}
