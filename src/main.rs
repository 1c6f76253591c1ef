use anyhow::Result;

use clockpool::storage::buffer::BufferPoolManager;
use clockpool::storage::disk::{DiskFile, FileHandle};

fn main() -> Result<()> {
    // Create a page file
    let file = FileHandle::new(DiskFile::open("database.db")?);

    // Create buffer pool manager with 1000 frames
    let buffer_pool = BufferPoolManager::new(1000)?;

    // Example: Create a new page
    let (page_id, page) = buffer_pool.new_page(&file)?;
    println!("Created new page with ID: {}", page_id);

    // Example: Write into the cached page
    {
        let mut page_guard = page.write()?;
        let data = b"Hello, Database!";
        page_guard.data[..data.len()].copy_from_slice(data);
    }

    // Unpin the page when done (with dirty flag)
    buffer_pool.unpin_page(&file, page_id, true)?;

    // Write the page back and release its frame
    buffer_pool.flush_file(&file)?;
    println!("{}", buffer_pool.snapshot());

    Ok(())
}
