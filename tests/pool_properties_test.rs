use std::collections::HashMap;

use anyhow::Result;
use rand::prelude::*;
use rand::rngs::StdRng;

use clockpool::storage::buffer::{BufferPoolError, BufferPoolManager};
use clockpool::storage::disk::FileHandle;

mod common;
use common::create_memory_pool;

const POOL_SIZE: usize = 4;
const PAGES: u32 = 10;

// Every cached page has exactly one valid frame and every valid frame is cached
fn assert_index_consistent(buffer_pool: &BufferPoolManager, file: &FileHandle) {
    let snapshot = buffer_pool.snapshot();
    assert!(snapshot.valid_frames <= POOL_SIZE);
    assert_eq!(snapshot.valid_frames, buffer_pool.cached_pages());

    for page_id in 1..=PAGES {
        let holders: Vec<_> = snapshot
            .frames
            .iter()
            .filter(|frame| frame.valid && frame.file_id == Some(file.id()) && frame.page_id == page_id)
            .collect();
        match buffer_pool.frame_of(file, page_id) {
            Some(frame_id) => {
                assert_eq!(holders.len(), 1);
                assert_eq!(holders[0].frame_id, frame_id);
            }
            None => assert!(holders.is_empty()),
        }
    }
}

#[test]
fn test_random_workload_keeps_invariants() -> Result<()> {
    let (buffer_pool, file, memory) = create_memory_pool(POOL_SIZE, PAGES)?;
    let mut rng = StdRng::seed_from_u64(42);
    let mut pins: HashMap<u32, u32> = HashMap::new();

    for _ in 0..2_000 {
        let page_id = rng.gen_range(1..=PAGES);
        match rng.gen_range(0..10) {
            0..=5 => match buffer_pool.fetch_page(&file, page_id) {
                Ok(page) => {
                    assert_eq!(page.read()?.page_id, page_id);
                    *pins.entry(page_id).or_insert(0) += 1;
                }
                Err(BufferPoolError::PoolExhausted { .. }) => {
                    // Only possible when every frame holds a pinned page
                    assert_eq!(buffer_pool.snapshot().pinned_frames(), POOL_SIZE);
                }
                Err(err) => return Err(err.into()),
            },
            6..=8 => {
                let held = pins.get(&page_id).copied().unwrap_or(0);
                let result = buffer_pool.unpin_page(&file, page_id, rng.gen_bool(0.5));
                if held > 0 {
                    result?;
                    pins.insert(page_id, held - 1);
                } else if buffer_pool.frame_of(&file, page_id).is_some() {
                    assert!(matches!(result, Err(BufferPoolError::NotPinned { .. })));
                } else {
                    result?;
                }
            }
            _ => buffer_pool.flush_page(&file, page_id)?,
        }

        // Pinned pages are never evicted
        let snapshot = buffer_pool.snapshot();
        for (&pinned, &count) in pins.iter().filter(|(_, count)| **count > 0) {
            let frame_id = buffer_pool.frame_of(&file, pinned).expect("pinned page was evicted");
            assert_eq!(snapshot.frame(frame_id).unwrap().pin_count, count);
        }
        assert_index_consistent(&buffer_pool, &file);
    }

    // Release everything and make sure the file can be flushed out
    for (&page_id, &count) in &pins {
        for _ in 0..count {
            buffer_pool.unpin_page(&file, page_id, false)?;
        }
    }
    buffer_pool.flush_file(&file)?;
    assert_eq!(buffer_pool.cached_pages(), 0);
    assert!(memory.stats().reads > 0);

    Ok(())
}

#[test]
fn test_capacity_bounds_cached_pages() -> Result<()> {
    let (buffer_pool, file, _memory) = create_memory_pool(POOL_SIZE, PAGES)?;

    for page_id in 1..=PAGES {
        buffer_pool.fetch_page(&file, page_id)?;
        buffer_pool.unpin_page(&file, page_id, page_id % 2 == 0)?;
        assert!(buffer_pool.cached_pages() <= POOL_SIZE);
        assert_index_consistent(&buffer_pool, &file);
    }

    assert_eq!(buffer_pool.cached_pages(), POOL_SIZE);
    Ok(())
}
