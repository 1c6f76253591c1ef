use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::common::types::{INVALID_PAGE_ID, PAGE_SIZE, Page, PageId};
use crate::storage::disk::{DiskManagerError, PageFile};

/// Counters of the I/O requests a [`MemoryFile`] has served
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IoStats {
    pub reads: u64,
    pub writes: u64,
    pub allocations: u64,
    pub deletions: u64,
}

#[derive(Default)]
struct MemoryPages {
    pages: HashMap<PageId, Box<[u8; PAGE_SIZE]>>,
    writes_per_page: HashMap<PageId, u64>,
    free: Vec<PageId>,
    num_pages: PageId,
}

/// A page file kept entirely in memory.
///
/// Besides the storage itself it counts every request and can be told to
/// fail reads or writes, which makes buffer pool behavior observable.
pub struct MemoryFile {
    name: String,
    inner: Mutex<MemoryPages>,
    reads: AtomicU64,
    writes: AtomicU64,
    allocations: AtomicU64,
    deletions: AtomicU64,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemoryFile {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inner: Mutex::new(MemoryPages::default()),
            reads: AtomicU64::new(0),
            writes: AtomicU64::new(0),
            allocations: AtomicU64::new(0),
            deletions: AtomicU64::new(0),
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// Create a file that already holds `count` zeroed pages (ids 1..=count)
    pub fn with_pages(name: impl Into<String>, count: u32) -> Self {
        let file = Self::new(name);
        {
            let mut inner = file.inner.lock();
            for page_id in 1..=count {
                inner.pages.insert(page_id, Box::new([0u8; PAGE_SIZE]));
            }
            inner.num_pages = count;
        }
        file
    }

    pub fn stats(&self) -> IoStats {
        IoStats {
            reads: self.reads.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            allocations: self.allocations.load(Ordering::Relaxed),
            deletions: self.deletions.load(Ordering::Relaxed),
        }
    }

    /// Number of successful writes that targeted `page_id`
    pub fn write_count(&self, page_id: PageId) -> u64 {
        self.inner
            .lock()
            .writes_per_page
            .get(&page_id)
            .copied()
            .unwrap_or(0)
    }

    pub fn contains(&self, page_id: PageId) -> bool {
        self.inner.lock().pages.contains_key(&page_id)
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

impl PageFile for MemoryFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn read_page(&self, page_id: PageId) -> Result<Page, DiskManagerError> {
        if page_id == INVALID_PAGE_ID {
            return Err(DiskManagerError::InvalidPageId(page_id));
        }
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(io::Error::other(format!("injected read fault on page {}", page_id)).into());
        }

        let inner = self.inner.lock();
        let data = inner
            .pages
            .get(&page_id)
            .ok_or(DiskManagerError::PageNotAllocated(page_id))?;

        let mut page = Page::new(page_id);
        page.data.copy_from_slice(data.as_slice());
        self.reads.fetch_add(1, Ordering::Relaxed);
        Ok(page)
    }

    fn write_page(&self, page: &Page) -> Result<(), DiskManagerError> {
        if page.page_id == INVALID_PAGE_ID {
            return Err(DiskManagerError::InvalidPageId(page.page_id));
        }
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(io::Error::other(format!("injected write fault on page {}", page.page_id)).into());
        }

        let mut inner = self.inner.lock();
        let data = inner
            .pages
            .get_mut(&page.page_id)
            .ok_or(DiskManagerError::PageNotAllocated(page.page_id))?;
        data.copy_from_slice(&page.data);
        *inner.writes_per_page.entry(page.page_id).or_insert(0) += 1;

        self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn allocate_page(&self) -> Result<Page, DiskManagerError> {
        let mut inner = self.inner.lock();
        let page_id = match inner.free.pop() {
            Some(page_id) => page_id,
            None => {
                inner.num_pages += 1;
                inner.num_pages
            }
        };
        inner.pages.insert(page_id, Box::new([0u8; PAGE_SIZE]));

        self.allocations.fetch_add(1, Ordering::Relaxed);
        Ok(Page::new(page_id))
    }

    fn delete_page(&self, page_id: PageId) -> Result<(), DiskManagerError> {
        if page_id == INVALID_PAGE_ID {
            return Err(DiskManagerError::InvalidPageId(page_id));
        }

        let mut inner = self.inner.lock();
        if inner.pages.remove(&page_id).is_none() {
            return Err(DiskManagerError::PageNotAllocated(page_id));
        }
        inner.free.push(page_id);

        self.deletions.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}
