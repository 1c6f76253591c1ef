use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::common::types::{FileId, Page, PageId};
use crate::storage::disk::DiskManagerError;

static NEXT_FILE_ID: AtomicU64 = AtomicU64::new(1);

/// Stable storage for fixed-size pages.
///
/// The buffer pool never interprets page bytes; it only moves whole pages
/// between a `PageFile` and its frames.
pub trait PageFile: Send + Sync {
    /// Human readable name, used in errors and diagnostics
    fn name(&self) -> &str;

    /// Read an allocated page
    fn read_page(&self, page_id: PageId) -> Result<Page, DiskManagerError>;

    /// Write a page back to the slot named by `page.page_id`
    fn write_page(&self, page: &Page) -> Result<(), DiskManagerError>;

    /// Allocate a fresh zeroed page and return it
    fn allocate_page(&self) -> Result<Page, DiskManagerError>;

    /// Release a page so that its id may be reused
    fn delete_page(&self, page_id: PageId) -> Result<(), DiskManagerError>;
}

/// An open file as seen by the buffer pool.
///
/// Every call to [`FileHandle::new`] or [`FileHandle::from_arc`] yields a new
/// identity, even for the same underlying storage. Cloning a handle is the
/// only way to alias it.
#[derive(Clone)]
pub struct FileHandle {
    id: FileId,
    file: Arc<dyn PageFile>,
}

impl FileHandle {
    pub fn new<F: PageFile + 'static>(file: F) -> Self {
        Self::from_arc(Arc::new(file))
    }

    pub fn from_arc(file: Arc<dyn PageFile>) -> Self {
        Self {
            id: NEXT_FILE_ID.fetch_add(1, Ordering::Relaxed),
            file,
        }
    }

    pub fn id(&self) -> FileId {
        self.id
    }

    pub fn name(&self) -> &str {
        self.file.name()
    }
}

impl Deref for FileHandle {
    type Target = dyn PageFile;

    fn deref(&self) -> &Self::Target {
        self.file.as_ref()
    }
}

impl PartialEq for FileHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for FileHandle {}

impl Hash for FileHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for FileHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.file.name(), self.id)
    }
}

impl fmt::Display for FileHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file.name())
    }
}
