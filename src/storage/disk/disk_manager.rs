use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use byteorder::{ByteOrder, LittleEndian};
use log::debug;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::common::types::{INVALID_PAGE_ID, PAGE_SIZE, Page, PageId};
use crate::storage::disk::PageFile;

const FILE_MAGIC: u32 = 0x434c_4b50;

/// Bytes in front of every page on disk
pub const SLOT_HEADER_SIZE: usize = 16;

const SLOT_SIZE: usize = SLOT_HEADER_SIZE + PAGE_SIZE;

#[derive(Error, Debug)]
pub enum DiskManagerError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Invalid page ID: {0}")]
    InvalidPageId(PageId),
    #[error("Page {0} is not allocated")]
    PageNotAllocated(PageId),
    #[error("Corrupt page file: {0}")]
    CorruptFile(String),
    #[error("Header encoding error: {0}")]
    Encoding(#[from] bincode::Error),
}

/// Header stored in slot 0 of every page file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileHeader {
    magic: u32,
    /// Number of page slots ever allocated; page ids run from 1 to this
    pub num_pages: u32,
    /// First page of the free chain, or 0 when empty
    pub free_head: PageId,
    pub num_free: u32,
}

impl FileHeader {
    fn new() -> Self {
        Self {
            magic: FILE_MAGIC,
            num_pages: 0,
            free_head: INVALID_PAGE_ID,
            num_free: 0,
        }
    }

    /// Pages currently allocated and not deleted
    pub fn used_pages(&self) -> u32 {
        self.num_pages - self.num_free
    }
}

// Layout: page_id u32 | in_use u8 | pad 3 | next_free u32 | reserved 4
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SlotHeader {
    page_id: PageId,
    in_use: bool,
    next_free: PageId,
}

impl SlotHeader {
    fn to_bytes(self) -> [u8; SLOT_HEADER_SIZE] {
        let mut buf = [0u8; SLOT_HEADER_SIZE];
        LittleEndian::write_u32(&mut buf[0..4], self.page_id);
        buf[4] = self.in_use as u8;
        LittleEndian::write_u32(&mut buf[8..12], self.next_free);
        buf
    }

    fn from_bytes(buf: &[u8]) -> Self {
        Self {
            page_id: LittleEndian::read_u32(&buf[0..4]),
            in_use: buf[4] != 0,
            next_free: LittleEndian::read_u32(&buf[8..12]),
        }
    }
}

struct DiskFileInner {
    file: File,
    header: FileHeader,
}

/// DiskFile stores pages in a single file on disk.
///
/// Deleted pages are chained into a free list and reused by later
/// allocations.
pub struct DiskFile {
    path: PathBuf,
    name: String,
    inner: Mutex<DiskFileInner>,
}

impl DiskFile {
    /// Open a page file, initializing it when missing or empty
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DiskManagerError> {
        let path = path.as_ref().to_path_buf();
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        let header = if file.metadata()?.len() == 0 {
            let header = FileHeader::new();
            Self::init_file(&mut file, &header)?;
            header
        } else {
            Self::load_header(&mut file)?
        };

        Ok(Self::from_parts(path, file, header))
    }

    /// Create an empty page file, discarding any previous contents
    pub fn create(path: impl AsRef<Path>) -> Result<Self, DiskManagerError> {
        let path = path.as_ref().to_path_buf();
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)?;

        let header = FileHeader::new();
        Self::init_file(&mut file, &header)?;
        Ok(Self::from_parts(path, file, header))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn header(&self) -> FileHeader {
        self.inner.lock().header
    }

    fn from_parts(path: PathBuf, file: File, header: FileHeader) -> Self {
        let name = path.to_string_lossy().into_owned();
        Self {
            path,
            name,
            inner: Mutex::new(DiskFileInner { file, header }),
        }
    }

    fn init_file(file: &mut File, header: &FileHeader) -> Result<(), DiskManagerError> {
        write_header(file, header)?;
        file.set_len(SLOT_SIZE as u64)?;
        file.flush()?;
        Ok(())
    }

    fn load_header(file: &mut File) -> Result<FileHeader, DiskManagerError> {
        let mut buf = vec![0u8; SLOT_SIZE];
        file.seek(SeekFrom::Start(0))?;
        file.read_exact(&mut buf)?;

        let header: FileHeader = bincode::deserialize(&buf)?;
        if header.magic != FILE_MAGIC {
            return Err(DiskManagerError::CorruptFile(format!(
                "bad magic number {:#x}",
                header.magic
            )));
        }
        Ok(header)
    }
}

fn write_header(file: &mut File, header: &FileHeader) -> Result<(), DiskManagerError> {
    let bytes = bincode::serialize(header)?;
    file.seek(SeekFrom::Start(0))?;
    file.write_all(&bytes)?;
    Ok(())
}

fn slot_offset(page_id: PageId) -> u64 {
    page_id as u64 * SLOT_SIZE as u64
}

impl DiskFileInner {
    fn check_bounds(&self, page_id: PageId) -> Result<(), DiskManagerError> {
        if page_id == INVALID_PAGE_ID {
            return Err(DiskManagerError::InvalidPageId(page_id));
        }
        if page_id > self.header.num_pages {
            return Err(DiskManagerError::PageNotAllocated(page_id));
        }
        Ok(())
    }

    fn read_slot_header(&mut self, page_id: PageId) -> Result<SlotHeader, DiskManagerError> {
        let mut buf = [0u8; SLOT_HEADER_SIZE];
        self.file.seek(SeekFrom::Start(slot_offset(page_id)))?;
        self.file.read_exact(&mut buf)?;

        let slot = SlotHeader::from_bytes(&buf);
        if slot.page_id != page_id {
            return Err(DiskManagerError::CorruptFile(format!(
                "slot {} is labelled as page {}",
                page_id, slot.page_id
            )));
        }
        Ok(slot)
    }

    fn write_slot(&mut self, slot: SlotHeader, data: &[u8; PAGE_SIZE]) -> Result<(), DiskManagerError> {
        self.file.seek(SeekFrom::Start(slot_offset(slot.page_id)))?;
        self.file.write_all(&slot.to_bytes())?;
        self.file.write_all(data)?;
        Ok(())
    }

    fn write_slot_header(&mut self, slot: SlotHeader) -> Result<(), DiskManagerError> {
        self.file.seek(SeekFrom::Start(slot_offset(slot.page_id)))?;
        self.file.write_all(&slot.to_bytes())?;
        Ok(())
    }

    fn sync_header(&mut self) -> Result<(), DiskManagerError> {
        write_header(&mut self.file, &self.header)?;
        self.file.flush()?;
        Ok(())
    }
}

impl PageFile for DiskFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn read_page(&self, page_id: PageId) -> Result<Page, DiskManagerError> {
        let mut inner = self.inner.lock();
        inner.check_bounds(page_id)?;

        let mut buf = vec![0u8; SLOT_SIZE];
        inner.file.seek(SeekFrom::Start(slot_offset(page_id)))?;
        inner.file.read_exact(&mut buf)?;

        let slot = SlotHeader::from_bytes(&buf[..SLOT_HEADER_SIZE]);
        if slot.page_id != page_id {
            return Err(DiskManagerError::CorruptFile(format!(
                "slot {} is labelled as page {}",
                page_id, slot.page_id
            )));
        }
        if !slot.in_use {
            return Err(DiskManagerError::PageNotAllocated(page_id));
        }

        let mut page = Page::new(page_id);
        page.data.copy_from_slice(&buf[SLOT_HEADER_SIZE..]);
        Ok(page)
    }

    fn write_page(&self, page: &Page) -> Result<(), DiskManagerError> {
        let mut inner = self.inner.lock();
        inner.check_bounds(page.page_id)?;

        let slot = inner.read_slot_header(page.page_id)?;
        if !slot.in_use {
            return Err(DiskManagerError::PageNotAllocated(page.page_id));
        }

        inner.write_slot(slot, &page.data)?;
        inner.file.flush()?;
        Ok(())
    }

    fn allocate_page(&self) -> Result<Page, DiskManagerError> {
        let mut inner = self.inner.lock();

        let page_id = if inner.header.free_head != INVALID_PAGE_ID {
            let page_id = inner.header.free_head;
            let slot = inner.read_slot_header(page_id)?;
            if slot.in_use {
                return Err(DiskManagerError::CorruptFile(format!(
                    "free list head {} is in use",
                    page_id
                )));
            }
            inner.header.free_head = slot.next_free;
            inner.header.num_free -= 1;
            page_id
        } else {
            inner.header.num_pages += 1;
            inner.header.num_pages
        };

        let page = Page::new(page_id);
        let slot = SlotHeader {
            page_id,
            in_use: true,
            next_free: INVALID_PAGE_ID,
        };
        inner.write_slot(slot, &page.data)?;
        inner.sync_header()?;

        debug!("{}: allocated page {}", self.name, page_id);
        Ok(page)
    }

    fn delete_page(&self, page_id: PageId) -> Result<(), DiskManagerError> {
        let mut inner = self.inner.lock();
        inner.check_bounds(page_id)?;

        let slot = inner.read_slot_header(page_id)?;
        if !slot.in_use {
            return Err(DiskManagerError::PageNotAllocated(page_id));
        }

        let freed = SlotHeader {
            page_id,
            in_use: false,
            next_free: inner.header.free_head,
        };
        inner.write_slot_header(freed)?;
        inner.header.free_head = page_id;
        inner.header.num_free += 1;
        inner.sync_header()?;

        debug!("{}: deleted page {}", self.name, page_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn temp_disk_file() -> (DiskFile, NamedTempFile) {
        let temp = NamedTempFile::new().unwrap();
        let file = DiskFile::open(temp.path()).unwrap();
        (file, temp)
    }

    #[test]
    fn test_slot_header_layout() {
        let slot = SlotHeader {
            page_id: 7,
            in_use: true,
            next_free: 3,
        };
        let bytes = slot.to_bytes();

        assert_eq!(LittleEndian::read_u32(&bytes[0..4]), 7);
        assert_eq!(bytes[4], 1);
        assert_eq!(SlotHeader::from_bytes(&bytes), slot);
    }

    #[test]
    fn test_allocate_write_read() {
        let (file, _temp) = temp_disk_file();

        let mut page = file.allocate_page().unwrap();
        assert_eq!(page.page_id, 1);
        page.data[0..5].copy_from_slice(b"hello");
        file.write_page(&page).unwrap();

        let read = file.read_page(1).unwrap();
        assert_eq!(&read.data[0..5], b"hello");
        assert_eq!(file.header().num_pages, 1);
    }

    #[test]
    fn test_deleted_pages_are_reused() {
        let (file, _temp) = temp_disk_file();

        let first = file.allocate_page().unwrap().page_id;
        let second = file.allocate_page().unwrap().page_id;
        file.delete_page(first).unwrap();

        assert!(matches!(
            file.read_page(first),
            Err(DiskManagerError::PageNotAllocated(id)) if id == first
        ));
        assert_eq!(file.header().num_free, 1);

        let reused = file.allocate_page().unwrap().page_id;
        assert_eq!(reused, first);
        assert_ne!(reused, second);
        assert_eq!(file.header().used_pages(), 2);
    }

    #[test]
    fn test_invalid_and_unallocated_ids() {
        let (file, _temp) = temp_disk_file();

        assert!(matches!(
            file.read_page(INVALID_PAGE_ID),
            Err(DiskManagerError::InvalidPageId(0))
        ));
        assert!(matches!(
            file.write_page(&Page::new(9)),
            Err(DiskManagerError::PageNotAllocated(9))
        ));
        assert!(matches!(
            file.delete_page(9),
            Err(DiskManagerError::PageNotAllocated(9))
        ));
    }

    #[test]
    fn test_reopen_keeps_header_and_pages() {
        let temp = NamedTempFile::new().unwrap();
        {
            let file = DiskFile::open(temp.path()).unwrap();
            let mut page = file.allocate_page().unwrap();
            page.data[10] = 42;
            file.write_page(&page).unwrap();
            file.allocate_page().unwrap();
            file.delete_page(2).unwrap();
        }

        let file = DiskFile::open(temp.path()).unwrap();
        let header = file.header();
        assert_eq!(header.num_pages, 2);
        assert_eq!(header.free_head, 2);
        assert_eq!(file.read_page(1).unwrap().data[10], 42);
    }

    #[test]
    fn test_open_rejects_foreign_file() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(&[0xAB; 64]).unwrap();
        temp.flush().unwrap();

        assert!(DiskFile::open(temp.path()).is_err());
    }
}
