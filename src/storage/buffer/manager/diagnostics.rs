use std::fmt;

use log::info;

use crate::common::types::{FileId, FrameId, PageId};
use super::BufferPoolManager;

/// Counters kept by the buffer pool since it was created
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub writebacks: u64,
}

/// State of one frame at the time of a snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameSnapshot {
    pub frame_id: FrameId,
    pub file: Option<String>,
    pub file_id: Option<FileId>,
    pub page_id: PageId,
    pub valid: bool,
    pub dirty: bool,
    pub referenced: bool,
    pub pin_count: u32,
}

/// Point-in-time copy of the frame directory
#[derive(Debug, Clone)]
pub struct PoolSnapshot {
    pub frames: Vec<FrameSnapshot>,
    pub valid_frames: usize,
    pub hand: FrameId,
    pub stats: PoolStats,
}

impl PoolSnapshot {
    pub fn frame(&self, frame_id: FrameId) -> Option<&FrameSnapshot> {
        self.frames.get(frame_id as usize)
    }

    pub fn pinned_frames(&self) -> usize {
        self.frames.iter().filter(|frame| frame.pin_count > 0).count()
    }

    pub fn dirty_frames(&self) -> usize {
        self.frames.iter().filter(|frame| frame.dirty).count()
    }
}

impl BufferPoolManager {
    pub fn snapshot(&self) -> PoolSnapshot {
        let state = self.state.lock();

        let frames: Vec<FrameSnapshot> = state
            .frames
            .iter()
            .map(|desc| FrameSnapshot {
                frame_id: desc.frame_id(),
                file: desc.file.as_ref().map(|file| file.name().to_string()),
                file_id: desc.file.as_ref().map(|file| file.id()),
                page_id: desc.page_id,
                valid: desc.valid,
                dirty: desc.dirty,
                referenced: desc.referenced,
                pin_count: desc.pin_count,
            })
            .collect();
        let valid_frames = frames.iter().filter(|frame| frame.valid).count();

        PoolSnapshot {
            frames,
            valid_frames,
            hand: state.replacer.hand(),
            stats: state.stats,
        }
    }

    /// Write the frame directory to the log, one line per frame
    pub fn log_state(&self) {
        for line in self.snapshot().to_string().lines() {
            info!("{}", line);
        }
    }
}

impl fmt::Display for FrameSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "frame {:>4}  file {:<16}  page {:>6}  valid {}  dirty {}  ref {}  pins {}",
            self.frame_id,
            self.file.as_deref().unwrap_or("-"),
            self.page_id,
            self.valid as u8,
            self.dirty as u8,
            self.referenced as u8,
            self.pin_count
        )
    }
}

impl fmt::Display for PoolSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for frame in &self.frames {
            writeln!(f, "{}", frame)?;
        }
        write!(f, "Total number of valid frames: {}", self.valid_frames)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::disk::{FileHandle, MemoryFile};

    #[test]
    fn test_snapshot_reports_frames() {
        let pool = BufferPoolManager::new(3).unwrap();
        let file = FileHandle::new(MemoryFile::with_pages("diag", 4));

        pool.fetch_page(&file, 1).unwrap();
        pool.fetch_page(&file, 2).unwrap();
        pool.unpin_page(&file, 2, true).unwrap();

        let snapshot = pool.snapshot();
        assert_eq!(snapshot.valid_frames, 2);
        assert_eq!(snapshot.pinned_frames(), 1);
        assert_eq!(snapshot.dirty_frames(), 1);
        assert_eq!(snapshot.stats.misses, 2);

        let frame = snapshot.frame(1).unwrap();
        assert_eq!(frame.page_id, 2);
        assert_eq!(frame.file.as_deref(), Some("diag"));
        assert_eq!(frame.file_id, Some(file.id()));
        assert!(!snapshot.frame(2).unwrap().valid);

        pool.unpin_page(&file, 1, false).unwrap();
    }

    #[test]
    fn test_display_ends_with_valid_count() {
        let pool = BufferPoolManager::new(2).unwrap();
        let file = FileHandle::new(MemoryFile::with_pages("diag", 1));
        pool.fetch_page(&file, 1).unwrap();

        let text = pool.snapshot().to_string();
        assert_eq!(text.lines().count(), 3);
        assert!(text.ends_with("Total number of valid frames: 1"));
        assert!(text.lines().next().unwrap().contains("page      1"));
    }
}
