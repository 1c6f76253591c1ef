use log::trace;

use crate::common::types::FrameId;
use crate::storage::buffer::error::BufferPoolError;
use crate::storage::buffer::frame::FrameDesc;

/// Clock (second chance) page replacement policy.
///
/// The hand sweeps the frame directory in circular order. A referenced frame
/// has its reference bit cleared and is passed over once; the first valid,
/// unreferenced, unpinned frame becomes the victim. Invalid frames are
/// handed out immediately.
pub struct ClockReplacer {
    hand: usize,
    pool_size: usize,
}

impl ClockReplacer {
    pub fn new(pool_size: usize) -> Self {
        // The first advance lands on frame 0
        Self {
            hand: pool_size.saturating_sub(1),
            pool_size,
        }
    }

    pub fn hand(&self) -> FrameId {
        self.hand as FrameId
    }

    fn advance(&mut self) {
        self.hand = (self.hand + 1) % self.pool_size;
    }

    /// Choose a frame to host a page.
    ///
    /// The returned frame is either invalid or evictable; evicting it
    /// (writeback, page table removal) is the caller's job. Fails with
    /// `PoolExhausted` once `pool_size` busy frames are met in a row, i.e. a
    /// whole revolution without a single candidate.
    pub fn victim(&mut self, frames: &mut [FrameDesc]) -> Result<FrameId, BufferPoolError> {
        debug_assert_eq!(frames.len(), self.pool_size);
        let mut busy = 0;

        loop {
            self.advance();
            let desc = &mut frames[self.hand];

            if !desc.valid {
                return Ok(self.hand as FrameId);
            }

            if desc.io_in_progress {
                busy += 1;
            } else if desc.referenced {
                desc.referenced = false;
                busy = 0;
                continue;
            } else if desc.is_evictable() {
                trace!("clock picked frame {} (page {})", self.hand, desc.page_id);
                return Ok(self.hand as FrameId);
            } else {
                busy += 1;
            }

            if busy >= self.pool_size {
                return Err(BufferPoolError::PoolExhausted {
                    pool_size: self.pool_size,
                });
            }
        }
    }
}
