/// Reassembly of fixed-length frames from the raw serial byte stream
///
/// The wire format has no start marker or length field. Frames are
/// separated by idle time on the line, so a pause longer than the
/// inactivity gap discards whatever partial frame has been collected.
use log::debug;
use tokio::time::{Duration, Instant};

use super::frame::{RawFrame, FRAME_LEN};

/// Running counters for one synchronizer
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SyncStats {
    pub frames: u64,
    pub checksum_failures: u64,
    pub resyncs: u64,
}

#[derive(Debug)]
pub struct StreamSynchronizer {
    buffer: [u8; FRAME_LEN],
    cursor: usize,
    last_received: Option<Instant>,
    inactivity_gap: Duration,
    stats: SyncStats,
}

impl StreamSynchronizer {
    pub fn new(inactivity_gap: Duration) -> Self {
        Self {
            buffer: [0; FRAME_LEN],
            cursor: 0,
            last_received: None,
            inactivity_gap,
            stats: SyncStats::default(),
        }
    }

    /// Feed one byte received at `now`
    ///
    /// Returns a frame once a full block has been collected and its
    /// checksum matches. A block with a bad checksum is dropped and
    /// collection starts over with the next byte.
    pub fn push(&mut self, byte: u8, now: Instant) -> Option<RawFrame> {
        if let Some(last) = self.last_received {
            if now.saturating_duration_since(last) > self.inactivity_gap && self.cursor > 0 {
                debug!(
                    "Line idle for more than {} ms, discarding {} buffered bytes",
                    self.inactivity_gap.as_millis(),
                    self.cursor
                );
                self.stats.resyncs += 1;
                self.cursor = 0;
            }
        }
        self.last_received = Some(now);

        if self.cursor < FRAME_LEN {
            self.buffer[self.cursor] = byte;
            self.cursor += 1;
        }

        if self.cursor < FRAME_LEN {
            return None;
        }

        self.cursor = 0;
        match RawFrame::try_from(self.buffer) {
            Ok(frame) => {
                self.stats.frames += 1;
                Some(frame)
            }
            Err(mismatch) => {
                debug!("Discarding frame: {}", mismatch);
                self.stats.checksum_failures += 1;
                None
            }
        }
    }

    /// Forget any partial frame, e.g. after the port was reopened
    pub fn reset(&mut self) {
        self.cursor = 0;
        self.last_received = None;
    }

    pub fn stats(&self) -> SyncStats {
        self.stats
    }
}
