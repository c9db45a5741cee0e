//! Adaptive DMA flow control
//!
//! Before every burst the hardware FIFO monitor is read and the next
//! transfer size is derived from occupancy: deeper FIFO, bigger burst.
//! The burst is only issued once the FIFO holds at least the chosen
//! transfer, so the device read never drains past real data.

use std::time::Duration;

use crate::control::SharedControl;
use crate::error::BridgeResult;
use crate::hw::{FifoMonitor, MonitorChannel};
use crate::types::alarm;

/// Occupancy thresholds in hardware words and the matching transfer
/// sizes in bytes (one word is 8 bytes)
const SIZE_STEPS: [(u32, usize); 3] = [(4096, 32768), (2048, 16384), (1024, 8192)];

/// Smallest burst, used whenever occupancy is at or below every step
const MIN_TRANSFER_BYTES: usize = 4096;

/// Map FIFO occupancy to the next burst size. Non-decreasing step
/// function of the occupancy word count.
pub fn transfer_size_for_depth(depth_words: u32) -> usize {
    for &(threshold, bytes) in &SIZE_STEPS {
        if depth_words > threshold {
            return bytes;
        }
    }
    MIN_TRANSFER_BYTES
}

/// Flow controller for the DDC stream FIFO
///
/// Tracks the startup grace period during which over-threshold alarms
/// are suppressed; the FIFO legitimately runs high while the stream
/// spins up.
pub struct FlowController {
    poll: Duration,
    grace_bursts: u32,
}

impl FlowController {
    pub fn new(poll: Duration, grace_bursts: u32) -> Self {
        Self { poll, grace_bursts }
    }

    /// Reset the grace period at session start
    pub fn reset_session(&mut self, grace_bursts: u32) {
        self.grace_bursts = grace_bursts;
    }

    /// Decide the next burst size, waiting until the FIFO holds enough
    /// words to satisfy it. Over-threshold conditions seen after the
    /// grace period accumulate into the shared diagnostic bitmask.
    pub fn next_transfer<M: FifoMonitor>(
        &mut self,
        monitor: &mut M,
        control: &SharedControl,
    ) -> BridgeResult<usize> {
        loop {
            let status = monitor.read_status(MonitorChannel::DdcStream)?;
            if status.over_threshold {
                if self.grace_bursts == 0 {
                    control.raise_alarm(alarm::DDC_FIFO_OVER_THRESHOLD);
                    if control.debug_enabled() {
                        tracing::debug!(
                            depth = status.depth_words,
                            "RX DDC FIFO over threshold"
                        );
                    }
                } // suppressed during spin-up
            }

            let size = transfer_size_for_depth(status.depth_words);
            if status.depth_words as usize >= size / 8 {
                self.grace_bursts = self.grace_bursts.saturating_sub(1);
                return Ok(size);
            }
            std::thread::sleep(self.poll);
        }
    }
}
