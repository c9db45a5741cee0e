//! Simulated hardware backend for development and testing
//!
//! Drives the streaming engine from synthetic byte streams and
//! scripted FIFO occupancy, so every pipeline path can run without an
//! FPGA attached.

use crate::error::BridgeResult;
use crate::hw::{FifoMonitor, MonitorChannel, StreamReader};
use crate::types::FifoStatus;

/// Simulated DMA stream: serves an optional one-shot prefix (e.g.
/// pre-alignment junk) and then cycles a byte pattern forever
pub struct SimStreamReader {
    prefix: Vec<u8>,
    pattern: Vec<u8>,
    prefix_pos: usize,
    pattern_pos: usize,
}

impl SimStreamReader {
    /// Stream `prefix` once, then repeat `pattern` indefinitely.
    /// `pattern` must be non-empty.
    pub fn new(prefix: Vec<u8>, pattern: Vec<u8>) -> Self {
        assert!(!pattern.is_empty());
        Self {
            prefix,
            pattern,
            prefix_pos: 0,
            pattern_pos: 0,
        }
    }

    /// Cycle one pattern with no prefix
    pub fn cyclic(pattern: Vec<u8>) -> Self {
        Self::new(Vec::new(), pattern)
    }
}

impl StreamReader for SimStreamReader {
    fn read_burst(&mut self, buf: &mut [u8], _offset: u64) -> BridgeResult<()> {
        for byte in buf.iter_mut() {
            if self.prefix_pos < self.prefix.len() {
                *byte = self.prefix[self.prefix_pos];
                self.prefix_pos += 1;
            } else {
                *byte = self.pattern[self.pattern_pos];
                self.pattern_pos = (self.pattern_pos + 1) % self.pattern.len();
            }
        }
        Ok(())
    }
}

/// Simulated FIFO monitor with scripted occupancy
pub struct SimFifoMonitor {
    /// Depth script, cycled across reads
    depths: Vec<u32>,
    /// Flags applied to every status readout
    template: FifoStatus,
    reads: usize,
    stream_enabled: bool,
    fifo_resets: usize,
}

impl SimFifoMonitor {
    /// Report the same occupancy on every read
    pub fn with_constant_depth(depth_words: u32) -> Self {
        Self::with_depths(vec![depth_words])
    }

    /// Report each scripted occupancy in turn, cycling the script
    pub fn with_depths(depths: Vec<u32>) -> Self {
        assert!(!depths.is_empty());
        Self {
            depths,
            template: FifoStatus::default(),
            reads: 0,
            stream_enabled: false,
            fifo_resets: 0,
        }
    }

    /// Report a fixed full status (depth and flags) on every read
    pub fn with_status(status: FifoStatus) -> Self {
        Self {
            depths: vec![status.depth_words],
            template: status,
            reads: 0,
            stream_enabled: false,
            fifo_resets: 0,
        }
    }

    /// Status reads performed so far
    pub fn reads(&self) -> usize {
        self.reads
    }

    /// Current state of the DDC stream gate
    pub fn stream_enabled(&self) -> bool {
        self.stream_enabled
    }

    /// FIFO resets issued so far
    pub fn fifo_resets(&self) -> usize {
        self.fifo_resets
    }
}

impl FifoMonitor for SimFifoMonitor {
    fn configure_channel(&mut self, _channel: MonitorChannel) -> BridgeResult<()> {
        Ok(())
    }

    fn read_status(&mut self, _channel: MonitorChannel) -> BridgeResult<FifoStatus> {
        let depth = self.depths[self.reads % self.depths.len()];
        self.reads += 1;
        Ok(FifoStatus {
            depth_words: depth,
            ..self.template
        })
    }

    fn set_ddc_stream_enabled(&mut self, enabled: bool) -> BridgeResult<()> {
        self.stream_enabled = enabled;
        Ok(())
    }

    fn reset_stream_fifo(&mut self, _channel: MonitorChannel) -> BridgeResult<()> {
        self.fifo_resets += 1;
        Ok(())
    }
}
