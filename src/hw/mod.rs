//! Hardware access layer
//!
//! Two seams separate the streaming engine from the device: a burst
//! reader for the DMA stream window and a FIFO monitor for occupancy
//! and stream enable control. The XDMA backend talks to the real FPGA;
//! the sim backend drives the same engine from synthetic byte streams
//! for development and tests.

use crate::error::BridgeResult;
use crate::types::FifoStatus;

pub mod sim;

#[cfg(unix)]
pub mod xdma;

/// FIFO monitor channels in the FPGA fabric
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorChannel {
    /// RX DDC sample stream (FPGA to host)
    DdcStream,
    /// TX DUC sample stream (host to FPGA)
    DucStream,
    /// Microphone audio stream
    MicStream,
    /// Speaker audio stream
    SpeakerStream,
}

impl MonitorChannel {
    /// Index of this channel in the monitor register bank
    pub fn index(self) -> usize {
        match self {
            MonitorChannel::DdcStream => 0,
            MonitorChannel::DucStream => 1,
            MonitorChannel::MicStream => 2,
            MonitorChannel::SpeakerStream => 3,
        }
    }
}

/// Synchronous, size-parameterized burst reads from the DMA stream
/// device into a caller-supplied buffer
pub trait StreamReader {
    /// Fill `buf` completely from the stream window at `offset`
    fn read_burst(&mut self, buf: &mut [u8], offset: u64) -> BridgeResult<()>;
}

/// Occupancy readout and stream gating for a hardware FIFO
pub trait FifoMonitor {
    /// Program the monitor hardware for one channel
    fn configure_channel(&mut self, channel: MonitorChannel) -> BridgeResult<()>;

    /// Read the current occupancy and alarm flags; never cached
    fn read_status(&mut self, channel: MonitorChannel) -> BridgeResult<FifoStatus>;

    /// Gate the RX DDC sample stream on or off
    fn set_ddc_stream_enabled(&mut self, enabled: bool) -> BridgeResult<()>;

    /// Reset a stream FIFO, discarding its contents
    fn reset_stream_fifo(&mut self, channel: MonitorChannel) -> BridgeResult<()>;
}
