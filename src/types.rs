//! Bridge types and protocol constants

/// Number of logical DDC channels carried by the hardware stream
pub const NUM_DDC: usize = 10;

/// Marker byte at offset 7 of every 8-byte frame header word
pub const FRAME_MARKER: u8 = 0x80;

/// Bytes per 8-byte hardware stream word
pub const WORD_BYTES: usize = 8;

/// Bytes one decoded I/Q sample occupies after demultiplexing
/// (three 16-bit words of the four in the raw slot)
pub const IQ_SAMPLE_BYTES: usize = 6;

/// I/Q samples carried by one outgoing datagram
pub const SAMPLES_PER_PACKET: usize = 238;

/// Payload bytes of one outgoing datagram
pub const PACKET_PAYLOAD_BYTES: usize = IQ_SAMPLE_BYTES * SAMPLES_PER_PACKET;

/// Total size of one outgoing datagram, header included
pub const PACKET_BYTES: usize = 16 + PACKET_PAYLOAD_BYTES;

/// Endpoint/type code identifying DDC I/Q data on the wire
pub const IQ_TYPE_CODE: u16 = 24;

/// Snapshot of the hardware FIFO monitor, read on demand and never cached
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FifoStatus {
    /// Words currently buffered in the hardware FIFO
    pub depth_words: u32,

    /// FIFO overflowed since last read
    pub overflowed: bool,

    /// FIFO underflowed since last read
    pub underflowed: bool,

    /// Occupancy crossed the hardware alarm threshold
    pub over_threshold: bool,
}

/// Diagnostic alarm bits accumulated into the shared bitmask
pub mod alarm {
    /// RX DDC FIFO crossed its over-threshold mark
    pub const DDC_FIFO_OVER_THRESHOLD: u32 = 1 << 0;
}

/// Lifecycle state of the streaming worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Not streaming; servicing per-channel commands
    Idle,
    /// Resetting session state and enabling the hardware stream
    Starting,
    /// Running the decode/packetize/flow-control loop
    Streaming,
    /// Tearing down after a session-fatal error
    Faulting,
}
