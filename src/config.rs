//! Bridge configuration

use std::net::IpAddr;
use std::time::Duration;

/// Configuration for the DDC streaming worker
///
/// Defaults mirror the hardware bring-up values: a 128 KiB DMA arena,
/// matching per-channel arenas, and the stream window of the XDMA
/// character device.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Path to the DMA stream character device
    pub stream_device_path: String,

    /// Path to the register window character device
    pub register_device_path: String,

    /// Offset of the DDC stream read window within the device
    pub stream_read_offset: u64,

    /// Capacity of the raw DMA arena in bytes
    pub dma_buffer_size: usize,

    /// Capacity of each per-channel sample arena in bytes
    pub channel_buffer_size: usize,

    /// Destination address for outgoing datagrams
    pub dest_addr: IpAddr,

    /// UDP port of DDC channel 0; channel n uses `base_port + n`
    pub base_port: u16,

    /// Poll interval while Idle, waiting for activation
    pub idle_poll: Duration,

    /// Poll interval while waiting for FIFO occupancy
    pub occupancy_poll: Duration,

    /// Bursts to run before over-threshold alarms are believed
    pub startup_grace_bursts: u32,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            stream_device_path: "/dev/xdma0_c2h_0".to_string(),
            register_device_path: "/dev/xdma0_user".to_string(),
            stream_read_offset: 0x1000,
            dma_buffer_size: 128 * 1024,
            channel_buffer_size: 128 * 1024,
            dest_addr: IpAddr::from([127, 0, 0, 1]),
            base_port: 1035,
            idle_poll: Duration::from_micros(100),
            occupancy_poll: Duration::from_micros(500),
            startup_grace_bursts: 100,
        }
    }
}

impl BridgeConfig {
    /// Builder: set the destination address
    pub fn dest_addr(mut self, addr: IpAddr) -> Self {
        self.dest_addr = addr;
        self
    }

    /// Builder: set the channel-0 destination port
    pub fn base_port(mut self, port: u16) -> Self {
        self.base_port = port;
        self
    }

    /// Builder: set the raw DMA arena capacity
    pub fn dma_buffer_size(mut self, size: usize) -> Self {
        self.dma_buffer_size = size;
        self
    }

    /// Builder: set the per-channel arena capacity
    pub fn channel_buffer_size(mut self, size: usize) -> Self {
        self.channel_buffer_size = size;
        self
    }

    /// Builder: set the startup grace period in bursts
    pub fn startup_grace_bursts(mut self, bursts: u32) -> Self {
        self.startup_grace_bursts = bursts;
        self
    }
}
