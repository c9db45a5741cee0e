//! XDMA character-device backend
//!
//! The FPGA is reached through the Xilinx XDMA driver: a stream device
//! for DMA bursts and a user window for register access, both driven
//! with positioned reads/writes at AXI offsets.

use std::fs::{File, OpenOptions};
use std::os::unix::fs::FileExt;

use crate::error::{BridgeError, BridgeResult};
use crate::hw::{FifoMonitor, MonitorChannel, StreamReader};
use crate::types::FifoStatus;

/// FIFO monitor register offsets in the user window
mod regs {
    /// Status register for monitor channel n: `STATUS_BASE + 4 * n`
    pub const STATUS_BASE: u64 = 0x9000;
    /// Configuration register for monitor channel n
    pub const CONFIG_BASE: u64 = 0x9040;
    /// FIFO reset pulse register, one bit per channel
    pub const FIFO_RESET: u64 = 0x9080;
    /// Stream gating control
    pub const STREAM_CTRL: u64 = 0x1010;

    // Status register fields
    pub const DEPTH_MASK: u32 = 0xFFFF;
    pub const STATUS_OVER_THRESHOLD: u32 = 1 << 29;
    pub const STATUS_UNDERFLOWED: u32 = 1 << 30;
    pub const STATUS_OVERFLOWED: u32 = 1 << 31;

    // Stream control bits
    pub const CTRL_DDC_ENABLE: u32 = 1 << 0;

    // Channel monitor configuration: latch-and-clear flags on read
    pub const CONFIG_LATCH_CLEAR: u32 = 1 << 0;
}

fn open_rw(path: &str) -> BridgeResult<File> {
    OpenOptions::new()
        .read(true)
        .write(true)
        .open(path)
        .map_err(|source| BridgeError::DeviceOpen {
            path: path.to_string(),
            source,
        })
}

/// DMA stream device, read with positioned bursts
pub struct XdmaStream {
    file: File,
}

impl XdmaStream {
    pub fn open(path: &str) -> BridgeResult<Self> {
        Ok(Self {
            file: open_rw(path)?,
        })
    }
}

impl StreamReader for XdmaStream {
    fn read_burst(&mut self, buf: &mut [u8], offset: u64) -> BridgeResult<()> {
        self.file.read_exact_at(buf, offset)?;
        Ok(())
    }
}

/// Register window of the FPGA, including the FIFO monitor bank
pub struct XdmaRegisters {
    file: File,
    /// Shadow of the stream control register; the hardware register is
    /// write-only
    stream_ctrl: u32,
}

impl XdmaRegisters {
    pub fn open(path: &str) -> BridgeResult<Self> {
        Ok(Self {
            file: open_rw(path)?,
            stream_ctrl: 0,
        })
    }

    fn read_u32(&self, offset: u64) -> BridgeResult<u32> {
        let mut bytes = [0u8; 4];
        self.file.read_exact_at(&mut bytes, offset)?;
        Ok(u32::from_le_bytes(bytes))
    }

    fn write_u32(&mut self, offset: u64, value: u32) -> BridgeResult<()> {
        self.file.write_all_at(&value.to_le_bytes(), offset)?;
        Ok(())
    }
}

impl FifoMonitor for XdmaRegisters {
    fn configure_channel(&mut self, channel: MonitorChannel) -> BridgeResult<()> {
        let offset = regs::CONFIG_BASE + 4 * channel.index() as u64;
        self.write_u32(offset, regs::CONFIG_LATCH_CLEAR)
    }

    fn read_status(&mut self, channel: MonitorChannel) -> BridgeResult<FifoStatus> {
        let offset = regs::STATUS_BASE + 4 * channel.index() as u64;
        let raw = self.read_u32(offset)?;
        Ok(FifoStatus {
            depth_words: raw & regs::DEPTH_MASK,
            overflowed: raw & regs::STATUS_OVERFLOWED != 0,
            underflowed: raw & regs::STATUS_UNDERFLOWED != 0,
            over_threshold: raw & regs::STATUS_OVER_THRESHOLD != 0,
        })
    }

    fn set_ddc_stream_enabled(&mut self, enabled: bool) -> BridgeResult<()> {
        if enabled {
            self.stream_ctrl |= regs::CTRL_DDC_ENABLE;
        } else {
            self.stream_ctrl &= !regs::CTRL_DDC_ENABLE;
        }
        let value = self.stream_ctrl;
        self.write_u32(regs::STREAM_CTRL, value)
    }

    fn reset_stream_fifo(&mut self, channel: MonitorChannel) -> BridgeResult<()> {
        let bit = 1u32 << channel.index();
        self.write_u32(regs::FIFO_RESET, bit)?;
        self.write_u32(regs::FIFO_RESET, 0)
    }
}
