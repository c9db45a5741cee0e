//! Shared control state crossing the worker thread boundary
//!
//! Everything here is plain atomics with relaxed ordering: readers
//! tolerate staleness of one polling interval, but never torn values.
//! The worker owns all buffer arenas outright; this block is the only
//! state another thread may touch.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use crate::types::NUM_DDC;

/// Per-channel command bits
pub mod cmd {
    /// Re-bind the channel's destination socket to the configured port
    pub const CHANGE_PORT: u32 = 1 << 0;
}

/// Control block for one DDC channel, written by the external control
/// path and consumed by the worker
#[derive(Debug)]
pub struct ChannelControl {
    /// Channel has an active socket binding
    active: AtomicBool,
    /// Pending command bits (`cmd::*`)
    commands: AtomicU32,
    /// Destination UDP port requested by the control path
    dest_port: AtomicU32,
}

impl ChannelControl {
    fn new(dest_port: u16) -> Self {
        Self {
            active: AtomicBool::new(false),
            commands: AtomicU32::new(0),
            dest_port: AtomicU32::new(dest_port as u32),
        }
    }

    pub fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::Relaxed);
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Relaxed)
    }

    /// Request a destination-port change; serviced while the worker is
    /// Idle
    pub fn request_port_change(&self, port: u16) {
        self.dest_port.store(port as u32, Ordering::Relaxed);
        self.commands.fetch_or(cmd::CHANGE_PORT, Ordering::Relaxed);
    }

    pub fn dest_port(&self) -> u16 {
        self.dest_port.load(Ordering::Relaxed) as u16
    }

    /// Atomically take and clear the pending command bits
    pub fn take_commands(&self) -> u32 {
        self.commands.swap(0, Ordering::Relaxed)
    }
}

/// Process-wide control and diagnostic state shared with the worker
#[derive(Debug)]
pub struct SharedControl {
    /// Streaming activation signal; the lifecycle gate
    active: AtomicBool,
    /// Ask the worker to exit from Idle
    shutdown: AtomicBool,
    /// Verbose-diagnostics flag
    debug: AtomicBool,
    /// Append-only alarm register, cleared only by the external consumer
    alarms: AtomicU32,
    /// Sessions ended by a session-fatal error
    session_faults: AtomicU32,
    /// Per-channel control blocks
    channels: [ChannelControl; NUM_DDC],
}

impl SharedControl {
    pub fn new() -> Self {
        Self::with_base_port(0)
    }

    /// Control block whose channels start at `base_port + n`
    pub fn with_base_port(base_port: u16) -> Self {
        Self {
            active: AtomicBool::new(false),
            shutdown: AtomicBool::new(false),
            debug: AtomicBool::new(false),
            alarms: AtomicU32::new(0),
            session_faults: AtomicU32::new(0),
            channels: std::array::from_fn(|n| ChannelControl::new(base_port + n as u16)),
        }
    }

    pub fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::Relaxed);
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Relaxed)
    }

    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    pub fn shutdown_requested(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }

    pub fn set_debug(&self, enabled: bool) {
        self.debug.store(enabled, Ordering::Relaxed);
    }

    pub fn debug_enabled(&self) -> bool {
        self.debug.load(Ordering::Relaxed)
    }

    /// OR alarm bits into the diagnostic bitmask
    pub fn raise_alarm(&self, bits: u32) {
        self.alarms.fetch_or(bits, Ordering::Relaxed);
    }

    /// Current alarm bits
    pub fn alarms(&self) -> u32 {
        self.alarms.load(Ordering::Relaxed)
    }

    /// Clear and return the alarm bits; for the external monitor only
    pub fn take_alarms(&self) -> u32 {
        self.alarms.swap(0, Ordering::Relaxed)
    }

    pub(crate) fn record_session_fault(&self) {
        self.session_faults.fetch_add(1, Ordering::Relaxed);
    }

    /// Count of sessions torn down by session-fatal errors
    pub fn session_faults(&self) -> u32 {
        self.session_faults.load(Ordering::Relaxed)
    }

    pub fn channel(&self, ddc: usize) -> &ChannelControl {
        &self.channels[ddc]
    }
}

impl Default for SharedControl {
    fn default() -> Self {
        Self::new()
    }
}
