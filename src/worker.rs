//! Streaming worker and lifecycle state machine
//!
//! One dedicated thread runs the whole data plane sequentially: flow
//! control, device burst read, frame decode, packetize, send. The
//! lifecycle gates each iteration on the externally-owned activation
//! signal, so stop latency is bounded by one burst iteration.
//!
//! Session-fatal errors (desync, send failure, device I/O) tear down
//! the session and return the worker to Idle; they never terminate the
//! process. A faulted session latches until the activation signal
//! drops, so a new session always begins on a fresh activation edge.

use std::sync::Arc;
use std::time::Duration;

use crate::arena::ByteArena;
use crate::config::BridgeConfig;
use crate::control::{cmd, SharedControl};
use crate::error::{BridgeError, BridgeResult};
use crate::flow::FlowController;
use crate::frame::FrameDecoder;
use crate::hw::{FifoMonitor, MonitorChannel, StreamReader};
use crate::packet::{IqSink, Packetizer};
use crate::types::{LifecycleState, NUM_DDC};

/// Settling delay between disabling the stream and programming the
/// FIFO monitor at worker startup
const STREAM_SETTLE: Duration = Duration::from_millis(1);

/// The outgoing-DDC streaming worker
///
/// Owns every buffer arena exclusively; the only shared state is the
/// [`SharedControl`] block of atomics.
pub struct DdcStreamWorker<D, M, S> {
    config: BridgeConfig,
    device: D,
    monitor: M,
    sinks: Vec<S>,
    control: Arc<SharedControl>,
    raw: ByteArena,
    channels: [ByteArena; NUM_DDC],
    decoder: FrameDecoder,
    packetizer: Packetizer,
    flow: FlowController,
    state: LifecycleState,
    fault_latched: bool,
}

impl<D, M, S> DdcStreamWorker<D, M, S>
where
    D: StreamReader,
    M: FifoMonitor,
    S: IqSink,
{
    /// Build a worker over already-opened device backends and one sink
    /// per DDC channel. All arenas are allocated here, once.
    pub fn new(
        config: BridgeConfig,
        device: D,
        monitor: M,
        sinks: Vec<S>,
        control: Arc<SharedControl>,
    ) -> BridgeResult<Self> {
        if sinks.len() != NUM_DDC {
            return Err(BridgeError::Config(format!(
                "expected {} sinks, got {}",
                NUM_DDC,
                sinks.len()
            )));
        }
        let raw = ByteArena::new(config.dma_buffer_size);
        let channels = std::array::from_fn(|_| ByteArena::new(config.channel_buffer_size));
        let flow = FlowController::new(config.occupancy_poll, config.startup_grace_bursts);

        Ok(Self {
            config,
            device,
            monitor,
            sinks,
            control,
            raw,
            channels,
            decoder: FrameDecoder::new(),
            packetizer: Packetizer::new(),
            flow,
            state: LifecycleState::Idle,
            fault_latched: false,
        })
    }

    /// Run the worker until shutdown is requested from Idle.
    ///
    /// Returns an error only for startup resource failures; everything
    /// that happens mid-session is absorbed into lifecycle transitions
    /// and the diagnostic counters.
    pub fn run(mut self) -> BridgeResult<()> {
        self.init()?;

        loop {
            match self.state {
                LifecycleState::Idle => {
                    if self.control.shutdown_requested() {
                        tracing::info!("shutting down DDC streaming worker");
                        return Ok(());
                    }
                    if self.control.is_active() {
                        if !self.fault_latched {
                            self.state = LifecycleState::Starting;
                            continue;
                        }
                        // faulted session: wait for the activation
                        // signal to drop before re-arming
                    } else {
                        self.fault_latched = false;
                        self.service_channel_commands();
                    }
                    std::thread::sleep(self.config.idle_poll);
                }
                LifecycleState::Starting => match self.start_session() {
                    Ok(()) => self.state = LifecycleState::Streaming,
                    Err(err) if err.is_session_fatal() => {
                        tracing::warn!(error = %err, "session start failed");
                        self.state = LifecycleState::Faulting;
                    }
                    Err(err) => return Err(err),
                },
                LifecycleState::Streaming => match self.stream_burst() {
                    Ok(()) => {
                        if !self.control.is_active() {
                            self.end_session();
                            self.state = LifecycleState::Idle;
                        }
                    }
                    Err(err) if err.is_session_fatal() => {
                        tracing::warn!(error = %err, "session-fatal stream error");
                        self.state = LifecycleState::Faulting;
                    }
                    Err(err) => return Err(err),
                },
                LifecycleState::Faulting => {
                    self.fault_session();
                    self.state = LifecycleState::Idle;
                }
            }
        }
    }

    /// One-time hardware bring-up before the lifecycle loop
    fn init(&mut self) -> BridgeResult<()> {
        self.monitor.set_ddc_stream_enabled(false)?;
        std::thread::sleep(STREAM_SETTLE);
        self.monitor.configure_channel(MonitorChannel::DdcStream)?;
        self.monitor.reset_stream_fifo(MonitorChannel::DdcStream)?;
        let status = self.monitor.read_status(MonitorChannel::DdcStream)?;
        tracing::info!(
            depth = status.depth_words,
            "DDC streaming worker ready (FIFO should be near empty)"
        );
        Ok(())
    }

    /// Idle→Starting: reset all session-scoped state, aim the sinks at
    /// their current destination ports, and open the hardware gate
    fn start_session(&mut self) -> BridgeResult<()> {
        tracing::info!("starting outgoing DDC session");
        self.raw.clear();
        for arena in self.channels.iter_mut() {
            arena.clear();
        }
        self.decoder.reset_session();
        self.packetizer.reset_session();
        self.flow.reset_session(self.config.startup_grace_bursts);

        for (ddc, sink) in self.sinks.iter_mut().enumerate() {
            let channel = self.control.channel(ddc);
            sink.rebind(channel.dest_port())
                .map_err(|source| BridgeError::Send { channel: ddc, source })?;
            channel.set_active(true);
        }

        self.monitor.set_ddc_stream_enabled(true)?;
        Ok(())
    }

    /// One Streaming iteration: drain, flow-control, burst read, decode
    fn stream_burst(&mut self) -> BridgeResult<()> {
        for ddc in 0..NUM_DDC {
            self.packetizer
                .drain(ddc, &mut self.channels[ddc], &mut self.sinks[ddc])?;
        }

        let size = self
            .flow
            .next_transfer(&mut self.monitor, &self.control)?
            .min(self.raw.writable());
        self.device
            .read_burst(self.raw.produce(size), self.config.stream_read_offset)?;

        self.decoder.decode(&mut self.raw, &mut self.channels)?;
        self.raw.compact();
        Ok(())
    }

    /// Cooperative stop at deactivation: close the gate, drop residues
    fn end_session(&mut self) {
        tracing::info!("outgoing DDC session stopped");
        if let Err(err) = self.monitor.set_ddc_stream_enabled(false) {
            tracing::warn!(error = %err, "failed to disable DDC stream");
        }
        self.discard_session_buffers();
    }

    /// Session-fatal teardown: disable the stream, discard in-flight
    /// buffer contents, latch the fault until activation drops
    fn fault_session(&mut self) {
        self.control.record_session_fault();
        if let Err(err) = self.monitor.set_ddc_stream_enabled(false) {
            tracing::warn!(error = %err, "failed to disable DDC stream after fault");
        }
        self.discard_session_buffers();
        self.fault_latched = true;
        tracing::info!("session torn down, worker back to Idle");
    }

    fn discard_session_buffers(&mut self) {
        self.raw.clear();
        for (ddc, arena) in self.channels.iter_mut().enumerate() {
            arena.clear();
            self.control.channel(ddc).set_active(false);
        }
    }

    /// Idle-state command servicing; currently only port changes
    fn service_channel_commands(&mut self) {
        for (ddc, sink) in self.sinks.iter_mut().enumerate() {
            let channel = self.control.channel(ddc);
            let commands = channel.take_commands();
            if commands & cmd::CHANGE_PORT != 0 {
                let port = channel.dest_port();
                match sink.rebind(port) {
                    Ok(()) => tracing::info!(ddc, port, "DDC destination port changed"),
                    Err(err) => tracing::warn!(ddc, port, error = %err, "port change failed"),
                }
            }
        }
    }
}

/// Open the real XDMA backends and a UDP sink per channel from the
/// configuration
#[cfg(unix)]
pub fn open_xdma_worker(
    config: BridgeConfig,
    control: Arc<SharedControl>,
) -> BridgeResult<
    DdcStreamWorker<crate::hw::xdma::XdmaStream, crate::hw::xdma::XdmaRegisters, crate::packet::UdpIqSink>,
> {
    use std::net::SocketAddr;

    let device = crate::hw::xdma::XdmaStream::open(&config.stream_device_path)?;
    let monitor = crate::hw::xdma::XdmaRegisters::open(&config.register_device_path)?;

    let mut sinks = Vec::with_capacity(NUM_DDC);
    for ddc in 0..NUM_DDC {
        let dest = SocketAddr::new(config.dest_addr, config.base_port + ddc as u16);
        sinks.push(crate::packet::UdpIqSink::bind(dest).map_err(|source| {
            BridgeError::Send { channel: ddc, source }
        })?);
    }

    DdcStreamWorker::new(config, device, monitor, sinks, control)
}
