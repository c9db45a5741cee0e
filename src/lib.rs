//! FPGA DDC to UDP streaming bridge
//!
//! Real-time data plane for a software-defined-radio hardware bridge:
//! DMA bursts from an FPGA receiver carry all Digital Down-Converter
//! (DDC) channels interleaved in one byte stream; this crate decodes
//! the stream, demultiplexes per-channel I/Q samples, and emits one
//! sequenced UDP datagram stream per channel while adapting the burst
//! size to the hardware FIFO occupancy.
//!
//! # Architecture
//!
//! ```text
//! device ─▶ raw arena ─▶ FrameDecoder ─▶ channel arenas ─▶ Packetizer ─▶ UDP
//!              ▲                                                 │
//!              └──── FlowController (FIFO occupancy) ◀───────────┘
//! ```
//!
//! A single worker thread runs the pipeline; [`control::SharedControl`]
//! is the only cross-thread state (activation signal, debug flag,
//! diagnostic alarms, per-channel commands), all atomics.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use iq_bridge::{BridgeConfig, SharedControl};
//!
//! let config = BridgeConfig::default().base_port(1035);
//! let control = Arc::new(SharedControl::with_base_port(config.base_port));
//!
//! let worker = iq_bridge::worker::open_xdma_worker(config, control.clone())?;
//! let handle = std::thread::spawn(move || worker.run());
//!
//! control.set_active(true); // start streaming
//! # Ok::<(), iq_bridge::BridgeError>(())
//! ```

pub mod arena;
pub mod config;
pub mod control;
pub mod error;
pub mod flow;
pub mod frame;
pub mod hw;
pub mod packet;
pub mod types;
pub mod worker;

pub use arena::ByteArena;
pub use config::BridgeConfig;
pub use control::SharedControl;
pub use error::{BridgeError, BridgeResult};
pub use frame::{analyse_ddc_header, FrameDecoder, FrameLayout};
pub use packet::{IqSink, Packetizer, UdpIqSink};
pub use types::{FifoStatus, LifecycleState, NUM_DDC};
pub use worker::DdcStreamWorker;
