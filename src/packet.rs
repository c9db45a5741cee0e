//! Datagram framing and transmission
//!
//! Wire layout per outgoing DDC datagram, all fields big-endian:
//!
//! | offset | size  | field                        |
//! |--------|-------|------------------------------|
//! | 0      | 4     | sequence number              |
//! | 4      | 8     | reserved, zero               |
//! | 12     | 2     | endpoint/type code (24 = IQ) |
//! | 14     | 2     | sample count                 |
//! | 16     | 6×238 | sample payload               |

use std::io;
use std::net::{SocketAddr, UdpSocket};

use byteorder::{BigEndian, ByteOrder};

use crate::arena::ByteArena;
use crate::error::{BridgeError, BridgeResult};
use crate::types::{
    IQ_TYPE_CODE, NUM_DDC, PACKET_BYTES, PACKET_PAYLOAD_BYTES, SAMPLES_PER_PACKET,
};

/// Destination for one channel's datagrams
pub trait IqSink {
    /// Transmit one complete datagram
    fn send(&mut self, datagram: &[u8]) -> io::Result<()>;

    /// Re-bind to a new destination port
    fn rebind(&mut self, port: u16) -> io::Result<()>;
}

/// UDP sink bound to one destination endpoint
pub struct UdpIqSink {
    socket: UdpSocket,
    dest: SocketAddr,
}

impl UdpIqSink {
    /// Bind an ephemeral local socket aimed at `dest`
    pub fn bind(dest: SocketAddr) -> io::Result<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        Ok(Self { socket, dest })
    }

    pub fn dest(&self) -> SocketAddr {
        self.dest
    }
}

impl IqSink for UdpIqSink {
    fn send(&mut self, datagram: &[u8]) -> io::Result<()> {
        self.socket.send_to(datagram, self.dest)?;
        Ok(())
    }

    fn rebind(&mut self, port: u16) -> io::Result<()> {
        self.socket = UdpSocket::bind("0.0.0.0:0")?;
        self.dest.set_port(port);
        Ok(())
    }
}

/// Frame one datagram into `buf` from exactly one packet's payload
pub fn build_datagram(buf: &mut [u8], seq: u32, payload: &[u8]) {
    debug_assert_eq!(buf.len(), PACKET_BYTES);
    debug_assert_eq!(payload.len(), PACKET_PAYLOAD_BYTES);
    BigEndian::write_u32(&mut buf[0..4], seq);
    buf[4..12].fill(0);
    BigEndian::write_u16(&mut buf[12..14], IQ_TYPE_CODE);
    BigEndian::write_u16(&mut buf[14..16], SAMPLES_PER_PACKET as u16);
    buf[16..].copy_from_slice(payload);
}

/// Drains channel arenas into sequenced datagrams
///
/// Sequence counters are per channel, post-incremented per datagram,
/// wrap on overflow, and reset to zero at every session start.
pub struct Packetizer {
    seq: [u32; NUM_DDC],
    scratch: Vec<u8>,
}

impl Packetizer {
    pub fn new() -> Self {
        Self {
            seq: [0; NUM_DDC],
            scratch: vec![0u8; PACKET_BYTES],
        }
    }

    /// Restart every channel's sequence at zero
    pub fn reset_session(&mut self) {
        self.seq = [0; NUM_DDC];
    }

    /// Current sequence counter for one channel
    pub fn sequence(&self, ddc: usize) -> u32 {
        self.seq[ddc]
    }

    /// Emit datagrams for one channel while a full payload is
    /// buffered, then compact the arena. A send failure is
    /// session-fatal and carries the channel identity.
    pub fn drain<S: IqSink>(
        &mut self,
        ddc: usize,
        arena: &mut ByteArena,
        sink: &mut S,
    ) -> BridgeResult<usize> {
        let mut sent = 0;
        while arena.available() >= PACKET_PAYLOAD_BYTES {
            let seq = self.seq[ddc];
            self.seq[ddc] = seq.wrapping_add(1);
            build_datagram(
                &mut self.scratch,
                seq,
                &arena.pending()[..PACKET_PAYLOAD_BYTES],
            );
            arena.consume(PACKET_PAYLOAD_BYTES);
            sink.send(&self.scratch).map_err(|source| BridgeError::Send {
                channel: ddc,
                source,
            })?;
            sent += 1;
        }
        arena.compact();
        Ok(sent)
    }
}

impl Default for Packetizer {
    fn default() -> Self {
        Self::new()
    }
}
