//! End-to-end pipeline scenarios over the simulated hardware backend
//!
//! Each test drives the real worker loop on its own thread, exactly as
//! a host process would, and observes it only through SharedControl
//! and the collected datagrams.

use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use byteorder::{BigEndian, ByteOrder, LittleEndian};

use iq_bridge::hw::sim::{SimFifoMonitor, SimStreamReader};
use iq_bridge::packet::IqSink;
use iq_bridge::types::{
    FRAME_MARKER, IQ_TYPE_CODE, PACKET_BYTES, SAMPLES_PER_PACKET,
};
use iq_bridge::{BridgeConfig, DdcStreamWorker, SharedControl, NUM_DDC};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Sink that collects datagrams into shared storage and can be
/// scripted to fail exactly one send
struct ScriptedSink {
    sent: Arc<Mutex<Vec<Vec<u8>>>>,
    sends: Arc<AtomicUsize>,
    fail_once_at: Option<usize>,
}

impl ScriptedSink {
    fn new(sent: Arc<Mutex<Vec<Vec<u8>>>>) -> Self {
        Self {
            sent,
            sends: Arc::new(AtomicUsize::new(0)),
            fail_once_at: None,
        }
    }

    fn failing_once_at(sent: Arc<Mutex<Vec<Vec<u8>>>>, n: usize) -> Self {
        Self {
            fail_once_at: Some(n),
            ..Self::new(sent)
        }
    }
}

impl IqSink for ScriptedSink {
    fn send(&mut self, datagram: &[u8]) -> io::Result<()> {
        let n = self.sends.fetch_add(1, Ordering::Relaxed);
        if self.fail_once_at == Some(n) {
            self.fail_once_at = None;
            return Err(io::Error::new(io::ErrorKind::Other, "host unreachable"));
        }
        self.sent.lock().unwrap().push(datagram.to_vec());
        Ok(())
    }

    fn rebind(&mut self, _port: u16) -> io::Result<()> {
        Ok(())
    }
}

/// Rate word with ch0 at 2 samples, ch1 at 1, ch2 at 8 per frame
const TEST_RATE_FIELDS: [u32; 3] = [2, 1, 4];

fn test_rate_word() -> u32 {
    TEST_RATE_FIELDS
        .iter()
        .enumerate()
        .fold(0, |word, (ddc, &f)| word | (f << (3 * ddc)))
}

/// One raw frame for the test rate word; slot words are numbered so
/// payload content is predictable
fn test_frame() -> Vec<u8> {
    let word = test_rate_word();
    let total_samples: u32 = TEST_RATE_FIELDS.iter().map(|&f| 1u32 << (f - 1)).sum();

    let mut frame = vec![0u8; 8];
    LittleEndian::write_u32(&mut frame[..4], word);
    frame[7] = FRAME_MARKER;
    let mut seed = 0u16;
    for _ in 0..total_samples {
        for w in 0..4u16 {
            frame.extend_from_slice(&(seed + w).to_le_bytes());
        }
        seed += 4;
    }
    frame
}

fn collectors() -> Vec<Arc<Mutex<Vec<Vec<u8>>>>> {
    (0..NUM_DDC).map(|_| Arc::new(Mutex::new(Vec::new()))).collect()
}

fn test_config() -> BridgeConfig {
    BridgeConfig::default().startup_grace_bursts(2)
}

fn wait_until(what: &str, mut cond: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while !cond() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        thread::sleep(Duration::from_millis(1));
    }
}

fn packet_count(collector: &Arc<Mutex<Vec<Vec<u8>>>>) -> usize {
    collector.lock().unwrap().len()
}

#[test]
fn streams_sequenced_packets_per_channel() {
    init_tracing();
    let control = Arc::new(SharedControl::new());
    let device = SimStreamReader::new(vec![0x11u8; 16], test_frame());
    let monitor = SimFifoMonitor::with_depths(vec![600, 0]);

    let sent = collectors();
    let sinks: Vec<ScriptedSink> = sent.iter().map(|c| ScriptedSink::new(c.clone())).collect();
    let worker =
        DdcStreamWorker::new(test_config(), device, monitor, sinks, control.clone()).unwrap();
    let handle = thread::spawn(move || worker.run());

    control.set_active(true);
    wait_until("three packets on the slowest channel", || {
        packet_count(&sent[1]) >= 3
    });

    control.set_active(false);
    wait_until("worker to go idle", || !control.channel(0).is_active());
    control.request_shutdown();
    handle.join().unwrap().unwrap();

    assert_eq!(control.session_faults(), 0);

    // Channels beyond the active three never emitted anything
    for collector in &sent[3..] {
        assert_eq!(packet_count(collector), 0);
    }

    for (ddc, collector) in sent[..3].iter().enumerate() {
        let packets = collector.lock().unwrap();
        assert!(!packets.is_empty(), "DDC {ddc} sent nothing");
        for (i, packet) in packets.iter().enumerate() {
            assert_eq!(packet.len(), PACKET_BYTES);
            assert_eq!(BigEndian::read_u32(&packet[0..4]), i as u32, "gap on DDC {ddc}");
            assert_eq!(&packet[4..12], &[0u8; 8]);
            assert_eq!(BigEndian::read_u16(&packet[12..14]), IQ_TYPE_CODE);
            assert_eq!(
                BigEndian::read_u16(&packet[14..16]),
                SAMPLES_PER_PACKET as u16
            );
        }
    }

    // ch1 carries one sample per frame, always the third slot: words
    // 8, 9, 10 survive the 3-of-4 demultiplex, word 11 is skipped
    let ch1 = sent[1].lock().unwrap();
    for sample in ch1[0][16..].chunks(6) {
        assert_eq!(sample, &[8, 0, 9, 0, 10, 0]);
    }
}

#[test]
fn misaligned_stream_faults_with_zero_packets() {
    init_tracing();
    let control = Arc::new(SharedControl::new());
    // no marker byte anywhere in the stream
    let device = SimStreamReader::cyclic(vec![0x55u8; 8]);
    let monitor = SimFifoMonitor::with_depths(vec![600, 0]);

    let sent = collectors();
    let sinks: Vec<ScriptedSink> = sent.iter().map(|c| ScriptedSink::new(c.clone())).collect();
    let worker =
        DdcStreamWorker::new(test_config(), device, monitor, sinks, control.clone()).unwrap();
    let handle = thread::spawn(move || worker.run());

    control.set_active(true);
    wait_until("session fault", || control.session_faults() >= 1);

    control.request_shutdown();
    handle.join().unwrap().unwrap();

    assert_eq!(control.session_faults(), 1, "fault must latch, not repeat");
    for collector in &sent {
        assert_eq!(packet_count(collector), 0);
    }
}

#[test]
fn send_failure_ends_session_and_next_session_restarts_sequences() {
    init_tracing();
    let control = Arc::new(SharedControl::new());
    let device = SimStreamReader::new(vec![0x11u8; 16], test_frame());
    let monitor = SimFifoMonitor::with_depths(vec![600, 0]);

    let sent = collectors();
    let sinks: Vec<ScriptedSink> = sent
        .iter()
        .enumerate()
        .map(|(ddc, c)| {
            if ddc == 2 {
                // second datagram on DDC 2 fails
                ScriptedSink::failing_once_at(c.clone(), 1)
            } else {
                ScriptedSink::new(c.clone())
            }
        })
        .collect();
    let worker =
        DdcStreamWorker::new(test_config(), device, monitor, sinks, control.clone()).unwrap();
    let handle = thread::spawn(move || worker.run());

    control.set_active(true);
    wait_until("session fault from DDC 2", || control.session_faults() == 1);

    // Deactivate long enough for the worker to clear the fault latch,
    // then start a fresh session with the fault consumed
    control.set_active(false);
    thread::sleep(Duration::from_millis(20));
    for collector in &sent {
        collector.lock().unwrap().clear();
    }

    control.set_active(true);
    wait_until("packets in the second session", || {
        (0..3).all(|ddc| packet_count(&sent[ddc]) >= 2)
    });

    control.set_active(false);
    wait_until("worker to go idle", || !control.channel(0).is_active());
    control.request_shutdown();
    handle.join().unwrap().unwrap();

    assert_eq!(control.session_faults(), 1);

    // Every channel's second session restarts at sequence zero with no
    // gaps, proving the first session's residue was discarded cleanly
    for ddc in [0usize, 1, 2] {
        let packets = sent[ddc].lock().unwrap();
        assert!(packets.len() >= 2, "DDC {ddc} too quiet");
        for (i, packet) in packets.iter().enumerate() {
            assert_eq!(
                BigEndian::read_u32(&packet[0..4]),
                i as u32,
                "DDC {ddc} sequence must restart at zero"
            );
        }
    }
}
