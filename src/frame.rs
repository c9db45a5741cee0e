//! Hardware frame decoding
//!
//! The FPGA interleaves all DDC channels into one stream of 8-byte
//! words. Each frame is a header word (little-endian 32-bit rate code,
//! marker byte `0x80` at offset 7) followed by `frame_words` payload
//! words, one raw sample slot per word. A slot carries four 16-bit
//! words; the demultiplexer keeps the first three (I/Q/amplitude) and
//! skips the fourth, which the hardware pads.

use byteorder::{ByteOrder, LittleEndian};

use crate::arena::ByteArena;
use crate::error::{BridgeError, BridgeResult};
use crate::types::{FRAME_MARKER, IQ_SAMPLE_BYTES, NUM_DDC, WORD_BYTES};

/// Raw bytes one sample slot occupies in the stream
const SLOT_BYTES: usize = 8;

/// Alignment scan skips the first two stream words, which may be a
/// partial frame left over from before the session was enabled
const ALIGN_SCAN_START: usize = 16;

/// Per-frame layout derived from a rate code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameLayout {
    /// Payload length in 8-byte words (equals the total sample count)
    pub frame_words: u32,

    /// Samples carried for each DDC channel
    pub counts: [u32; NUM_DDC],
}

/// Derive the frame layout from a 32-bit rate code.
///
/// The code packs one 3-bit rate field per DDC, channel 0 in the least
/// significant bits. Field 0 means the channel is idle; field `r` in
/// `1..=7` contributes `1 << (r - 1)` samples per frame.
pub fn analyse_ddc_header(rate_word: u32) -> FrameLayout {
    let mut counts = [0u32; NUM_DDC];
    let mut total = 0u32;
    let mut bits = rate_word;

    for count in counts.iter_mut() {
        let rate = bits & 0b111;
        if rate != 0 {
            *count = 1 << (rate - 1);
            total += *count;
        }
        bits >>= 3;
    }

    FrameLayout {
        frame_words: total,
        counts,
    }
}

/// Stateful decoder for one streaming session
///
/// Owns the startup-alignment flag and the cached rate word. The rate
/// rarely changes between frames, so the layout is only recomputed on
/// a new rate code.
#[derive(Debug)]
pub struct FrameDecoder {
    aligned: bool,
    cached: Option<(u32, FrameLayout)>,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self {
            aligned: false,
            cached: None,
        }
    }

    /// Forget alignment and the cached rate word at session start
    pub fn reset_session(&mut self) {
        self.aligned = false;
        self.cached = None;
    }

    /// Consume as many complete frames from `raw` as possible,
    /// demultiplexing samples into the per-channel arenas.
    ///
    /// A partial frame is left in place for the next burst. Returns a
    /// session-fatal error if startup alignment fails or the marker
    /// check fails mid-stream.
    pub fn decode(
        &mut self,
        raw: &mut ByteArena,
        channels: &mut [ByteArena; NUM_DDC],
    ) -> BridgeResult<()> {
        if !self.aligned {
            self.align(raw)?;
        }

        while raw.available() >= WORD_BYTES {
            let pending = raw.pending();
            if pending[WORD_BYTES - 1] != FRAME_MARKER {
                return Err(BridgeError::Desync(format!(
                    "marker byte missing for rate word 0x{:08x}",
                    LittleEndian::read_u32(&pending[..4])
                )));
            }

            let rate_word = LittleEndian::read_u32(&pending[..4]);
            let layout = match self.cached {
                Some((cached_word, layout)) if cached_word == rate_word => layout,
                _ => {
                    let layout = analyse_ddc_header(rate_word);
                    self.cached = Some((rate_word, layout));
                    layout
                }
            };

            let frame_bytes = (layout.frame_words as usize + 1) * WORD_BYTES;
            if raw.available() < frame_bytes {
                break;
            }

            // Defer the whole frame if any destination lacks room, so a
            // frame is never half-demultiplexed
            let fits = layout
                .counts
                .iter()
                .zip(channels.iter())
                .all(|(&count, arena)| arena.writable() >= count as usize * IQ_SAMPLE_BYTES);
            if !fits {
                break;
            }

            let payload = &raw.pending()[WORD_BYTES..frame_bytes];
            let mut offset = 0;
            for (&count, arena) in layout.counts.iter().zip(channels.iter_mut()) {
                for _ in 0..count {
                    arena.extend(&payload[offset..offset + IQ_SAMPLE_BYTES]);
                    offset += SLOT_BYTES;
                }
            }
            raw.consume(frame_bytes);
        }

        Ok(())
    }

    /// Startup alignment: scan the received bytes in 8-byte strides for
    /// the marker byte at stride offset 7 and realign the read cursor
    /// to the first matching stride boundary.
    fn align(&mut self, raw: &mut ByteArena) -> BridgeResult<()> {
        let scanned = raw.available();
        let found = {
            let pending = raw.pending();
            let mut cursor = ALIGN_SCAN_START;
            let mut found = None;
            while cursor + WORD_BYTES <= pending.len() {
                if pending[cursor + WORD_BYTES - 1] == FRAME_MARKER {
                    found = Some(cursor);
                    break;
                }
                cursor += WORD_BYTES;
            }
            found
        };

        match found {
            Some(cursor) => {
                raw.consume(cursor);
                self.aligned = true;
                tracing::debug!(skipped = cursor, "stream aligned to frame marker");
                Ok(())
            }
            None => Err(BridgeError::Desync(format!(
                "no frame marker in first {scanned} received bytes"
            ))),
        }
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}
