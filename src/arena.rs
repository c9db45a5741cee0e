//! Fixed-capacity byte arena with compaction
//!
//! Backing store for the raw DMA stream and each per-channel sample
//! queue. A linear buffer with `read` and `head` offsets replaces the
//! circular indexing a ring buffer would need: the producer always
//! appends to a contiguous region, and unread residue is moved back to
//! the base once per burst. Residue is bounded by one frame/datagram,
//! so the memmove stays cheap.

/// Linear byte arena: `0 <= read <= head <= capacity`
#[derive(Debug)]
pub struct ByteArena {
    /// Internal storage (allocated once)
    buf: Vec<u8>,
    /// Offset of the next unconsumed byte
    read: usize,
    /// Offset one past the last produced byte
    head: usize,
}

impl ByteArena {
    /// Create an arena with the given fixed capacity
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: vec![0u8; capacity],
            read: 0,
            head: 0,
        }
    }

    /// Maximum capacity in bytes
    #[inline]
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Bytes buffered and not yet consumed
    #[inline]
    pub fn available(&self) -> usize {
        self.head - self.read
    }

    /// Free space at the head for the producer
    #[inline]
    pub fn writable(&self) -> usize {
        self.buf.len() - self.head
    }

    /// Unconsumed bytes, `[read, head)`
    #[inline]
    pub fn pending(&self) -> &[u8] {
        &self.buf[self.read..self.head]
    }

    /// Mutable producer region of exactly `len` bytes at the head.
    /// Panics if `len` exceeds the writable space; callers size bursts
    /// against `writable()` first.
    pub fn produce(&mut self, len: usize) -> &mut [u8] {
        let start = self.head;
        self.head += len;
        &mut self.buf[start..self.head]
    }

    /// Append a byte slice at the head
    pub fn extend(&mut self, data: &[u8]) {
        self.produce(data.len()).copy_from_slice(data);
    }

    /// Mark `len` pending bytes as consumed
    #[inline]
    pub fn consume(&mut self, len: usize) {
        debug_assert!(len <= self.available());
        self.read += len;
    }

    /// Move unread residue back to the base.
    ///
    /// No-op unless the read cursor has advanced past the base. With
    /// residue, bytes `[read, head)` move to offset 0; without, both
    /// cursors reset to 0.
    pub fn compact(&mut self) {
        if self.read == 0 {
            return;
        }
        let residue = self.head - self.read;
        if residue != 0 {
            self.buf.copy_within(self.read..self.head, 0);
        }
        self.read = 0;
        self.head = residue;
    }

    /// Discard all contents and reset both cursors
    pub fn clear(&mut self) {
        self.read = 0;
        self.head = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn produce_and_consume() {
        let mut arena = ByteArena::new(16);
        arena.extend(&[1, 2, 3, 4]);
        assert_eq!(arena.available(), 4);
        assert_eq!(arena.pending(), &[1, 2, 3, 4]);

        arena.consume(2);
        assert_eq!(arena.pending(), &[3, 4]);
        assert_eq!(arena.writable(), 12);
    }

    #[test]
    fn compact_moves_residue_to_base() {
        let mut arena = ByteArena::new(8);
        arena.extend(&[10, 20, 30, 40, 50]);
        arena.consume(3);

        arena.compact();
        assert_eq!(arena.pending(), &[40, 50]);
        assert_eq!(arena.writable(), 6);
    }

    #[test]
    fn compact_empty_resets_cursors() {
        let mut arena = ByteArena::new(8);
        arena.extend(&[1, 2, 3]);
        arena.consume(3);

        arena.compact();
        assert_eq!(arena.available(), 0);
        assert_eq!(arena.writable(), 8);
    }

    #[test]
    fn compact_at_base_is_noop() {
        let mut arena = ByteArena::new(8);
        arena.extend(&[7, 8]);
        arena.compact();
        assert_eq!(arena.pending(), &[7, 8]);
    }

    #[test]
    fn cursors_never_exceed_capacity() {
        let mut arena = ByteArena::new(32);
        for _ in 0..100 {
            let n = arena.writable().min(5);
            arena.produce(n);
            arena.consume(arena.available().min(4));
            arena.compact();
            assert!(arena.available() <= arena.capacity());
            assert!(arena.writable() <= arena.capacity());
        }
    }
}
