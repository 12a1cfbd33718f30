//! Byte ring buffer backing the main receive and transmit buffers.
//!
//! No internal synchronization: the owning instance's mutex guards every
//! access. Capacity is fixed at construction time; `append` never grows the
//! buffer and never overwrites unread data.

use alloc::vec;
use alloc::vec::Vec;

pub struct Rbuf {
    buf: Vec<u8>,
    /// Read position of the oldest unread byte.
    head: usize,
    used: usize,
}

impl Rbuf {
    pub fn with_capacity(cap: usize) -> Self {
        Self {
            buf: vec![0; cap],
            head: 0,
            used: 0,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Number of unread bytes.
    #[inline]
    pub fn used(&self) -> usize {
        self.used
    }

    /// Remaining free space.
    #[inline]
    pub fn avail(&self) -> usize {
        self.buf.len() - self.used
    }

    /// Appends one byte. Returns false if the buffer is full.
    pub fn append_one(&mut self, b: u8) -> bool {
        if self.used == self.buf.len() {
            return false;
        }
        let w = (self.head + self.used) % self.buf.len();
        self.buf[w] = b;
        self.used += 1;
        true
    }

    /// Appends as much of `data` as fits; returns the number appended.
    pub fn append(&mut self, data: &[u8]) -> usize {
        let n = data.len().min(self.avail());
        for &b in &data[..n] {
            self.append_one(b);
        }
        n
    }

    /// Contiguous run of unread bytes starting at the read position, at most
    /// `max` long. A wrapped buffer needs two `contig`/`consume` rounds to
    /// observe everything.
    pub fn contig(&self, max: usize) -> &[u8] {
        let run = self.used.min(self.buf.len() - self.head).min(max);
        &self.buf[self.head..self.head + run]
    }

    /// Drops up to `n` bytes from the read side.
    pub fn consume(&mut self, n: usize) {
        let n = n.min(self.used);
        self.head = (self.head + n) % self.buf.len();
        self.used -= n;
    }

    /// Copies unread bytes into `out` and consumes them; returns the count.
    pub fn read_into(&mut self, out: &mut [u8]) -> usize {
        let mut copied = 0;
        while copied < out.len() {
            let run = self.contig(out.len() - copied);
            if run.is_empty() {
                break;
            }
            let len = run.len();
            out[copied..copied + len].copy_from_slice(run);
            self.consume(len);
            copied += len;
        }
        copied
    }
}
