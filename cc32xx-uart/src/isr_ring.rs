//! Lock-free byte ring for the ISR → dispatcher handoff.
//!
//! The interrupt handler is the sole producer and the deferred RX dispatcher
//! the sole consumer. The main receive buffer is mutex-guarded and the mutex
//! cannot be taken from interrupt context, so this ring is the only channel
//! across that boundary: the handler stashes FIFO bytes here and the
//! dispatcher moves them on in thread context.
//!
//! # Memory ordering
//!
//! Head and tail are monotonically increasing indices with Acquire/Release
//! pairing: the producer writes the slot, then stores head with Release; the
//! consumer loads head with Acquire before reading the slot, and symmetrically
//! for tail. Correct on single-core Cortex-M where the handler and the thread
//! share coherent memory.

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicUsize, Ordering};

/// Fixed-capacity SPSC byte ring.
///
/// `N` must be a power of two; this is enforced at compile time. Power-of-two
/// capacity keeps indexing a bitmask and makes the wrapping arithmetic correct
/// even if the indices ever overflow `usize::MAX`.
pub struct IsrRing<const N: usize> {
    /// Write index. Only advanced by the producer.
    head: AtomicUsize,
    /// Read index. Only advanced by the consumer.
    tail: AtomicUsize,
    buf: [UnsafeCell<u8>; N],
}

// SAFETY: exactly one producer context and one consumer context may use the
// ring concurrently; that contract is what makes the UnsafeCell slot accesses
// race-free. Each slot is written only by the producer before the Release
// store of head and read only by the consumer after the matching Acquire load.
unsafe impl<const N: usize> Sync for IsrRing<N> {}
unsafe impl<const N: usize> Send for IsrRing<N> {}

impl<const N: usize> IsrRing<N> {
    pub const fn new() -> Self {
        assert!(N > 0, "ring capacity must be non-zero");
        assert!(N & (N - 1) == 0, "ring capacity must be a power of two");
        Self {
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
            buf: [const { UnsafeCell::new(0) }; N],
        }
    }

    #[inline]
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Number of stashed bytes. A snapshot; either side may move it
    /// immediately after the loads.
    #[inline]
    pub fn len(&self) -> usize {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);
        head.wrapping_sub(tail)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.len() >= N
    }

    /// Pushes one byte (producer side). Returns `Err(b)` when full.
    ///
    /// # Safety
    ///
    /// Must only be called from the single producer context (the interrupt
    /// handler of the owning instance).
    #[inline]
    pub unsafe fn push(&self, b: u8) -> Result<(), u8> {
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Acquire);
        if head.wrapping_sub(tail) >= N {
            return Err(b);
        }
        self.buf[head & (N - 1)].get().write(b);
        // Release: the slot write must be visible before the index update.
        self.head.store(head.wrapping_add(1), Ordering::Release);
        Ok(())
    }

    /// Pops one byte (consumer side). Returns `None` when empty.
    ///
    /// # Safety
    ///
    /// Must only be called from the single consumer context (the deferred RX
    /// dispatcher, with the instance's receive interrupts masked).
    #[inline]
    pub unsafe fn pop(&self) -> Option<u8> {
        let tail = self.tail.load(Ordering::Relaxed);
        let head = self.head.load(Ordering::Acquire);
        if head == tail {
            return None;
        }
        // SAFETY: the producer published this slot before its Release store
        // of head, which the Acquire load above synchronizes with.
        let b = self.buf[tail & (N - 1)].get().read();
        // Release: the slot read must complete before the slot is reusable.
        self.tail.store(tail.wrapping_add(1), Ordering::Release);
        Some(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifo_order_preserved() {
        let ring: IsrRing<8> = IsrRing::new();
        for b in 0u8..5 {
            unsafe { ring.push(b).unwrap() };
        }
        for b in 0u8..5 {
            assert_eq!(unsafe { ring.pop() }, Some(b));
        }
        assert_eq!(unsafe { ring.pop() }, None);
    }

    #[test]
    fn full_ring_rejects_push() {
        let ring: IsrRing<4> = IsrRing::new();
        for b in 0u8..4 {
            unsafe { ring.push(b).unwrap() };
        }
        assert!(ring.is_full());
        assert_eq!(unsafe { ring.push(9) }, Err(9));
        assert_eq!(unsafe { ring.pop() }, Some(0));
        assert!(unsafe { ring.push(9) }.is_ok());
    }

    #[test]
    fn wrapping_indices_stay_consistent() {
        let ring: IsrRing<4> = IsrRing::new();
        for round in 0u8..100 {
            unsafe {
                ring.push(round).unwrap();
                ring.push(round.wrapping_add(1)).unwrap();
                assert_eq!(ring.pop(), Some(round));
                assert_eq!(ring.pop(), Some(round.wrapping_add(1)));
            }
        }
        assert!(ring.is_empty());
    }
}
