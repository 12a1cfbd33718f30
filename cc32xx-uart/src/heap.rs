//! Global allocator for on-target builds.
//!
//! The driver allocates only at `init` and `deinit` (instance state and the
//! main buffers); the data path itself never allocates.

use embedded_alloc::LlffHeap as Heap;

#[global_allocator]
static HEAP: Heap = Heap::empty();

/// Hands a memory region to the allocator.
///
/// # Safety
///
/// Must be called exactly once, before any allocation, with a region that is
/// unused RAM for the program's whole lifetime.
pub unsafe fn init(start: usize, size: usize) {
    HEAP.init(start, size);
}
