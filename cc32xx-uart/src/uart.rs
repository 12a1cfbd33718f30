//! Instance lifecycle and the task-side API surface.
//!
//! Each UART instance is a heap-allocated [`UartState`] published through a
//! global pointer table. The interrupt handler reads the table with Acquire
//! ordering and bails out on null, so a late interrupt after `deinit`
//! degrades to a spurious (ignored) entry; `deinit` disables the vector
//! before unpublishing, so the handler can never straddle the teardown.
//! Task-context callers go through [`acquire`], which holds the driver-wide
//! registry lock from table lookup until the instance mutex is owned, so
//! `deinit` cannot free an instance out from under a thread that has looked
//! it up but not yet locked it.

use alloc::boxed::Box;
use core::cell::UnsafeCell;
use core::ptr;
use core::sync::atomic::{AtomicPtr, AtomicU32, Ordering};

use byte_strings::c;
use threadx_sys::CHAR;

use crate::config;
use crate::dispatch;
use crate::hw::{MmioUart, UartHw};
use crate::isr;
use crate::isr_ring::IsrRing;
use crate::os::{self, Lock, LockGuard, OsError};
use crate::rbuf::Rbuf;

/// Number of addressable UART instances.
pub const MAX_UARTS: usize = config::NUM_UARTS;

/// Capacity of the auxiliary ring between the interrupt handler and the
/// dispatcher. Four hardware FIFOs deep, enough to ride out dispatcher
/// scheduling latency at the supported baud rates.
pub const ISR_RX_RING_SIZE: usize = 64;

/// Static configuration of one instance, fixed at `init`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UartConfig {
    pub baud_rate: u32,
    /// Main receive buffer capacity in bytes.
    pub rx_buf_size: usize,
    /// Main transmit buffer capacity in bytes.
    pub tx_buf_size: usize,
    /// Assert RTS-based flow control toward the peer.
    pub rx_fc_ena: bool,
    /// Honor CTS from the peer before transmitting.
    pub tx_fc_ena: bool,
    /// Upper bound, in microseconds, on the dispatcher's post-drain wait for
    /// trailing bytes of a burst.
    pub rx_linger_micros: u32,
}

impl Default for UartConfig {
    fn default() -> Self {
        Self {
            baud_rate: 115_200,
            rx_buf_size: 256,
            tx_buf_size: 256,
            rx_fc_ena: false,
            tx_fc_ena: false,
            rx_linger_micros: 15,
        }
    }
}

/// Counters snapshot returned by [`stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UartStats {
    /// Interrupt handler entries.
    pub ints: u32,
    /// Handler entries with a receive cause pending.
    pub rx_ints: u32,
    /// Handler entries with a transmit cause pending.
    pub tx_ints: u32,
    /// Bytes moved into the main receive buffer.
    pub rx_bytes: u32,
    /// Bytes moved out of the main transmit buffer into the FIFO.
    pub tx_bytes: u32,
    /// Hardware receive overruns (FIFO overflowed before the handler ran).
    pub rx_overruns: u32,
    /// Handler exits that left receive interrupts masked because the
    /// auxiliary ring was full.
    pub rx_isr_ring_full: u32,
    /// Linger waits that were rewarded with at least one more byte.
    pub rx_linger_conts: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UartError {
    /// No such UART instance number.
    InvalidInstance,
    /// Zero baud rate or zero-sized buffer.
    InvalidConfig,
    /// Flow control requested on an instance whose pins cannot provide it.
    FlowControlUnsupported,
    AlreadyInitialized,
    NotInitialized,
    Os(OsError),
}

impl From<OsError> for UartError {
    fn from(e: OsError) -> Self {
        UartError::Os(e)
    }
}

/// Counters owned by the interrupt handler. Read concurrently by [`stats`],
/// so they are relaxed atomics rather than plain fields.
#[derive(Default)]
pub(crate) struct IsrStats {
    pub ints: AtomicU32,
    pub rx_ints: AtomicU32,
    pub tx_ints: AtomicU32,
    pub rx_overruns: AtomicU32,
    pub rx_isr_ring_full: AtomicU32,
}

/// State guarded by the instance mutex. Only ever touched with the lock held.
pub(crate) struct TaskData {
    pub rx_buf: Rbuf,
    pub tx_buf: Rbuf,
    pub rx_bytes: u32,
    pub tx_bytes: u32,
    pub rx_linger_conts: u32,
    pub rx_enabled: bool,
}

pub(crate) struct UartState {
    pub uart_no: usize,
    pub cfg: UartConfig,
    pub lock: Lock,
    /// Handler → dispatcher byte channel; see [`crate::isr_ring`].
    pub isr_rx: IsrRing<ISR_RX_RING_SIZE>,
    /// Register access. Shared between the handler and the lock holder; on
    /// this single-core part the handler strictly preempts, and the
    /// lock-holder's mask updates run inside critical sections.
    pub hw: UnsafeCell<Box<dyn UartHw>>,
    pub isr_stats: IsrStats,
    pub task: UnsafeCell<TaskData>,
}

// SAFETY: cross-context access is disciplined, not free-for-all. `task` is
// only dereferenced while holding `lock`. `hw` is dereferenced by the
// interrupt handler (which preempts and cannot run concurrently with itself)
// and by the lock holder; mask-register updates from thread context are
// wrapped in critical sections. `isr_rx` and `isr_stats` are lock-free.
unsafe impl Sync for UartState {}
unsafe impl Send for UartState {}

static INSTANCES: [AtomicPtr<UartState>; MAX_UARTS] =
    [const { AtomicPtr::new(ptr::null_mut()) }; MAX_UARTS];

/// Published state pointer for an instance, or null.
pub(crate) fn instance_ptr(uart_no: usize) -> *mut UartState {
    if uart_no >= MAX_UARTS {
        return ptr::null_mut();
    }
    INSTANCES[uart_no].load(Ordering::Acquire)
}

/// Looks up an instance and takes its mutex.
///
/// The registry lock is held from the table load until the instance mutex is
/// owned. `deinit` unpublishes under the same lock, so the pointer cannot be
/// freed in between.
pub(crate) fn acquire(
    uart_no: usize,
) -> Result<(&'static UartState, LockGuard<'static>), UartError> {
    let registry = match os::registry_lock() {
        Ok(lock) => lock,
        // The shared services only exist once some init succeeded.
        Err(_) => return Err(UartError::NotInitialized),
    };
    let _registry = registry.lock()?;
    let raw = instance_ptr(uart_no);
    if raw.is_null() {
        return Err(UartError::NotInitialized);
    }
    // SAFETY: published instance, protected from teardown by the registry
    // lock until the line below has taken its mutex.
    let st = unsafe { &*raw };
    let guard = st.lock.lock()?;
    Ok((st, guard))
}

fn lock_name(uart_no: usize) -> *mut CHAR {
    let name = if uart_no == 0 {
        c!("uart0").as_ptr()
    } else {
        c!("uart1").as_ptr()
    };
    name as *mut CHAR
}

/// Brings up an instance over its memory-mapped registers.
pub fn init(uart_no: usize, cfg: UartConfig) -> Result<(), UartError> {
    let base = config::uart_base(uart_no).ok_or(UartError::InvalidInstance)?;
    // SAFETY: base is the block's documented address and init_with_hw
    // rejects double initialization, so nothing else drives the block.
    init_with_hw(uart_no, cfg, Box::new(unsafe { MmioUart::new(base) }))
}

/// Brings up an instance over a caller-supplied port. The interrupt vector
/// is registered only for real instances; tests drive the handler directly.
pub fn init_with_hw(
    uart_no: usize,
    cfg: UartConfig,
    mut hw: Box<dyn UartHw>,
) -> Result<(), UartError> {
    if uart_no >= MAX_UARTS {
        return Err(UartError::InvalidInstance);
    }
    // UART0's CTS/RTS pads are not routed on this package.
    if uart_no == 0 && (cfg.rx_fc_ena || cfg.tx_fc_ena) {
        return Err(UartError::FlowControlUnsupported);
    }
    if cfg.baud_rate == 0 || cfg.rx_buf_size == 0 || cfg.tx_buf_size == 0 {
        return Err(UartError::InvalidConfig);
    }
    if !instance_ptr(uart_no).is_null() {
        return Err(UartError::AlreadyInitialized);
    }
    os::ensure_services()?;

    hw.program(&cfg);

    let st = Box::new(UartState {
        uart_no,
        cfg: cfg.clone(),
        lock: Lock::new(),
        isr_rx: IsrRing::new(),
        hw: UnsafeCell::new(hw),
        isr_stats: IsrStats::default(),
        task: UnsafeCell::new(TaskData {
            rx_buf: Rbuf::with_capacity(cfg.rx_buf_size),
            tx_buf: Rbuf::with_capacity(cfg.tx_buf_size),
            rx_bytes: 0,
            tx_bytes: 0,
            rx_linger_conts: 0,
            rx_enabled: true,
        }),
    });
    // SAFETY: the box gives the control block a stable address for the
    // instance's lifetime; the name is a static string.
    unsafe { st.lock.create(lock_name(uart_no))? };

    let raw = Box::into_raw(st);
    if INSTANCES[uart_no]
        .compare_exchange(ptr::null_mut(), raw, Ordering::AcqRel, Ordering::Acquire)
        .is_err()
    {
        // Lost an init race; unwind our half-built instance.
        // SAFETY: raw was never published, so this thread is its only owner.
        unsafe {
            let st = Box::from_raw(raw);
            let _ = st.lock.delete();
        }
        return Err(UartError::AlreadyInitialized);
    }

    os::interrupt_register(
        config::uart_int(uart_no),
        isr::vector(uart_no),
        config::UART_INT_PRIORITY,
    );

    // First dispatch pass arms receive interrupts through the bottom half.
    dispatch::dispatch(uart_no)
}

/// Tears an instance down and releases its resources.
pub fn deinit(uart_no: usize) -> Result<(), UartError> {
    let registry = match os::registry_lock() {
        Ok(lock) => lock,
        Err(_) => return Err(UartError::NotInitialized),
    };
    let raw;
    {
        let _registry = registry.lock()?;
        raw = instance_ptr(uart_no);
        if raw.is_null() {
            return Err(UartError::NotInitialized);
        }
        os::interrupt_disable(config::uart_int(uart_no));
        // SAFETY: the registry lock keeps the instance alive, and any
        // thread between lookup and lock also holds the registry lock, so
        // taking the instance mutex here waits out every in-flight user.
        let st = unsafe { &*raw };
        let _guard = st.lock.lock()?;
        // SAFETY: lock held; the NVIC disable above stopped the handler.
        unsafe { (*st.hw.get()).shutdown() };
        INSTANCES[uart_no].store(ptr::null_mut(), Ordering::Release);
    }
    // Unpublished under the registry lock: no task-context path can reach
    // the instance any more, and the vector is disabled.
    // SAFETY: this thread is now the sole owner of the allocation.
    unsafe {
        let st = &*raw;
        st.lock.delete()?;
        drop(Box::from_raw(raw));
    }
    Ok(())
}

/// Queues as much of `data` as fits in the transmit buffer and wakes the
/// dispatcher. Returns the number of bytes accepted.
pub fn write(uart_no: usize, data: &[u8]) -> Result<usize, UartError> {
    let (st, guard) = acquire(uart_no)?;
    // SAFETY: task data accessed under the lock.
    let n = unsafe { (*st.task.get()).tx_buf.append(data) };
    drop(guard);
    if n > 0 {
        os::request_dispatch(uart_no, false);
    }
    Ok(n)
}

/// Copies buffered receive bytes into `out`. Returns the number copied,
/// which may be zero. Draining the buffer may let the bottom half re-arm
/// receive interrupts, so a dispatch pass is requested afterwards.
pub fn read(uart_no: usize, out: &mut [u8]) -> Result<usize, UartError> {
    let (st, guard) = acquire(uart_no)?;
    // SAFETY: task data accessed under the lock.
    let n = unsafe { (*st.task.get()).rx_buf.read_into(out) };
    drop(guard);
    if n > 0 {
        os::request_dispatch(uart_no, false);
    }
    Ok(n)
}

/// Pauses or resumes reception. Disabling signals not-ready to the peer when
/// flow control is configured, and keeps receive interrupts masked either
/// way; data already buffered stays readable.
pub fn set_rx_enabled(uart_no: usize, enabled: bool) -> Result<(), UartError> {
    let (st, _guard) = acquire(uart_no)?;
    // SAFETY: task data and hw accessed under the lock.
    unsafe {
        (*st.task.get()).rx_enabled = enabled;
        if st.cfg.rx_fc_ena {
            (*st.hw.get()).set_rx_ready(enabled);
        }
        dispatch::bottom(st);
    }
    Ok(())
}

/// Blocks until the transmit buffer and the hardware FIFO are both empty and
/// the line is idle.
pub fn flush(uart_no: usize) -> Result<(), UartError> {
    loop {
        let (st, _guard) = acquire(uart_no)?;
        // SAFETY: buffer and hw accessed under the lock.
        let drained = unsafe {
            dispatch::tx_top(st);
            (*st.task.get()).tx_buf.used() == 0
        };
        if drained {
            // FIFO may still be shifting the tail of the data out.
            unsafe {
                while (*st.hw.get()).busy() {
                    core::hint::spin_loop();
                }
            }
            return Ok(());
        }
    }
}

/// Modem status query: true when the peer signals clear-to-send.
pub fn cts(uart_no: usize) -> Result<bool, UartError> {
    let (st, _guard) = acquire(uart_no)?;
    // SAFETY: hw accessed under the lock.
    Ok(unsafe { (*st.hw.get()).cts() })
}

/// Raw (unmasked) pending interrupt sources, for diagnostics.
pub fn raw_ints(uart_no: usize) -> Result<u32, UartError> {
    let (st, _guard) = acquire(uart_no)?;
    // SAFETY: hw accessed under the lock.
    Ok(unsafe { (*st.hw.get()).int_status(false) })
}

/// Currently unmasked interrupt sources, for diagnostics.
pub fn int_mask(uart_no: usize) -> Result<u32, UartError> {
    let (st, _guard) = acquire(uart_no)?;
    // SAFETY: hw accessed under the lock.
    Ok(unsafe { (*st.hw.get()).int_mask() })
}

/// Consistent counters snapshot.
pub fn stats(uart_no: usize) -> Result<UartStats, UartError> {
    let (st, _guard) = acquire(uart_no)?;
    // SAFETY: task data accessed under the lock.
    let task = unsafe { &*st.task.get() };
    Ok(UartStats {
        ints: st.isr_stats.ints.load(Ordering::Relaxed),
        rx_ints: st.isr_stats.rx_ints.load(Ordering::Relaxed),
        tx_ints: st.isr_stats.tx_ints.load(Ordering::Relaxed),
        rx_bytes: task.rx_bytes,
        tx_bytes: task.tx_bytes,
        rx_overruns: st.isr_stats.rx_overruns.load(Ordering::Relaxed),
        rx_isr_ring_full: st.isr_stats.rx_isr_ring_full.load(Ordering::Relaxed),
        rx_linger_conts: task.rx_linger_conts,
    })
}
