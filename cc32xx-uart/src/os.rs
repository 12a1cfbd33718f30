//! ThreadX kernel services the driver builds on.
//!
//! Two primitives carry the whole data path: a per-instance mutex guarding
//! the main buffers, and one event-flags group the interrupt handlers use to
//! wake the dispatcher thread. Both are thin RAII-style wrappers over the raw
//! `threadx-sys` calls.

use core::cell::UnsafeCell;
use core::marker::PhantomData;
use core::mem;
use core::sync::atomic::{AtomicBool, AtomicPtr, Ordering};

use byte_strings::c;
use static_cell::StaticCell;
use threadx_sys::{
    TX_EVENT_FLAGS_GROUP, TX_MUTEX, _tx_event_flags_create, _tx_event_flags_get,
    _tx_event_flags_set, _tx_mutex_create, _tx_mutex_delete, _tx_mutex_get, _tx_mutex_put, CHAR,
    TX_CALLER_ERROR, TX_DELETED, TX_INHERIT, TX_NOT_AVAILABLE, TX_OR, TX_OR_CLEAR, TX_SUCCESS,
    TX_WAIT_ABORTED, TX_WAIT_FOREVER, UINT,
};

/// Kernel service failure, folded down from the ThreadX status codes the
/// driver can actually encounter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OsError {
    /// The resource could not be acquired without waiting.
    NotAvailable,
    /// A blocking wait was aborted by another thread.
    WaitAborted,
    /// The object was deleted while a thread waited on it.
    Deleted,
    /// The service was invoked from a context that may not call it.
    InvalidCaller,
    /// Any other kernel status.
    Kernel(u32),
}

fn check(status: UINT) -> Result<(), OsError> {
    match status {
        TX_SUCCESS => Ok(()),
        TX_NOT_AVAILABLE => Err(OsError::NotAvailable),
        TX_WAIT_ABORTED => Err(OsError::WaitAborted),
        TX_DELETED => Err(OsError::Deleted),
        TX_CALLER_ERROR => Err(OsError::InvalidCaller),
        other => Err(OsError::Kernel(other)),
    }
}

/// A ThreadX mutex with priority inheritance.
///
/// The control block lives inside the wrapper, so the wrapper must not move
/// between `create` and `delete`. The driver keeps it inside a heap-allocated
/// instance whose address is stable for the instance's lifetime.
pub struct Lock {
    cb: UnsafeCell<TX_MUTEX>,
}

// SAFETY: the control block is only ever handed to the kernel, which performs
// its own serialization; the UnsafeCell is never accessed directly from two
// threads at once on our side.
unsafe impl Send for Lock {}
unsafe impl Sync for Lock {}

impl Lock {
    pub const fn new() -> Self {
        Self {
            // SAFETY: TX_MUTEX is a plain C struct; the kernel fully
            // initializes it in _tx_mutex_create before any other use.
            cb: UnsafeCell::new(unsafe { mem::zeroed() }),
        }
    }

    /// Registers the mutex with the kernel.
    ///
    /// # Safety
    ///
    /// `self` must stay at a stable address until `delete`, and `name` must
    /// be a NUL-terminated string that outlives the mutex.
    pub unsafe fn create(&self, name: *mut CHAR) -> Result<(), OsError> {
        check(_tx_mutex_create(self.cb.get(), name, TX_INHERIT))
    }

    /// Blocks until the mutex is owned; the guard releases it on drop.
    pub fn lock(&self) -> Result<LockGuard<'_>, OsError> {
        // SAFETY: create ran before the instance was published, so the
        // control block is valid.
        check(unsafe { _tx_mutex_get(self.cb.get(), TX_WAIT_FOREVER) })?;
        Ok(LockGuard {
            lock: self,
            _not_send: PhantomData,
        })
    }

    /// Unregisters the mutex.
    ///
    /// # Safety
    ///
    /// No thread may hold or be waiting on the mutex.
    pub unsafe fn delete(&self) -> Result<(), OsError> {
        check(_tx_mutex_delete(self.cb.get()))
    }
}

/// RAII ownership of a [`Lock`]. Releasing from a different thread than the
/// one that acquired is a kernel error, so the guard is `!Send`.
pub struct LockGuard<'a> {
    lock: &'a Lock,
    _not_send: PhantomData<*const ()>,
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        // SAFETY: the guard's existence proves this thread owns the mutex.
        let _ = unsafe { _tx_mutex_put(self.lock.cb.get()) };
    }
}

// One event-flags group serves every instance; bit N wakes the dispatcher
// for UART N. Created lazily on first init and never deleted, matching the
// lifetime of the dispatcher thread.
static DISPATCH_FLAGS_CB: StaticCell<TX_EVENT_FLAGS_GROUP> = StaticCell::new();
static DISPATCH_FLAGS: AtomicPtr<TX_EVENT_FLAGS_GROUP> = AtomicPtr::new(core::ptr::null_mut());
static DISPATCH_FLAGS_STORAGE: AtomicPtr<TX_EVENT_FLAGS_GROUP> =
    AtomicPtr::new(core::ptr::null_mut());
static SERVICES_CLAIMED: AtomicBool = AtomicBool::new(false);

// Driver-wide lock serializing instance-table lookups against teardown, so a
// thread cannot reach an instance that deinit is in the middle of freeing.
static REGISTRY_LOCK: Lock = Lock::new();
static REGISTRY_LOCK_READY: AtomicBool = AtomicBool::new(false);

/// The registry lock, once the shared services exist. Errs before the first
/// successful creation.
pub fn registry_lock() -> Result<&'static Lock, OsError> {
    if REGISTRY_LOCK_READY.load(Ordering::Acquire) {
        Ok(&REGISTRY_LOCK)
    } else {
        Err(OsError::NotAvailable)
    }
}

/// Creates the shared kernel objects (registry lock, dispatcher wakeup
/// group) if they do not exist yet. A creation failure releases the claim,
/// so a later call can retry instead of hanging behind a half-built state.
pub fn ensure_services() -> Result<(), OsError> {
    loop {
        if !DISPATCH_FLAGS.load(Ordering::Acquire).is_null() {
            return Ok(());
        }
        if SERVICES_CLAIMED
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            let created = create_services();
            if created.is_err() {
                SERVICES_CLAIMED.store(false, Ordering::Release);
            }
            return created;
        }
        // Another thread holds the claim; it either publishes the group or
        // releases the claim on failure, so keep polling both.
        core::hint::spin_loop();
    }
}

fn create_services() -> Result<(), OsError> {
    if !REGISTRY_LOCK_READY.load(Ordering::Acquire) {
        // SAFETY: static storage, static name.
        unsafe { REGISTRY_LOCK.create(c!("uart-registry").as_ptr() as *mut CHAR)? };
        REGISTRY_LOCK_READY.store(true, Ordering::Release);
    }
    let cb = match DISPATCH_FLAGS_CB.try_init(
        // SAFETY: plain C struct, fully initialized by the create call.
        unsafe { mem::zeroed() },
    ) {
        Some(cb) => {
            let cb = cb as *mut TX_EVENT_FLAGS_GROUP;
            DISPATCH_FLAGS_STORAGE.store(cb, Ordering::Release);
            cb
        }
        // A previous attempt took the storage but failed the kernel create;
        // reuse it.
        None => DISPATCH_FLAGS_STORAGE.load(Ordering::Acquire),
    };
    // SAFETY: cb points at static storage and the name is a static string.
    check(unsafe { _tx_event_flags_create(cb, c!("uart-dispatch").as_ptr() as *mut CHAR) })?;
    DISPATCH_FLAGS.store(cb, Ordering::Release);
    Ok(())
}

/// Wakes the dispatcher thread for `uart_no`. Callable from interrupt
/// handlers and threads alike; `_from_isr` is kept for call-site clarity,
/// the kernel service is the same in both contexts.
pub fn request_dispatch(uart_no: usize, _from_isr: bool) {
    let cb = DISPATCH_FLAGS.load(Ordering::Acquire);
    if cb.is_null() {
        return;
    }
    // SAFETY: cb was published after a successful create.
    let _ = unsafe { _tx_event_flags_set(cb, 1 << uart_no, TX_OR) };
}

/// Blocks until at least one instance requests dispatch; returns the bitmask
/// of requesting instances and clears it.
pub fn wait_dispatch() -> Result<u32, OsError> {
    let cb = DISPATCH_FLAGS.load(Ordering::Acquire);
    if cb.is_null() {
        return Err(OsError::NotAvailable);
    }
    let mut actual: u32 = 0;
    // SAFETY: cb was published after a successful create; actual is a valid
    // out-pointer for the duration of the call.
    check(unsafe {
        _tx_event_flags_get(cb, u32::MAX, TX_OR_CLEAR, &mut actual, TX_WAIT_FOREVER)
    })?;
    Ok(actual)
}

/// Points the vector table slot for `int_no` at `handler`, sets its NVIC
/// priority, and enables it.
#[cfg(target_arch = "arm")]
pub fn interrupt_register(int_no: u32, handler: unsafe extern "C" fn(), priority: u8) {
    use crate::config;
    // SAFETY: addresses are the architectural NVIC/VTOR registers; the
    // vector table is in RAM on this platform (VTOR points at it).
    unsafe {
        let vtor = (config::NVIC_VTOR as *const u32).read_volatile() as usize;
        let slot = (vtor + int_no as usize * 4) as *mut u32;
        slot.write_volatile(handler as usize as u32);
        let pri = (config::NVIC_PRI_BASE + (int_no as usize - 16)) as *mut u8;
        pri.write_volatile(priority);
        let en = (config::NVIC_EN_BASE + ((int_no as usize - 16) / 32) * 4) as *mut u32;
        en.write_volatile(1 << ((int_no - 16) % 32));
    }
}

#[cfg(not(target_arch = "arm"))]
pub fn interrupt_register(_int_no: u32, _handler: unsafe extern "C" fn(), _priority: u8) {}

/// Disables `int_no` at the NVIC.
#[cfg(target_arch = "arm")]
pub fn interrupt_disable(int_no: u32) {
    use crate::config;
    // SAFETY: architectural clear-enable register for this IRQ.
    unsafe {
        let dis = (config::NVIC_DIS_BASE + ((int_no as usize - 16) / 32) * 4) as *mut u32;
        dis.write_volatile(1 << ((int_no - 16) % 32));
    }
}

#[cfg(not(target_arch = "arm"))]
pub fn interrupt_disable(_int_no: u32) {}

/// Critical sections on target go through the kernel so the previous
/// interrupt posture is restored exactly, including under nesting.
#[cfg(target_arch = "arm")]
mod cs_impl {
    use core::sync::atomic::{compiler_fence, Ordering};
    use threadx_sys::{_tx_thread_interrupt_control, TX_INT_DISABLE};

    struct ThreadXCriticalSection;
    critical_section::set_impl!(ThreadXCriticalSection);

    unsafe impl critical_section::Impl for ThreadXCriticalSection {
        unsafe fn acquire() -> critical_section::RawRestoreState {
            let prev = _tx_thread_interrupt_control(TX_INT_DISABLE);
            compiler_fence(Ordering::Acquire);
            prev
        }

        unsafe fn release(prev: critical_section::RawRestoreState) {
            compiler_fence(Ordering::Release);
            let _ = _tx_thread_interrupt_control(prev);
        }
    }
}
