//! Bindings for the ThreadX kernel services the UART driver consumes.
//!
//! Only the small slice of the ThreadX API the driver actually calls is
//! declared here: mutexes, event flags, and interrupt posture control. On Arm
//! targets the symbols resolve against the ThreadX library linked into the
//! final image. On any other target the crate compiles stub implementations
//! instead, so driver code and its test suite build and run on a development
//! host without an RTOS.

#![no_std]
#![allow(non_camel_case_types)]
#![allow(clippy::missing_safety_doc)]

/// ThreadX unsigned int type.
pub type UINT = u32;

/// ThreadX unsigned long type.
pub type ULONG = u32;

/// ThreadX char type.
pub type CHAR = i8;

pub const TX_NO_WAIT: ULONG = 0;
pub const TX_WAIT_FOREVER: ULONG = 0xFFFF_FFFF;

pub const TX_OR: UINT = 0;
pub const TX_OR_CLEAR: UINT = 1;
pub const TX_AND: UINT = 2;
pub const TX_AND_CLEAR: UINT = 3;

pub const TX_INHERIT: UINT = 1;
pub const TX_NO_INHERIT: UINT = 0;

/// Interrupt posture values for `_tx_thread_interrupt_control` on the
/// Cortex-M ports (PRIMASK semantics).
pub const TX_INT_DISABLE: UINT = 1;
pub const TX_INT_ENABLE: UINT = 0;

/// Operation completed successfully (TX_SUCCESS = 0x00)
pub const TX_SUCCESS: UINT = 0x00;
/// Resource was deleted during the operation (TX_DELETED = 0x01)
pub const TX_DELETED: UINT = 0x01;
/// Invalid event flags group pointer (TX_GROUP_ERROR = 0x06)
pub const TX_GROUP_ERROR: UINT = 0x06;
/// Requested events not present (TX_NO_EVENTS = 0x07)
pub const TX_NO_EVENTS: UINT = 0x07;
/// Invalid caller context, e.g. a blocking call from an ISR (TX_CALLER_ERROR = 0x13)
pub const TX_CALLER_ERROR: UINT = 0x13;
/// Wait was aborted (TX_WAIT_ABORTED = 0x1A)
pub const TX_WAIT_ABORTED: UINT = 0x1A;
/// Invalid mutex pointer (TX_MUTEX_ERROR = 0x1C)
pub const TX_MUTEX_ERROR: UINT = 0x1C;
/// Resource not available without suspension (TX_NOT_AVAILABLE = 0x1D)
pub const TX_NOT_AVAILABLE: UINT = 0x1D;
/// Mutex is not owned by the caller (TX_NOT_OWNED = 0x1E)
pub const TX_NOT_OWNED: UINT = 0x1E;

/// Mutex control block.
///
/// The layout is opaque to Rust; the blob is sized comfortably above the
/// kernel's control block so ThreadX can use the storage freely. The trailing
/// named field is positioned for the host stubs only and must not be relied
/// upon when running against the real kernel.
#[repr(C)]
pub struct TX_MUTEX {
    _opaque: [u32; 28],
    pub tx_mutex_ownership_count: ULONG,
}

/// Event flags group control block. Same layout caveats as [`TX_MUTEX`].
#[repr(C)]
pub struct TX_EVENT_FLAGS_GROUP {
    _opaque: [u32; 24],
    pub tx_event_flags_group_current: ULONG,
}

#[cfg(target_arch = "arm")]
extern "C" {
    pub fn _tx_mutex_create(mutex_ptr: *mut TX_MUTEX, name_ptr: *mut CHAR, inherit: UINT) -> UINT;
    pub fn _tx_mutex_get(mutex_ptr: *mut TX_MUTEX, wait_option: ULONG) -> UINT;
    pub fn _tx_mutex_put(mutex_ptr: *mut TX_MUTEX) -> UINT;
    pub fn _tx_mutex_delete(mutex_ptr: *mut TX_MUTEX) -> UINT;

    pub fn _tx_event_flags_create(group_ptr: *mut TX_EVENT_FLAGS_GROUP, name_ptr: *mut CHAR)
        -> UINT;
    pub fn _tx_event_flags_delete(group_ptr: *mut TX_EVENT_FLAGS_GROUP) -> UINT;
    pub fn _tx_event_flags_set(
        group_ptr: *mut TX_EVENT_FLAGS_GROUP,
        flags_to_set: ULONG,
        set_option: UINT,
    ) -> UINT;
    pub fn _tx_event_flags_get(
        group_ptr: *mut TX_EVENT_FLAGS_GROUP,
        requested_flags: ULONG,
        get_option: UINT,
        actual_flags_ptr: *mut ULONG,
        wait_option: ULONG,
    ) -> UINT;

    pub fn _tx_thread_interrupt_control(new_posture: UINT) -> UINT;
    pub fn _tx_thread_sleep(timer_ticks: ULONG) -> UINT;
}

#[cfg(not(target_arch = "arm"))]
mod host_stubs;
#[cfg(not(target_arch = "arm"))]
pub use host_stubs::*;
