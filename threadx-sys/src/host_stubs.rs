//! Stub implementations of the bound ThreadX services for host builds.
//!
//! These let the driver crate and its tests link and run on a development
//! machine. They model just enough behavior to be useful in single-threaded
//! tests: mutexes track their ownership count, event flag groups hold real
//! flag state. None of them ever suspend the caller; a `get` that would have
//! to wait reports [`TX_NO_EVENTS`](crate::TX_NO_EVENTS) instead.

use core::sync::atomic::{AtomicBool, Ordering};

use crate::{
    CHAR, TX_AND, TX_EVENT_FLAGS_GROUP, TX_GROUP_ERROR, TX_MUTEX, TX_NOT_OWNED, TX_NO_EVENTS,
    TX_SUCCESS, UINT, ULONG,
};

static EVENT_FLAGS_CREATE_FAIL: AtomicBool = AtomicBool::new(false);

/// Arms a one-shot failure: the next `_tx_event_flags_create` call returns
/// `TX_GROUP_ERROR`. Lets tests exercise kernel-object creation failures
/// that cannot happen with the always-succeeding stubs otherwise.
pub fn fail_next_event_flags_create() {
    EVENT_FLAGS_CREATE_FAIL.store(true, Ordering::SeqCst);
}

pub unsafe fn _tx_mutex_create(
    mutex_ptr: *mut TX_MUTEX,
    _name_ptr: *mut CHAR,
    _inherit: UINT,
) -> UINT {
    (*mutex_ptr).tx_mutex_ownership_count = 0;
    TX_SUCCESS
}

pub unsafe fn _tx_mutex_get(mutex_ptr: *mut TX_MUTEX, _wait_option: ULONG) -> UINT {
    (*mutex_ptr).tx_mutex_ownership_count += 1;
    TX_SUCCESS
}

pub unsafe fn _tx_mutex_put(mutex_ptr: *mut TX_MUTEX) -> UINT {
    if (*mutex_ptr).tx_mutex_ownership_count == 0 {
        return TX_NOT_OWNED;
    }
    (*mutex_ptr).tx_mutex_ownership_count -= 1;
    TX_SUCCESS
}

pub unsafe fn _tx_mutex_delete(_mutex_ptr: *mut TX_MUTEX) -> UINT {
    TX_SUCCESS
}

pub unsafe fn _tx_event_flags_create(
    group_ptr: *mut TX_EVENT_FLAGS_GROUP,
    _name_ptr: *mut CHAR,
) -> UINT {
    if EVENT_FLAGS_CREATE_FAIL.swap(false, Ordering::SeqCst) {
        return TX_GROUP_ERROR;
    }
    (*group_ptr).tx_event_flags_group_current = 0;
    TX_SUCCESS
}

pub unsafe fn _tx_event_flags_delete(_group_ptr: *mut TX_EVENT_FLAGS_GROUP) -> UINT {
    TX_SUCCESS
}

pub unsafe fn _tx_event_flags_set(
    group_ptr: *mut TX_EVENT_FLAGS_GROUP,
    flags_to_set: ULONG,
    set_option: UINT,
) -> UINT {
    let current = &mut (*group_ptr).tx_event_flags_group_current;
    if set_option & TX_AND != 0 {
        *current &= flags_to_set;
    } else {
        *current |= flags_to_set;
    }
    TX_SUCCESS
}

pub unsafe fn _tx_event_flags_get(
    group_ptr: *mut TX_EVENT_FLAGS_GROUP,
    requested_flags: ULONG,
    get_option: UINT,
    actual_flags_ptr: *mut ULONG,
    _wait_option: ULONG,
) -> UINT {
    let current = &mut (*group_ptr).tx_event_flags_group_current;
    let satisfied = if get_option & TX_AND != 0 {
        *current & requested_flags == requested_flags
    } else {
        *current & requested_flags != 0
    };
    if !satisfied {
        return TX_NO_EVENTS;
    }
    *actual_flags_ptr = *current;
    if get_option & 1 != 0 {
        *current &= !requested_flags;
    }
    TX_SUCCESS
}

pub unsafe fn _tx_thread_interrupt_control(_new_posture: UINT) -> UINT {
    0
}

pub unsafe fn _tx_thread_sleep(_timer_ticks: ULONG) -> UINT {
    TX_SUCCESS
}
