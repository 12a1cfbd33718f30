//! Interrupt handlers.
//!
//! The handler's contract is short: record what fired, stash receive bytes in
//! the auxiliary ring, wake the dispatcher, and mask every source it handled
//! so the line stays quiet until the dispatcher's bottom half decides what to
//! re-arm. All real work is deferred.

use core::sync::atomic::Ordering;

use crate::config;
use crate::os;
use crate::uart::instance_ptr;

/// Shared body of the per-instance handlers.
///
/// # Safety
///
/// Must only run in interrupt context (or a test standing in for it): it
/// assumes it cannot be preempted by the dispatcher and that it is the sole
/// producer for the instance's auxiliary ring.
pub unsafe fn handle_interrupt(uart_no: usize) {
    let raw = instance_ptr(uart_no);
    if raw.is_null() {
        // Spurious: the instance was torn down between the interrupt firing
        // and the handler running.
        return;
    }
    let st = &*raw;
    let hw = &mut *st.hw.get();

    let status = hw.int_status(true);
    st.isr_stats.ints.fetch_add(1, Ordering::Relaxed);

    // Transmit-space interrupts are level-triggered against FIFO occupancy;
    // they must always be masked here or they would refire forever.
    let mut mask = config::UART_TX_INTS;

    if status & config::UART_INT_OE != 0 {
        st.isr_stats.rx_overruns.fetch_add(1, Ordering::Relaxed);
    }

    if status & (config::UART_RX_INTS | config::UART_TX_INTS) != 0 {
        if status & config::UART_RX_INTS != 0 {
            st.isr_stats.rx_ints.fetch_add(1, Ordering::Relaxed);
            while !st.isr_rx.is_full() && hw.byte_avail() {
                // SAFETY: this handler is the ring's only producer.
                let _ = st.isr_rx.push(hw.read_byte());
            }
            if st.isr_rx.is_full() {
                // Out of staging space. Mask receive and lean on the hardware
                // FIFO (and flow control, if configured) until the dispatcher
                // drains the ring.
                mask |= config::UART_RX_INTS;
                st.isr_stats.rx_isr_ring_full.fetch_add(1, Ordering::Relaxed);
            }
        }
        if status & config::UART_TX_INTS != 0 {
            st.isr_stats.tx_ints.fetch_add(1, Ordering::Relaxed);
        }
        // Only a data-path cause earns a wakeup; a spurious or
        // overrun-only entry has nothing for the dispatcher to do.
        os::request_dispatch(uart_no, true);
    }

    hw.int_disable(mask);
    hw.int_clear(status);
}

/// UARTA0 vector entry.
///
/// # Safety
///
/// See [`handle_interrupt`].
#[no_mangle]
pub unsafe extern "C" fn uarta0_int_handler() {
    handle_interrupt(0);
}

/// UARTA1 vector entry.
///
/// # Safety
///
/// See [`handle_interrupt`].
#[no_mangle]
pub unsafe extern "C" fn uarta1_int_handler() {
    handle_interrupt(1);
}

pub(crate) fn vector(uart_no: usize) -> unsafe extern "C" fn() {
    if uart_no == 0 {
        uarta0_int_handler
    } else {
        uarta1_int_handler
    }
}
