//! Deferred dispatch: the thread-context half of the data path.
//!
//! A dispatch pass runs with the instance mutex held and has three stages.
//! The RX top half moves bytes auxiliary ring → main buffer and then FIFO →
//! main buffer, lingering briefly for burst stragglers. The TX top half moves
//! bytes main buffer → FIFO. The bottom half then programs the interrupt mask
//! to exactly what current buffer occupancy justifies, which is what lets the
//! handler mask sources freely without losing wakeups.

use crate::config;
use crate::hw::UartHw;
use crate::os;
use crate::uart::{self, TaskData, UartError, UartState, MAX_UARTS};

// Linger spin calibration: iterations per microsecond of budget, measured
// for the polling loop below at 80 MHz. Retune if the loop body or the
// core clock changes.
const LINGER_SPINS_NUM: u32 = 31;
const LINGER_SPINS_DEN: u32 = 12;

fn linger_budget(micros: u32) -> u32 {
    micros.saturating_mul(LINGER_SPINS_NUM) / LINGER_SPINS_DEN
}

/// Moves whatever the receive FIFO holds into the main buffer, bounded by
/// buffer space.
fn fifo_drain(task: &mut TaskData, hw: &mut dyn UartHw) {
    while task.rx_buf.avail() > 0 && hw.byte_avail() {
        task.rx_buf.append_one(hw.read_byte());
        task.rx_bytes += 1;
    }
}

/// RX top half. Caller holds the instance lock.
///
/// # Safety
///
/// Must only run with `st.lock` held; it is the auxiliary ring's sole
/// consumer while it runs.
unsafe fn rx_top(st: &UartState) {
    let task = &mut *st.task.get();
    let hw = (*st.hw.get()).as_mut();
    let rx_bytes_before = task.rx_bytes;

    if !st.isr_rx.is_empty() {
        // Quiesce receive interrupts while consuming the ring so the handler
        // does not keep refilling it under us.
        critical_section::with(|_| hw.int_disable(config::UART_RX_INTS));
        while task.rx_buf.avail() > 0 {
            // SAFETY: lock held, single consumer.
            match st.isr_rx.pop() {
                Some(b) => {
                    task.rx_buf.append_one(b);
                    task.rx_bytes += 1;
                }
                None => break,
            }
        }
    }

    if task.rx_enabled {
        fifo_drain(task, hw);
        // A sender mid-burst delivers the next byte within a character time;
        // when this pass saw data, polling a little longer coalesces the
        // burst into one pass instead of taking an interrupt per FIFO
        // refill. One budget bounds the whole pass, so a chatty peer cannot
        // pin the dispatcher.
        if task.rx_bytes != rx_bytes_before {
            let mut budget = linger_budget(st.cfg.rx_linger_micros);
            while budget > 0 && task.rx_buf.avail() > 0 {
                budget -= 1;
                if hw.byte_avail() {
                    task.rx_linger_conts += 1;
                    fifo_drain(task, hw);
                } else {
                    core::hint::spin_loop();
                }
            }
        }
        hw.int_clear(config::UART_RX_INTS);
    }
}

/// TX top half. Caller holds the instance lock.
///
/// # Safety
///
/// Must only run with `st.lock` held.
pub(crate) unsafe fn tx_top(st: &UartState) {
    let task = &mut *st.task.get();
    let hw = &mut *st.hw.get();
    while task.tx_buf.used() > 0 && hw.space_avail() {
        let b = task.tx_buf.contig(1)[0];
        hw.write_byte(b);
        task.tx_buf.consume(1);
        task.tx_bytes += 1;
    }
    hw.int_clear(config::UART_TX_INTS);
}

/// Bottom half: sets the interrupt mask from buffer occupancy. Receive is
/// armed iff reception is enabled and the auxiliary ring has room; transmit
/// iff bytes are waiting; overrun reporting stays armed always.
///
/// # Safety
///
/// Must only run with `st.lock` held.
pub(crate) unsafe fn bottom(st: &UartState) {
    let task = &*st.task.get();
    let hw = &mut *st.hw.get();
    let mut ena = config::UART_INFO_INTS;
    if task.rx_enabled && !st.isr_rx.is_full() {
        ena |= config::UART_RX_INTS;
    }
    if task.tx_buf.used() > 0 {
        ena |= config::UART_TX_INTS;
    }
    critical_section::with(|_| {
        hw.int_disable((config::UART_RX_INTS | config::UART_TX_INTS) & !ena);
        hw.int_enable(ena);
    });
}

/// Runs one full dispatch pass for an instance.
pub fn dispatch(uart_no: usize) -> Result<(), UartError> {
    let (st, _guard) = uart::acquire(uart_no)?;
    // SAFETY: all three stages run under the instance lock.
    unsafe {
        rx_top(st);
        tx_top(st);
        bottom(st);
    }
    Ok(())
}

/// Body of the dispatcher thread: waits for wakeups and dispatches every
/// instance whose flag bit is set. Instances torn down between wakeup and
/// dispatch are skipped.
pub fn dispatcher_loop() -> ! {
    loop {
        let bits = match os::wait_dispatch() {
            Ok(bits) => bits,
            Err(_) => {
                // Flags group missing or wait aborted; back off one tick.
                // SAFETY: sleeping is always legal from thread context.
                unsafe {
                    let _ = threadx_sys::_tx_thread_sleep(1);
                }
                continue;
            }
        };
        for uart_no in 0..MAX_UARTS {
            if bits & (1 << uart_no) != 0 {
                let _ = dispatch(uart_no);
            }
        }
    }
}
