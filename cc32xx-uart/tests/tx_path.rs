//! Transmit-path behavior: buffer to FIFO movement, re-arming, flush.

mod common;

use cc32xx_uart::config::{UART_INT_TX, UART_TX_INTS};
use cc32xx_uart::isr::uarta1_int_handler;
use cc32xx_uart::{dispatch, flush, stats, write, UartConfig};
use common::{TestUart, TX_FIFO_DEPTH};

fn fire_isr() {
    // SAFETY: the harness serializes tests, so nothing else acts as the
    // interrupt context while this runs.
    unsafe { uarta1_int_handler() }
}

#[test]
fn one_pass_sends_everything_that_fits_the_fifo() {
    let t = TestUart::setup(1, UartConfig::default());
    let n = write(1, b"short message").unwrap();
    assert_eq!(n, 13);

    dispatch(1).unwrap();
    assert_eq!(t.sim.take_tx(), b"short message");

    let st = stats(1).unwrap();
    assert_eq!(st.tx_bytes, 13);
    // Nothing left to send, so the bottom half left transmit unarmed.
    assert_eq!(t.sim.state().int_mask & UART_TX_INTS, 0);
}

#[test]
fn pending_bytes_keep_transmit_armed_across_fifo_refills() {
    let t = TestUart::setup(1, UartConfig::default());
    let payload: Vec<u8> = (0..40u8).collect();
    assert_eq!(write(1, &payload).unwrap(), 40);

    dispatch(1).unwrap();
    let mut sent = t.sim.take_tx();
    assert_eq!(sent.len(), TX_FIFO_DEPTH);
    // More is waiting, so transmit interrupts stay armed.
    assert_ne!(t.sim.state().int_mask & UART_TX_INTS, 0);

    // Each FIFO-space interrupt earns another dispatch pass.
    while sent.len() < payload.len() {
        t.sim.raise(UART_INT_TX);
        fire_isr();
        dispatch(1).unwrap();
        let chunk = t.sim.take_tx();
        assert!(!chunk.is_empty());
        sent.extend_from_slice(&chunk);
    }
    assert_eq!(sent, payload);

    let st = stats(1).unwrap();
    assert_eq!(st.tx_bytes, 40);
    assert!(st.tx_ints >= 2);
    assert_eq!(t.sim.state().int_mask & UART_TX_INTS, 0);
}

#[test]
fn flush_drains_the_buffer_and_waits_for_the_line() {
    let t = TestUart::setup(1, UartConfig::default());
    write(1, b"flush me").unwrap();
    t.sim.state().busy_polls = 3;

    flush(1).unwrap();

    assert_eq!(t.sim.take_tx(), b"flush me");
    // flush returned only after busy() went idle.
    assert_eq!(t.sim.state().busy_polls, 0);
    assert_eq!(stats(1).unwrap().tx_bytes, 8);
}
