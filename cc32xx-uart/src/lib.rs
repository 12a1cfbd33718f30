//! Interrupt-driven UART receive/transmit path for CC32xx-class parts.
//!
//! The hardware receive FIFO on these parts is only 16 bytes deep, which can
//! overflow in less time than it takes to acquire any lock usable from task
//! context. The driver therefore splits reception across two contexts:
//!
//! - The interrupt handler ([`isr`]) drains the FIFO into a small lock-free
//!   auxiliary ring and exits within a handful of register accesses. It never
//!   blocks and never touches the mutex-guarded main buffers.
//! - The deferred dispatcher ([`dispatch`]) runs in a ThreadX thread holding
//!   the instance mutex, moves bytes auxiliary ring → main RX buffer and
//!   FIFO → main RX buffer, and lingers briefly to coalesce bursts before the
//!   bottom half re-arms exactly the interrupt sources the buffer occupancy
//!   justifies.
//!
//! Back-pressure instead of loss: when the auxiliary ring fills, the handler
//! masks receive interrupts and the bottom half unmasks them once the
//! dispatcher has made room.

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod config;
pub mod dispatch;
pub mod hw;
pub mod isr;
pub mod isr_ring;
pub mod os;
pub mod rbuf;
pub mod uart;

#[cfg(target_arch = "arm")]
pub mod heap;

pub use dispatch::{dispatch, dispatcher_loop};
pub use hw::{MmioUart, UartHw};
pub use uart::{
    cts, deinit, flush, init, init_with_hw, int_mask, raw_ints, read, set_rx_enabled, stats,
    write, UartConfig, UartError, UartStats, MAX_UARTS,
};
