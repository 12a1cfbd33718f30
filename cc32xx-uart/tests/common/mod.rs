//! Shared test harness: a simulated UART port and per-test setup/teardown.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

use cc32xx_uart::config;
use cc32xx_uart::{init_with_hw, UartConfig, UartHw};

/// Hardware receive FIFO depth being modeled.
pub const FIFO_DEPTH: usize = 16;

/// Transmit FIFO depth being modeled.
pub const TX_FIFO_DEPTH: usize = 16;

pub struct SimInner {
    /// Receive FIFO contents.
    pub fifo: VecDeque<u8>,
    /// Bytes scheduled to arrive at a future tick, in tick order.
    pub schedule: VecDeque<(u64, u8)>,
    /// Simulated time. Advances one tick per `byte_avail` poll.
    pub ticks: u64,
    /// Bytes accepted into the transmit FIFO, oldest first. Tests drain this
    /// themselves via [`SimUart::take_tx`] to free FIFO space.
    pub tx: Vec<u8>,
    /// Latched interrupt causes.
    pub raw_status: u32,
    /// Interrupt mask.
    pub int_mask: u32,
    /// Last `set_rx_ready` value, if any.
    pub rts_ready: Option<bool>,
    /// State of the clear-to-send input from the peer.
    pub cts: bool,
    /// Config captured by `program`, if it ran.
    pub programmed: Option<UartConfig>,
    pub shut_down: bool,
    /// `busy()` reports true this many more times before going idle.
    pub busy_polls: u32,
}

impl SimInner {
    fn accept_rx(&mut self, b: u8) {
        if self.fifo.len() < FIFO_DEPTH {
            self.fifo.push_back(b);
            self.raw_status |= config::UART_INT_RX;
        } else {
            self.raw_status |= config::UART_INT_OE;
        }
    }

    fn pump_schedule(&mut self) {
        while let Some(&(due, b)) = self.schedule.front() {
            if due > self.ticks {
                break;
            }
            self.schedule.pop_front();
            self.accept_rx(b);
        }
    }
}

/// Simulated UART port. Clones share state, so a test keeps one handle while
/// the driver owns another.
#[derive(Clone)]
pub struct SimUart(Arc<Mutex<SimInner>>);

impl SimUart {
    pub fn new() -> Self {
        Self(Arc::new(Mutex::new(SimInner {
            fifo: VecDeque::new(),
            schedule: VecDeque::new(),
            ticks: 0,
            tx: Vec::new(),
            raw_status: 0,
            int_mask: 0,
            rts_ready: None,
            cts: false,
            programmed: None,
            shut_down: false,
            busy_polls: 0,
        })))
    }

    pub fn state(&self) -> MutexGuard<'_, SimInner> {
        self.0.lock().unwrap()
    }

    /// Delivers bytes immediately, overflowing into an overrun past the FIFO
    /// depth, and latches the receive cause.
    pub fn push_rx(&self, data: &[u8]) {
        let mut s = self.state();
        for &b in data {
            s.accept_rx(b);
        }
    }

    /// Delivers one byte `delta` ticks from now. Calls must be in
    /// non-decreasing delta order.
    pub fn schedule_rx(&self, delta: u64, b: u8) {
        let mut s = self.state();
        let due = s.ticks + delta;
        s.schedule.push_back((due, b));
    }

    /// Latches extra interrupt causes, e.g. a transmit-space event.
    pub fn raise(&self, causes: u32) {
        self.state().raw_status |= causes;
    }

    /// Removes and returns everything sent so far, freeing transmit FIFO
    /// space.
    pub fn take_tx(&self) -> Vec<u8> {
        std::mem::take(&mut self.state().tx)
    }
}

impl UartHw for SimUart {
    fn byte_avail(&self) -> bool {
        let mut s = self.state();
        s.ticks += 1;
        s.pump_schedule();
        !s.fifo.is_empty()
    }

    fn read_byte(&mut self) -> u8 {
        self.state().fifo.pop_front().unwrap_or(0)
    }

    fn space_avail(&self) -> bool {
        self.state().tx.len() < TX_FIFO_DEPTH
    }

    fn write_byte(&mut self, b: u8) {
        self.state().tx.push(b);
    }

    fn int_status(&self, masked: bool) -> u32 {
        let s = self.state();
        if masked {
            s.raw_status & s.int_mask
        } else {
            s.raw_status
        }
    }

    fn int_mask(&self) -> u32 {
        self.state().int_mask
    }

    fn int_enable(&mut self, ints: u32) {
        self.state().int_mask |= ints;
    }

    fn int_disable(&mut self, ints: u32) {
        self.state().int_mask &= !ints;
    }

    fn int_clear(&mut self, ints: u32) {
        let mut s = self.state();
        s.raw_status &= !ints;
        // The receive cause is level-like: it stays asserted while the FIFO
        // holds data.
        if !s.fifo.is_empty() {
            s.raw_status |= config::UART_INT_RX;
        }
    }

    fn cts(&self) -> bool {
        self.state().cts
    }

    fn busy(&self) -> bool {
        let mut s = self.state();
        if s.busy_polls > 0 {
            s.busy_polls -= 1;
            true
        } else {
            false
        }
    }

    fn program(&mut self, cfg: &UartConfig) {
        let mut s = self.state();
        s.programmed = Some(cfg.clone());
        s.int_mask = 0;
        s.raw_status = 0;
        s.shut_down = false;
    }

    fn set_rx_ready(&mut self, ready: bool) {
        self.state().rts_ready = Some(ready);
    }

    fn shutdown(&mut self) {
        let mut s = self.state();
        s.int_mask = 0;
        s.raw_status = 0;
        s.shut_down = true;
    }
}

fn serial_lock() -> &'static Mutex<()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
}

/// Serializes a test that manages instance lifetimes by hand instead of
/// through [`TestUart`].
pub fn serialize() -> MutexGuard<'static, ()> {
    serial_lock()
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Owns one initialized instance for the duration of a test. The global
/// instance table is process-wide, so tests in a binary are serialized.
pub struct TestUart {
    pub uart_no: usize,
    pub sim: SimUart,
    _serial: MutexGuard<'static, ()>,
}

impl TestUart {
    pub fn setup(uart_no: usize, cfg: UartConfig) -> TestUart {
        let serial = serial_lock()
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let sim = SimUart::new();
        init_with_hw(uart_no, cfg, Box::new(sim.clone())).expect("init");
        TestUart {
            uart_no,
            sim,
            _serial: serial,
        }
    }
}

impl Drop for TestUart {
    fn drop(&mut self) {
        let _ = cc32xx_uart::deinit(self.uart_no);
    }
}
