//! Hardware access layer for a single UART block.
//!
//! [`UartHw`] is the seam between the data path and the registers: the
//! interrupt handler and the dispatcher only ever talk to the trait, so host
//! tests can substitute a simulated port while the target build uses
//! [`MmioUart`] over the memory-mapped block.

use crate::config::{self, reg};
use crate::uart::UartConfig;

/// Register-level operations the data path needs from a UART block.
///
/// Interrupt mask changes from thread context must be wrapped in a critical
/// section by the caller; the handler runs with interrupts already off.
pub trait UartHw: Send {
    /// True when the receive FIFO holds at least one byte.
    fn byte_avail(&self) -> bool;

    /// Pops one byte from the receive FIFO. Only valid after `byte_avail`.
    fn read_byte(&mut self) -> u8;

    /// True when the transmit FIFO can accept at least one byte.
    fn space_avail(&self) -> bool;

    /// Pushes one byte into the transmit FIFO. Only valid after `space_avail`.
    fn write_byte(&mut self, b: u8);

    /// Pending interrupt sources; `masked` selects MIS over RIS.
    fn int_status(&self, masked: bool) -> u32;

    /// Currently unmasked interrupt sources.
    fn int_mask(&self) -> u32;

    /// Unmasks the given interrupt sources.
    fn int_enable(&mut self, ints: u32);

    /// Masks the given interrupt sources.
    fn int_disable(&mut self, ints: u32);

    /// Acknowledges the given latched interrupt sources.
    fn int_clear(&mut self, ints: u32);

    /// True while the transmitter is still shifting bits out.
    fn busy(&self) -> bool;

    /// Modem status: true when the peer signals clear-to-send.
    fn cts(&self) -> bool;

    /// Programs line format, baud rate, FIFO levels, and flow control, then
    /// enables the block with all interrupt sources masked and cleared.
    fn program(&mut self, cfg: &UartConfig);

    /// Signals the peer whether we can accept data. With hardware flow
    /// control the ready state hands RTS back to the block; not-ready drives
    /// RTS inactive under software control.
    fn set_rx_ready(&mut self, ready: bool);

    /// Masks and clears all interrupts and disables the block.
    fn shutdown(&mut self);
}

/// Memory-mapped implementation over a real UART block.
pub struct MmioUart {
    base: usize,
}

impl MmioUart {
    /// # Safety
    ///
    /// `base` must be the base address of a UART block that is clocked and
    /// not concurrently driven by other code.
    pub const unsafe fn new(base: usize) -> Self {
        Self { base }
    }

    #[inline]
    fn read_reg(&self, offset: usize) -> u32 {
        // SAFETY: the constructor contract guarantees a live UART block at
        // `base`, and every offset used is a register of that block.
        unsafe { ((self.base + offset) as *const u32).read_volatile() }
    }

    #[inline]
    fn write_reg(&mut self, offset: usize, val: u32) {
        // SAFETY: see read_reg.
        unsafe { ((self.base + offset) as *mut u32).write_volatile(val) }
    }
}

// SAFETY: MmioUart is a plain base address; ownership transfers between
// threads are safe as long as only one context uses it at a time, which the
// driver's locking discipline enforces.
unsafe impl Send for MmioUart {}

impl UartHw for MmioUart {
    fn byte_avail(&self) -> bool {
        self.read_reg(reg::FR) & config::FR_RXFE == 0
    }

    fn read_byte(&mut self) -> u8 {
        self.read_reg(reg::DR) as u8
    }

    fn space_avail(&self) -> bool {
        self.read_reg(reg::FR) & config::FR_TXFF == 0
    }

    fn write_byte(&mut self, b: u8) {
        self.write_reg(reg::DR, b as u32);
    }

    fn int_status(&self, masked: bool) -> u32 {
        self.read_reg(if masked { reg::MIS } else { reg::RIS })
    }

    fn int_mask(&self) -> u32 {
        self.read_reg(reg::IM)
    }

    fn int_enable(&mut self, ints: u32) {
        let im = self.read_reg(reg::IM);
        self.write_reg(reg::IM, im | ints);
    }

    fn int_disable(&mut self, ints: u32) {
        let im = self.read_reg(reg::IM);
        self.write_reg(reg::IM, im & !ints);
    }

    fn int_clear(&mut self, ints: u32) {
        self.write_reg(reg::ICR, ints);
    }

    fn busy(&self) -> bool {
        self.read_reg(reg::FR) & config::FR_BUSY != 0
    }

    fn cts(&self) -> bool {
        self.read_reg(reg::FR) & config::FR_CTS != 0
    }

    fn program(&mut self, cfg: &UartConfig) {
        let ctl = self.read_reg(reg::CTL);
        self.write_reg(reg::CTL, ctl & !config::CTL_UARTEN);

        // Divisor in 1/64ths of a bit period, rounded to nearest:
        // div = clk / (baud / 8), split into integer and fractional parts.
        let div =
            ((config::UART_CLK_HZ as u64 * 8 / cfg.baud_rate as u64) + 1) / 2;
        self.write_reg(reg::IBRD, (div / 64) as u32);
        self.write_reg(reg::FBRD, (div % 64) as u32);

        // 8N1 with FIFOs on. LCRH write latches the divisor registers.
        self.write_reg(reg::LCRH, config::LCRH_WLEN_8 | config::LCRH_FEN);

        // Early TX refill, late RX drain: interrupt when the transmit FIFO
        // drops to 1/8 and when the receive FIFO reaches 7/8.
        self.write_reg(reg::IFLS, config::IFLS_TX1_8 | config::IFLS_RX7_8);

        self.write_reg(reg::IM, 0);
        self.write_reg(reg::ICR, config::UART_ALL_INTS);

        let mut ctl = config::CTL_UARTEN | config::CTL_TXE | config::CTL_RXE;
        if cfg.rx_fc_ena {
            ctl |= config::CTL_RTSEN;
        }
        if cfg.tx_fc_ena {
            ctl |= config::CTL_CTSEN;
        }
        self.write_reg(reg::CTL, ctl);
    }

    fn set_rx_ready(&mut self, ready: bool) {
        let ctl = self.read_reg(reg::CTL);
        if ready {
            self.write_reg(reg::CTL, ctl | config::CTL_RTSEN);
        } else {
            // Take RTS away from the block and drive it inactive so the peer
            // stops sending.
            self.write_reg(
                reg::CTL,
                (ctl & !config::CTL_RTSEN) | config::CTL_RTS,
            );
        }
    }

    fn shutdown(&mut self) {
        self.write_reg(reg::IM, 0);
        self.write_reg(reg::ICR, config::UART_ALL_INTS);
        let ctl = self.read_reg(reg::CTL);
        self.write_reg(reg::CTL, ctl & !config::CTL_UARTEN);
    }
}
