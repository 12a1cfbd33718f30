//! Hardware memory map and register constants for the CC32xx UART blocks.
//!
//! This module centralizes base addresses, register offsets, and bit masks,
//! eliminating magic numbers across the driver modules. The two UART
//! instances share one register layout.
//!
//! # Memory Map
//!
//! | Peripheral | Base Address | IRQ |
//! |------------|--------------|-----|
//! | UARTA0     | 0x4000_C000  | 21  |
//! | UARTA1     | 0x4000_D000  | 22  |

/// UARTA0 base address.
pub const UARTA0_BASE: usize = 0x4000_C000;

/// UARTA1 base address.
pub const UARTA1_BASE: usize = 0x4000_D000;

/// UARTA0 interrupt number (exception 16 + IRQ 5).
pub const INT_UARTA0: u32 = 21;

/// UARTA1 interrupt number.
pub const INT_UARTA1: u32 = 22;

/// NVIC priority programmed for both UART vectors.
pub const UART_INT_PRIORITY: u8 = 0x20;

/// Peripheral clock feeding the baud-rate generator (80 MHz system clock).
pub const UART_CLK_HZ: u32 = 80_000_000;

/// Number of physical UART instances.
pub const NUM_UARTS: usize = 2;

/// Register byte offsets from the instance base address.
pub mod reg {
    /// Data register.
    pub const DR: usize = 0x000;
    /// Receive status / error clear register.
    pub const RSR: usize = 0x004;
    /// Flag register.
    pub const FR: usize = 0x018;
    /// Integer baud-rate divisor.
    pub const IBRD: usize = 0x024;
    /// Fractional baud-rate divisor.
    pub const FBRD: usize = 0x028;
    /// Line control register.
    pub const LCRH: usize = 0x02C;
    /// Control register.
    pub const CTL: usize = 0x030;
    /// FIFO trigger level select.
    pub const IFLS: usize = 0x034;
    /// Interrupt mask register.
    pub const IM: usize = 0x038;
    /// Raw interrupt status.
    pub const RIS: usize = 0x03C;
    /// Masked interrupt status.
    pub const MIS: usize = 0x040;
    /// Interrupt clear register.
    pub const ICR: usize = 0x044;
}

// Interrupt bits (IM/RIS/MIS/ICR).

/// Receive overrun error interrupt.
pub const UART_INT_OE: u32 = 1 << 10;
/// Receive timeout interrupt (data sitting below the FIFO trigger level).
pub const UART_INT_RT: u32 = 1 << 6;
/// Transmit FIFO level interrupt.
pub const UART_INT_TX: u32 = 1 << 5;
/// Receive FIFO level interrupt.
pub const UART_INT_RX: u32 = 1 << 4;

/// Interrupt sources that deliver received data.
pub const UART_RX_INTS: u32 = UART_INT_RX | UART_INT_RT;
/// Interrupt sources that report transmit FIFO space.
pub const UART_TX_INTS: u32 = UART_INT_TX;
/// Informational sources kept enabled at all times.
pub const UART_INFO_INTS: u32 = UART_INT_OE;
/// Every interrupt source of the block.
pub const UART_ALL_INTS: u32 = 0xFFFF_FFFF;

// Flag register bits.

/// Clear-to-send input state (modem status).
pub const FR_CTS: u32 = 1 << 0;
/// UART busy shifting bits out.
pub const FR_BUSY: u32 = 1 << 3;
/// Receive FIFO empty.
pub const FR_RXFE: u32 = 1 << 4;
/// Transmit FIFO full.
pub const FR_TXFF: u32 = 1 << 5;

// Line control bits.

/// FIFO enable.
pub const LCRH_FEN: u32 = 1 << 4;
/// 8 data bits.
pub const LCRH_WLEN_8: u32 = 0x60;

// Control register bits.

/// UART enable.
pub const CTL_UARTEN: u32 = 1 << 0;
/// Transmit section enable.
pub const CTL_TXE: u32 = 1 << 8;
/// Receive section enable.
pub const CTL_RXE: u32 = 1 << 9;
/// Request-to-send output value when under software control (1 = not ready).
pub const CTL_RTS: u32 = 1 << 11;
/// Hardware-managed RTS flow control enable.
pub const CTL_RTSEN: u32 = 1 << 14;
/// Hardware-managed CTS flow control enable.
pub const CTL_CTSEN: u32 = 1 << 15;

// FIFO trigger level encodings.

/// Transmit interrupt at 1/8 full.
pub const IFLS_TX1_8: u32 = 0x00;
/// Receive interrupt at 7/8 full.
pub const IFLS_RX7_8: u32 = 0x18;

// NVIC / vector table addresses (Cortex-M).

/// Interrupt set-enable registers base.
pub const NVIC_EN_BASE: usize = 0xE000_E100;
/// Interrupt clear-enable registers base.
pub const NVIC_DIS_BASE: usize = 0xE000_E180;
/// Interrupt priority registers base (byte-addressed).
pub const NVIC_PRI_BASE: usize = 0xE000_E400;
/// Vector table offset register.
pub const NVIC_VTOR: usize = 0xE000_ED08;

/// Base address for a UART instance number, if it exists.
pub fn uart_base(uart_no: usize) -> Option<usize> {
    match uart_no {
        0 => Some(UARTA0_BASE),
        1 => Some(UARTA1_BASE),
        _ => None,
    }
}

/// Interrupt number for a (validated) UART instance number.
pub fn uart_int(uart_no: usize) -> u32 {
    if uart_no == 0 {
        INT_UARTA0
    } else {
        INT_UARTA1
    }
}
