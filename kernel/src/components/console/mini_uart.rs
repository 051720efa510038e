//! AUX mini UART console component (minimal)
//!
//! Byte-level FIFO poke/peek on the BCM283x mini UART. Pin muxing of GPIO
//! 14/15 to ALT5 is left to the firmware (`enable_uart=1` in config.txt).

use super::Console;
use crate::mmio::{delay, Mmio};

// Register offsets from the AUX block base
const AUX_ENABLES: usize = 0x04;
const AUX_MU_IO: usize = 0x40;
const AUX_MU_IER: usize = 0x44;
const AUX_MU_IIR: usize = 0x48;
const AUX_MU_LCR: usize = 0x4C;
const AUX_MU_MCR: usize = 0x50;
const AUX_MU_LSR: usize = 0x54;
const AUX_MU_CNTL: usize = 0x60;
const AUX_MU_BAUD: usize = 0x68;

/// LSR: receive FIFO holds at least one byte
const LSR_DATA_READY: u32 = 1 << 0;
/// LSR: transmit FIFO can accept a byte
const LSR_TX_EMPTY: u32 = 1 << 5;

/// Mini UART console component configuration
#[derive(Clone, Copy)]
pub struct MiniUartConfig {
    /// Physical base of the AUX block
    pub mmio_base: usize,
    /// Value for AUX_MU_BAUD (`core_clock / (8 * baud) - 1`)
    pub baud_divisor: u32,
}

/// Mini UART console
pub struct MiniUartConsole<B: Mmio> {
    bus: B,
    base: usize,
    baud_divisor: u32,
}

impl<B: Mmio> MiniUartConsole<B> {
    /// Create a new mini UART console from configuration
    pub const fn new(bus: B, config: MiniUartConfig) -> Self {
        Self {
            bus,
            base: config.mmio_base,
            baud_divisor: config.baud_divisor,
        }
    }

    /// Enable the mini UART: 8 data bits, no flow control, RX and TX on
    pub fn init(&self) {
        let enables = self.bus.read32(self.base + AUX_ENABLES);
        self.bus.write32(self.base + AUX_ENABLES, enables | 1);
        delay(150);

        // Keep TX/RX off while configuring
        self.bus.write32(self.base + AUX_MU_CNTL, 0);
        self.bus.write32(self.base + AUX_MU_IER, 0);
        self.bus.write32(self.base + AUX_MU_LCR, 3);
        self.bus.write32(self.base + AUX_MU_MCR, 0);
        // Clear both FIFOs
        self.bus.write32(self.base + AUX_MU_IIR, 0xC6);
        self.bus.write32(self.base + AUX_MU_BAUD, self.baud_divisor);
        self.bus.write32(self.base + AUX_MU_CNTL, 3);
    }

    /// Push one byte, waiting for room in the transmit FIFO
    pub fn write_byte(&self, byte: u8) {
        while self.bus.read32(self.base + AUX_MU_LSR) & LSR_TX_EMPTY == 0 {
            core::hint::spin_loop();
        }
        self.bus.write8(self.base + AUX_MU_IO, byte);
    }

    /// Pop one byte if the receive FIFO has one
    pub fn read_byte(&self) -> Option<u8> {
        if self.bus.read32(self.base + AUX_MU_LSR) & LSR_DATA_READY == 0 {
            return None;
        }
        Some(self.bus.read8(self.base + AUX_MU_IO))
    }
}

impl<B: Mmio + Send + Sync> Console for MiniUartConsole<B> {
    fn putc(&self, c: u8) {
        self.write_byte(c);
    }

    fn try_getc(&self) -> Option<u8> {
        self.read_byte()
    }
}
