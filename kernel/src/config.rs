//! Kernel configuration and component composition
//!
//! This module handles compile-time kernel configuration and component
//! composition based on cargo features, plus the tunables of the bring-up
//! path.

use crate::components::console::Console;
#[cfg(any(feature = "console-mini-uart", not(feature = "console-null")))]
use crate::components::console::mini_uart::{MiniUartConfig, MiniUartConsole};
#[cfg(all(feature = "console-null", not(feature = "console-mini-uart")))]
use crate::components::console::null::{NullConfig, NullConsole};
#[cfg(any(feature = "console-mini-uart", not(feature = "console-null")))]
use crate::mmio::PhysicalMmio;

/// Offset of the VideoCore's L2-cached alias of ARM physical memory
pub const BUS_ADDRESS_OFFSET: u32 = 0x4000_0000;

/// Poll iterations a single mailbox send/receive may spend waiting
pub const MAILBOX_POLL_LIMIT: u32 = 1 << 20;

/// Receive attempts the framebuffer negotiation makes before giving up
pub const FRAMEBUFFER_RETRY_LIMIT: u32 = 10_000;

/// Requested display resolution
pub const FRAMEBUFFER_WIDTH: u32 = 800;
pub const FRAMEBUFFER_HEIGHT: u32 = 480;

/// System timer period in 1 MHz ticks (200 ms)
pub const TIMER_INTERVAL_TICKS: u32 = 200_000;

/// Console component selection (compile-time)
///
/// This uses cargo features to select which console implementation to use:
/// - `console-mini-uart`: AUX mini UART (default)
/// - `console-null`: No console output (production builds)
///
/// The mini UART is used when `console-mini-uart` is enabled, and also when
/// neither feature is. `console-null` only takes effect on its own, so
/// adding it on top of the default features keeps the UART.
#[cfg(feature = "console-mini-uart")]
pub static CONSOLE: MiniUartConsole<PhysicalMmio> = MiniUartConsole::new(PhysicalMmio, MINI_UART);

#[cfg(all(feature = "console-null", not(feature = "console-mini-uart")))]
pub static CONSOLE: NullConsole = NullConsole::new(NullConfig);

// Default to the mini UART if no console feature is specified
#[cfg(not(any(feature = "console-mini-uart", feature = "console-null")))]
pub static CONSOLE: MiniUartConsole<PhysicalMmio> = MiniUartConsole::new(PhysicalMmio, MINI_UART);

#[cfg(any(feature = "console-mini-uart", not(feature = "console-null")))]
const MINI_UART: MiniUartConfig = MiniUartConfig {
    mmio_base: crate::board::AUX_BASE,
    baud_divisor: 270, // 115200 baud at a 250 MHz core clock
};

/// Name of the selected console, printed in the boot banner
#[cfg(any(feature = "console-mini-uart", not(feature = "console-null")))]
pub const CONSOLE_NAME: &str = "mini-uart";

#[cfg(all(feature = "console-null", not(feature = "console-mini-uart")))]
pub const CONSOLE_NAME: &str = "null";

/// Initialize kernel console component
///
/// Must be called early in boot sequence before any debug output.
pub fn init_console() {
    CONSOLE.init();
}

/// Get reference to the global console
///
/// This provides a typed reference to the console component for use
/// by the debug output system.
pub fn console() -> &'static impl Console {
    &CONSOLE
}
