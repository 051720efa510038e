//! BCM283x peripheral register map
//!
//! All addresses are ARM physical addresses. The peripheral window base is
//! selected by the `board-*` feature; every block below sits at a fixed
//! offset from it.

/// Peripheral window base
#[cfg(not(feature = "board-rpi1"))]
pub const PERIPHERAL_BASE: usize = 0x3F00_0000;

#[cfg(not(feature = "board-rpi1"))]
pub const BOARD_NAME: &str = "Raspberry Pi 3 (BCM2837)";

/// Peripheral window base
#[cfg(feature = "board-rpi1")]
pub const PERIPHERAL_BASE: usize = 0x2000_0000;

#[cfg(feature = "board-rpi1")]
pub const BOARD_NAME: &str = "Raspberry Pi 1 (BCM2835)";

// =============================================================================
// System timer (free-running 1 MHz counter + four compare channels)
// =============================================================================

pub const SYSTEM_TIMER_BASE: usize = PERIPHERAL_BASE + 0x3000;

/// Control/status: write 1 to bit n to clear the match flag of channel n
pub const TIMER_CS: usize = SYSTEM_TIMER_BASE + 0x00;
/// Counter, lower 32 bits
pub const TIMER_CLO: usize = SYSTEM_TIMER_BASE + 0x04;
/// Counter, upper 32 bits
pub const TIMER_CHI: usize = SYSTEM_TIMER_BASE + 0x08;
/// Compare channel 1 (channels 0 and 2 belong to the VideoCore)
pub const TIMER_C1: usize = SYSTEM_TIMER_BASE + 0x10;

/// Match flag of compare channel 1 in `TIMER_CS`
pub const TIMER_CS_M1: u32 = 1 << 1;

// =============================================================================
// Interrupt controller (ARM side)
// =============================================================================

pub const INTERRUPT_CONTROLLER_BASE: usize = PERIPHERAL_BASE + 0xB200;

pub const IRQ_PENDING_1: usize = INTERRUPT_CONTROLLER_BASE + 0x04;
pub const ENABLE_IRQS_1: usize = INTERRUPT_CONTROLLER_BASE + 0x10;
pub const DISABLE_IRQS_1: usize = INTERRUPT_CONTROLLER_BASE + 0x1C;

// =============================================================================
// VideoCore mailbox 0 (VC -> ARM) / mailbox 1 (ARM -> VC)
// =============================================================================

pub const MAILBOX_BASE: usize = PERIPHERAL_BASE + 0xB880;

pub const MAILBOX_READ: usize = MAILBOX_BASE + 0x00;
pub const MAILBOX_STATUS: usize = MAILBOX_BASE + 0x18;
pub const MAILBOX_WRITE: usize = MAILBOX_BASE + 0x20;

// =============================================================================
// AUX mini UART
// =============================================================================

pub const AUX_BASE: usize = PERIPHERAL_BASE + 0x21_5000;
