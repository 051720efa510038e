//! Bring-up kernel for BCM283x boards
//!
//! Boots on a Raspberry Pi (3 by default, 1 with `board-rpi1`) at EL1 and
//! brings up the minimum needed for a periodic interrupt and a pixel
//! buffer.
//!
//! # Architecture
//!
//! The kernel is organized into the following modules:
//! - `boot`: Boot sequence and the kernel-wide singletons
//! - `arch`: AArch64 boot stub, vector table, system registers
//! - `interrupts`: Exception classification, interrupt controller, IRQ routing
//! - `mailbox`: VideoCore mailbox, bus address translation, framebuffer
//! - `timer`: System timer compare channel 1
//! - `mmio`: Register access layer shared by every driver
//! - `board`, `config`: Register map and compile-time configuration
//! - `components`, `debug`: Console, `kprintln!` and the `log` backend
//!
//! Drivers are generic over [`mmio::Mmio`], so everything except the
//! assembly builds and is unit tested on the host against a simulated
//! board.

#![cfg_attr(not(test), no_std)]

pub mod arch;
pub mod board;
pub mod boot;
pub mod components;
pub mod config;
pub mod debug;
pub mod interrupts;
pub mod mailbox;
pub mod mmio;
pub mod timer;

#[cfg(test)]
pub(crate) mod sim;

pub use interrupts::{ExceptionOutcome, ExceptionVector, IrqLines, IrqOutcome, TrapReport};
pub use mailbox::{FramebufferError, FramebufferFailure, FramebufferRequest, MailboxError};

/// Panic handler - print and halt
#[cfg(all(target_os = "none", not(test)))]
#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    crate::arch::aarch64::disable_irq();
    crate::kprintln!();
    crate::kprintln!("KERNEL PANIC: {}", info);
    crate::arch::aarch64::halt()
}
