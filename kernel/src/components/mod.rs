//! Kernel components
//!
//! Minimal components built into the kernel for bring-up diagnostics.
//! These are NOT full-featured drivers.
//!
//! # Component Composition (Compile-Time)
//!
//! Components are composed at compile-time via cargo features:
//!
//! ```text
//! #[cfg(not(feature = "console-null"))]
//! static CONSOLE: MiniUartConsole<PhysicalMmio> = MiniUartConsole::new(
//!     PhysicalMmio,
//!     MiniUartConfig { mmio_base: AUX_BASE, baud_divisor: 270 },
//! );
//! ```

pub mod console;
