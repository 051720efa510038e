//! Kernel image
//!
//! Everything lives in the library: `_start`, the vector table and the
//! panic handler. This crate only gives the linker something to link.

#![cfg_attr(target_os = "none", no_std, no_main)]

use pi_bringup as _;

#[cfg(not(target_os = "none"))]
fn main() {
    eprintln!("pi-bringup is a bare-metal image; build it for aarch64-unknown-none");
}
