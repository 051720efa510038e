//! Register access layer
//!
//! Raw word/byte access to physical addresses plus a fixed busy delay.
//! Every driver in the kernel is generic over [`Mmio`] so it can be pointed
//! at the real peripheral window or at a simulated board in unit tests.

use core::ptr::{read_volatile, write_volatile};

/// Volatile access to memory-mapped registers
///
/// Methods take `&self`: a register window is shared by every driver that
/// touches it, and a read can have side effects (the mailbox read register
/// pops a FIFO) that no Rust borrow can describe anyway.
pub trait Mmio {
    /// Read a 32-bit register
    fn read32(&self, addr: usize) -> u32;

    /// Write a 32-bit register
    fn write32(&self, addr: usize, value: u32);

    /// Read an 8-bit register
    fn read8(&self, addr: usize) -> u8;

    /// Write an 8-bit register
    fn write8(&self, addr: usize, value: u8);

    /// Full data synchronisation barrier
    ///
    /// Required around accesses whose payload lives in memory shared with
    /// another bus master (the mailbox).
    fn barrier(&self) {}
}

impl<T: Mmio + ?Sized> Mmio for &T {
    #[inline(always)]
    fn read32(&self, addr: usize) -> u32 {
        (**self).read32(addr)
    }

    #[inline(always)]
    fn write32(&self, addr: usize, value: u32) {
        (**self).write32(addr, value)
    }

    #[inline(always)]
    fn read8(&self, addr: usize) -> u8 {
        (**self).read8(addr)
    }

    #[inline(always)]
    fn write8(&self, addr: usize, value: u8) {
        (**self).write8(addr, value)
    }

    #[inline(always)]
    fn barrier(&self) {
        (**self).barrier()
    }
}

/// Direct access to the physical peripheral window
///
/// # Safety
/// Only meaningful on the target with the MMU off (or identity-mapped
/// device memory). Constructing it is safe; every access dereferences the
/// given address.
#[derive(Debug, Clone, Copy, Default)]
pub struct PhysicalMmio;

impl Mmio for PhysicalMmio {
    #[inline(always)]
    fn read32(&self, addr: usize) -> u32 {
        unsafe { read_volatile(addr as *const u32) }
    }

    #[inline(always)]
    fn write32(&self, addr: usize, value: u32) {
        unsafe { write_volatile(addr as *mut u32, value) }
    }

    #[inline(always)]
    fn read8(&self, addr: usize) -> u8 {
        unsafe { read_volatile(addr as *const u8) }
    }

    #[inline(always)]
    fn write8(&self, addr: usize, value: u8) {
        unsafe { write_volatile(addr as *mut u8, value) }
    }

    #[inline(always)]
    fn barrier(&self) {
        crate::arch::aarch64::dsb_sy();
    }
}

/// Spin for a fixed number of iterations
///
/// Counts loop iterations, not time.
#[inline(never)]
pub fn delay(cycles: u64) {
    for _ in 0..cycles {
        core::hint::spin_loop();
    }
}
