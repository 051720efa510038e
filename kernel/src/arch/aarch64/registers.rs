//! ARM64 system register access

use core::arch::asm;

/// Read current exception level
#[inline(always)]
pub fn current_el() -> u8 {
    let val: u64;
    unsafe {
        asm!("mrs {}, CurrentEL", out(reg) val);
    }
    ((val >> 2) & 0x3) as u8
}

/// Vector Base Address Register (EL1)
#[allow(non_camel_case_types)]
pub struct VBAR_EL1;
impl VBAR_EL1 {
    #[inline(always)]
    pub fn read() -> u64 {
        let val: u64;
        unsafe {
            asm!("mrs {}, vbar_el1", out(reg) val);
        }
        val
    }

    /// Install a new vector base
    ///
    /// # Safety
    /// `val` must be the address of a 2KB aligned vector table that stays
    /// valid for the lifetime of the kernel.
    #[inline(always)]
    pub unsafe fn write(val: u64) {
        asm!("msr vbar_el1, {}", "isb", in(reg) val);
    }
}
