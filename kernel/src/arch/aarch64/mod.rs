//! ARM64 (AArch64) architecture-specific code

#[cfg(all(target_arch = "aarch64", target_os = "none"))]
pub mod registers;
#[cfg(all(target_arch = "aarch64", target_os = "none"))]
pub mod exception;
#[cfg(all(target_arch = "aarch64", target_os = "none"))]
pub mod start;

#[cfg(all(target_arch = "aarch64", target_os = "none"))]
use core::arch::asm;

/// Full-system data synchronisation barrier
#[inline(always)]
pub fn dsb_sy() {
    #[cfg(all(target_arch = "aarch64", target_os = "none"))]
    unsafe {
        asm!("dsb sy", options(nostack, preserves_flags));
    }

    #[cfg(not(all(target_arch = "aarch64", target_os = "none")))]
    core::sync::atomic::fence(core::sync::atomic::Ordering::SeqCst);
}

/// Unmask IRQs at the CPU (clear DAIF.I)
///
/// # Safety
/// The exception vector table must be installed and the IRQ dispatcher
/// published before this is called.
#[inline(always)]
pub unsafe fn enable_irq() {
    #[cfg(all(target_arch = "aarch64", target_os = "none"))]
    asm!("msr daifclr, #2", options(nomem, nostack));
}

/// Mask IRQs at the CPU (set DAIF.I)
#[inline(always)]
pub fn disable_irq() {
    #[cfg(all(target_arch = "aarch64", target_os = "none"))]
    unsafe {
        asm!("msr daifset, #2", options(nomem, nostack));
    }
}

/// Stop forward progress
///
/// Used after a fatal trap: there is nothing to recover into.
pub fn halt() -> ! {
    disable_irq();
    loop {
        #[cfg(all(target_arch = "aarch64", target_os = "none"))]
        unsafe {
            asm!("wfe", options(nomem, nostack));
        }

        #[cfg(not(all(target_arch = "aarch64", target_os = "none")))]
        core::hint::spin_loop();
    }
}
