//! Boot stub
//!
//! The firmware starts every core at `_start`, in EL2 with the stock
//! armstub. Core 0 resets SCTLR_EL1 (MMU and caches off), drops from EL2 to
//! EL1h if needed, gets a stack below the image, clears `.bss` and enters
//! [`crate::boot::kernel_main`]. The other cores park, and so does core 0
//! if it arrives in EL3 (`kernel_old=1` without a stub): there is no EL3
//! exit path here.

use core::arch::global_asm;

global_asm!(
    ".section .text._start",
    ".global _start",
    ".type _start, @function",
    "_start:",
    "    mrs x0, mpidr_el1",
    "    and x0, x0, #0xFF",
    "    cbnz x0, 9f",
    "    ldr x0, =0x30D00800",         // SCTLR_EL1: RES1 bits, MMU/caches off
    "    msr sctlr_el1, x0",
    // EL2 -> EL1h if needed
    "    mrs x0, CurrentEL",
    "    lsr x0, x0, #2",
    "    cmp x0, #3",
    "    b.eq 9f",
    "    cmp x0, #2",
    "    b.ne 1f",
    "    mov x0, #(1 << 31)",         // HCR_EL2.RW: EL1 is AArch64
    "    msr hcr_el2, x0",
    "    mov x0, #0x3c5",              // EL1h, DAIF masked
    "    msr spsr_el2, x0",
    "    adr x0, 1f",
    "    msr elr_el2, x0",
    "    eret",
    "1:",
    "    mov x0, #(3 << 20)",          // CPACR_EL1.FPEN: no FP/SIMD traps
    "    msr cpacr_el1, x0",
    "    isb",
    "    ldr x0, =_start",             // stack grows down from the image base
    "    mov sp, x0",
    "    ldr x0, =__bss_start",
    "    ldr x1, =__bss_end",
    "2:",
    "    cmp x0, x1",
    "    b.ge 3f",
    "    str xzr, [x0], #8",
    "    b 2b",
    "3:",
    "    bl {kernel_main}",
    "9:",
    "    wfe",
    "    b 9b",
    kernel_main = sym crate::boot::kernel_main,
);
