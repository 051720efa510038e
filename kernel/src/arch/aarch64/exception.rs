//! ARM64 Exception Vector Table
//!
//! The vector table contains 16 entries (4 exception types × 4 sources),
//! each 128 bytes apart, the whole table 2KB aligned. Every slot saves the
//! general purpose registers, puts its index in x0 and branches to a shared
//! tail. The tail saves q0-q31 with FPCR/FPSR (FP/SIMD is enabled at EL1 and
//! compiled Rust uses it), loads `ESR_EL1, ELR_EL1, FAR_EL1` into x1-x3 and
//! calls [`exception_entry`]. Whether an entry is fatal or
//! dispatches is decided in Rust by [`crate::interrupts::VECTOR_TABLE`];
//! the assembly is identical for all 16.
//!
//! # Vector Table Layout
//! ```text
//! 0x000: EL1t Synchronous    0x200: EL1h Synchronous
//! 0x080: EL1t IRQ            0x280: EL1h IRQ          <- timer path
//! 0x100: EL1t FIQ            0x300: EL1h FIQ
//! 0x180: EL1t SError         0x380: EL1h SError
//! 0x400: EL0_64 Synchronous  0x600: EL0_32 Synchronous
//! 0x480: EL0_64 IRQ          0x680: EL0_32 IRQ
//! 0x500: EL0_64 FIQ          0x700: EL0_32 FIQ
//! 0x580: EL0_64 SError       0x780: EL0_32 SError
//! ```

use core::arch::global_asm;

use crate::interrupts::{ExceptionOutcome, ExceptionVector, Syndrome};
use crate::kprintln;

global_asm!(
    r#"
.macro kernel_entry
    sub sp, sp, #256
    stp x0, x1, [sp, #16 * 0]
    stp x2, x3, [sp, #16 * 1]
    stp x4, x5, [sp, #16 * 2]
    stp x6, x7, [sp, #16 * 3]
    stp x8, x9, [sp, #16 * 4]
    stp x10, x11, [sp, #16 * 5]
    stp x12, x13, [sp, #16 * 6]
    stp x14, x15, [sp, #16 * 7]
    stp x16, x17, [sp, #16 * 8]
    stp x18, x19, [sp, #16 * 9]
    stp x20, x21, [sp, #16 * 10]
    stp x22, x23, [sp, #16 * 11]
    stp x24, x25, [sp, #16 * 12]
    stp x26, x27, [sp, #16 * 13]
    stp x28, x29, [sp, #16 * 14]
    str x30, [sp, #16 * 15]
.endm

.macro kernel_exit
    ldp x0, x1, [sp, #16 * 0]
    ldp x2, x3, [sp, #16 * 1]
    ldp x4, x5, [sp, #16 * 2]
    ldp x6, x7, [sp, #16 * 3]
    ldp x8, x9, [sp, #16 * 4]
    ldp x10, x11, [sp, #16 * 5]
    ldp x12, x13, [sp, #16 * 6]
    ldp x14, x15, [sp, #16 * 7]
    ldp x16, x17, [sp, #16 * 8]
    ldp x18, x19, [sp, #16 * 9]
    ldp x20, x21, [sp, #16 * 10]
    ldp x22, x23, [sp, #16 * 11]
    ldp x24, x25, [sp, #16 * 12]
    ldp x26, x27, [sp, #16 * 13]
    ldp x28, x29, [sp, #16 * 14]
    ldr x30, [sp, #16 * 15]
    add sp, sp, #256
    eret
.endm

// [sp]: FPCR, FPSR; [sp + 16]: q0-q31
.macro fp_save
    sub sp, sp, #528
    stp q0, q1, [sp, #16 + 32 * 0]
    stp q2, q3, [sp, #16 + 32 * 1]
    stp q4, q5, [sp, #16 + 32 * 2]
    stp q6, q7, [sp, #16 + 32 * 3]
    stp q8, q9, [sp, #16 + 32 * 4]
    stp q10, q11, [sp, #16 + 32 * 5]
    stp q12, q13, [sp, #16 + 32 * 6]
    stp q14, q15, [sp, #16 + 32 * 7]
    stp q16, q17, [sp, #16 + 32 * 8]
    stp q18, q19, [sp, #16 + 32 * 9]
    stp q20, q21, [sp, #16 + 32 * 10]
    stp q22, q23, [sp, #16 + 32 * 11]
    stp q24, q25, [sp, #16 + 32 * 12]
    stp q26, q27, [sp, #16 + 32 * 13]
    stp q28, q29, [sp, #16 + 32 * 14]
    stp q30, q31, [sp, #16 + 32 * 15]
    mrs x9, fpcr
    mrs x10, fpsr
    stp x9, x10, [sp]
.endm

.macro fp_restore
    ldp x9, x10, [sp]
    msr fpcr, x9
    msr fpsr, x10
    ldp q0, q1, [sp, #16 + 32 * 0]
    ldp q2, q3, [sp, #16 + 32 * 1]
    ldp q4, q5, [sp, #16 + 32 * 2]
    ldp q6, q7, [sp, #16 + 32 * 3]
    ldp q8, q9, [sp, #16 + 32 * 4]
    ldp q10, q11, [sp, #16 + 32 * 5]
    ldp q12, q13, [sp, #16 + 32 * 6]
    ldp q14, q15, [sp, #16 + 32 * 7]
    ldp q16, q17, [sp, #16 + 32 * 8]
    ldp q18, q19, [sp, #16 + 32 * 9]
    ldp q20, q21, [sp, #16 + 32 * 10]
    ldp q22, q23, [sp, #16 + 32 * 11]
    ldp q24, q25, [sp, #16 + 32 * 12]
    ldp q26, q27, [sp, #16 + 32 * 13]
    ldp q28, q29, [sp, #16 + 32 * 14]
    ldp q30, q31, [sp, #16 + 32 * 15]
    add sp, sp, #528
.endm

.macro vector_slot index
    .balign 0x80
    kernel_entry
    mov x0, #\index
    b exception_common
.endm

.section .text.exception_vectors, "ax"
.balign 0x800
.global exception_vector_table
exception_vector_table:
    vector_slot 0
    vector_slot 1
    vector_slot 2
    vector_slot 3
    vector_slot 4
    vector_slot 5
    vector_slot 6
    vector_slot 7
    vector_slot 8
    vector_slot 9
    vector_slot 10
    vector_slot 11
    vector_slot 12
    vector_slot 13
    vector_slot 14
    vector_slot 15

exception_common:
    fp_save
    mrs x1, esr_el1
    mrs x2, elr_el1
    mrs x3, far_el1
    bl exception_entry
    fp_restore
    kernel_exit
.text
"#
);

/// Common Rust entry for all 16 vector slots
///
/// Returns only when the entry resumes (the IRQ path); fatal entries print
/// their report and halt.
#[no_mangle]
extern "C" fn exception_entry(index: u64, esr: u64, elr: u64, far: u64) {
    let syndrome = Syndrome { esr, elr, far };

    let Some(vector) = ExceptionVector::from_index(index as usize) else {
        kprintln!("[exception] bad vector index {}", index);
        crate::arch::aarch64::halt();
    };

    match crate::boot::dispatch_exception(vector, syndrome) {
        ExceptionOutcome::Resumed(_) => {}
        ExceptionOutcome::Fatal(report) => {
            kprintln!("{}", report);
            crate::arch::aarch64::halt();
        }
    }
}

/// Install exception vector table
///
/// Sets VBAR_EL1 to point to the vector table. Must run before IRQs are
/// unmasked.
pub fn init() {
    use crate::arch::aarch64::registers::VBAR_EL1;

    extern "C" {
        static exception_vector_table: u8;
    }

    let vector_table_addr = unsafe { core::ptr::addr_of!(exception_vector_table) as u64 };

    // Verify alignment (must be 2KB aligned)
    if vector_table_addr & 0x7FF != 0 {
        panic!("Exception vector table not 2KB aligned!");
    }

    unsafe {
        VBAR_EL1::write(vector_table_addr);
    }

    log::debug!(target: "exception", "vector table at {:#x}", VBAR_EL1::read());
}
