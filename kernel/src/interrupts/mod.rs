//! Exception classification and IRQ dispatch
//!
//! The hardware vector table (see `arch::aarch64::exception`) funnels all 16
//! entries into one Rust function. What happens next is decided here, as
//! plain data so it can be exercised on the host:
//!
//! - [`VECTOR_TABLE`] maps each entry to a label and a [`Disposition`].
//!   Every entry except the EL1h IRQ entry is fatal.
//! - A fatal entry becomes a [`TrapReport`] (label, ESR, ELR, FAR and the
//!   decoded exception class) that the caller prints before halting.
//! - The IRQ entry reads IRQ_PENDING_1 and hands the value to the
//!   [`IrqRouter`]; an unrecognized value is logged and execution resumes.

pub mod controller;
pub mod router;

use core::fmt;

use crate::mmio::Mmio;

pub use controller::{InterruptController, IrqLines};
pub use router::{IrqHandler, IrqOutcome, IrqRoute, IrqRouter};

/// The 16 vector table entries, in table order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
pub enum ExceptionVector {
    SyncEl1t = 0,
    IrqEl1t,
    FiqEl1t,
    ErrorEl1t,
    SyncEl1h,
    IrqEl1h,
    FiqEl1h,
    ErrorEl1h,
    SyncEl0A64,
    IrqEl0A64,
    FiqEl0A64,
    ErrorEl0A64,
    SyncEl0A32,
    IrqEl0A32,
    FiqEl0A32,
    ErrorEl0A32,
}

impl ExceptionVector {
    pub const ALL: [ExceptionVector; 16] = [
        Self::SyncEl1t,
        Self::IrqEl1t,
        Self::FiqEl1t,
        Self::ErrorEl1t,
        Self::SyncEl1h,
        Self::IrqEl1h,
        Self::FiqEl1h,
        Self::ErrorEl1h,
        Self::SyncEl0A64,
        Self::IrqEl0A64,
        Self::FiqEl0A64,
        Self::ErrorEl0A64,
        Self::SyncEl0A32,
        Self::IrqEl0A32,
        Self::FiqEl0A32,
        Self::ErrorEl0A32,
    ];

    /// Entry for a table slot index (`offset / 0x80`)
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub const fn index(self) -> usize {
        self as usize
    }

    pub fn label(self) -> &'static str {
        VECTOR_TABLE[self.index()].label
    }

    pub fn disposition(self) -> Disposition {
        VECTOR_TABLE[self.index()].disposition
    }
}

/// What to do when an entry is taken
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Report and stop
    Fatal,
    /// Read the pending register and route it
    InterruptDispatch,
}

/// Static description of one vector table entry
#[derive(Debug, Clone, Copy)]
pub struct VectorEntry {
    pub vector: ExceptionVector,
    pub label: &'static str,
    pub disposition: Disposition,
}

const fn fatal(vector: ExceptionVector, label: &'static str) -> VectorEntry {
    VectorEntry {
        vector,
        label,
        disposition: Disposition::Fatal,
    }
}

/// Disposition of every entry, indexed by table slot
pub static VECTOR_TABLE: [VectorEntry; 16] = [
    fatal(ExceptionVector::SyncEl1t, "SYNC_INVALID_EL1t"),
    fatal(ExceptionVector::IrqEl1t, "IRQ_INVALID_EL1t"),
    fatal(ExceptionVector::FiqEl1t, "FIQ_INVALID_EL1t"),
    fatal(ExceptionVector::ErrorEl1t, "ERROR_INVALID_EL1t"),
    fatal(ExceptionVector::SyncEl1h, "SYNC_INVALID_EL1h"),
    VectorEntry {
        vector: ExceptionVector::IrqEl1h,
        label: "IRQ_EL1h",
        disposition: Disposition::InterruptDispatch,
    },
    fatal(ExceptionVector::FiqEl1h, "FIQ_INVALID_EL1h"),
    fatal(ExceptionVector::ErrorEl1h, "ERROR_INVALID_EL1h"),
    fatal(ExceptionVector::SyncEl0A64, "SYNC_INVALID_EL0_64"),
    fatal(ExceptionVector::IrqEl0A64, "IRQ_INVALID_EL0_64"),
    fatal(ExceptionVector::FiqEl0A64, "FIQ_INVALID_EL0_64"),
    fatal(ExceptionVector::ErrorEl0A64, "ERROR_INVALID_EL0_64"),
    fatal(ExceptionVector::SyncEl0A32, "SYNC_INVALID_EL0_32"),
    fatal(ExceptionVector::IrqEl0A32, "IRQ_INVALID_EL0_32"),
    fatal(ExceptionVector::FiqEl0A32, "FIQ_INVALID_EL0_32"),
    fatal(ExceptionVector::ErrorEl0A32, "ERROR_INVALID_EL0_32"),
];

/// Syndrome registers captured on entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Syndrome {
    /// ESR_EL1
    pub esr: u64,
    /// ELR_EL1 (faulting or return address)
    pub elr: u64,
    /// FAR_EL1
    pub far: u64,
}

impl Syndrome {
    /// Exception Class, ESR bits 31:26
    pub const fn exception_class(&self) -> u8 {
        ((self.esr >> 26) & 0x3F) as u8
    }

    pub fn class_name(&self) -> &'static str {
        match self.exception_class() {
            0x00 => "unknown reason",
            0x01 => "trapped WFI/WFE",
            0x07 => "SIMD/FP access",
            0x0E => "illegal execution state",
            0x15 => "SVC from AArch64",
            0x18 => "trapped MSR/MRS",
            0x20 => "instruction abort from lower EL",
            0x21 => "instruction abort from same EL",
            0x22 => "PC alignment fault",
            0x24 => "data abort from lower EL",
            0x25 => "data abort from same EL",
            0x26 => "SP alignment fault",
            0x2F => "SError",
            0x3C => "BRK instruction",
            _ => "other",
        }
    }
}

/// Diagnostic for a fatal entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrapReport {
    pub vector: ExceptionVector,
    pub syndrome: Syndrome,
}

impl fmt::Display for TrapReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, ESR: {:#x}, address: {:#x}, FAR: {:#x} (EC {:#04x}: {})",
            self.vector.label(),
            self.syndrome.esr,
            self.syndrome.elr,
            self.syndrome.far,
            self.syndrome.exception_class(),
            self.syndrome.class_name()
        )
    }
}

/// What the entry code must do after dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExceptionOutcome {
    /// Print the report and halt
    Fatal(TrapReport),
    /// Return from the exception
    Resumed(IrqOutcome),
}

impl ExceptionOutcome {
    /// Outcome when no dispatcher is installed: every entry is fatal
    pub fn unhandled(vector: ExceptionVector, syndrome: Syndrome) -> Self {
        ExceptionOutcome::Fatal(TrapReport { vector, syndrome })
    }
}

/// Ties the pending register to the route table
pub struct ExceptionDispatcher<'a, B: Mmio, const N: usize> {
    controller: InterruptController<B>,
    router: IrqRouter<'a, N>,
}

impl<'a, B: Mmio, const N: usize> ExceptionDispatcher<'a, B, N> {
    pub const fn new(controller: InterruptController<B>, router: IrqRouter<'a, N>) -> Self {
        Self { controller, router }
    }

    pub fn controller(&self) -> &InterruptController<B> {
        &self.controller
    }

    pub fn router(&self) -> &IrqRouter<'a, N> {
        &self.router
    }

    /// Decide and, for the IRQ entry, run the matching handler
    pub fn dispatch(&self, vector: ExceptionVector, syndrome: Syndrome) -> ExceptionOutcome {
        match vector.disposition() {
            Disposition::Fatal => ExceptionOutcome::Fatal(TrapReport { vector, syndrome }),
            Disposition::InterruptDispatch => {
                let outcome = self.router.route(self.controller.pending());
                if let IrqOutcome::Unrecognized(pending) = outcome {
                    log::warn!(target: "irq", "unrecognized pending irq: {:#x}", pending);
                }
                ExceptionOutcome::Resumed(outcome)
            }
        }
    }
}
