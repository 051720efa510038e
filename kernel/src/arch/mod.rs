//! Architecture-specific code
//!
//! This module contains all architecture-dependent implementations.
//! Only ARM64 (AArch64) is supported. Instruction-level helpers fall back
//! to portable equivalents on the host so the drivers can be unit tested.

pub mod aarch64;
