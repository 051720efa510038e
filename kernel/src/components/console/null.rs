//! Null console component (no output)
//!
//! No-op console for production builds where debug output is not desired.

use super::Console;

/// Null console configuration (empty - no configuration needed)
#[derive(Clone, Copy)]
pub struct NullConfig;

/// Null console component (no output, no input)
pub struct NullConsole;

impl NullConsole {
    /// Create a new null console
    pub const fn new(_config: NullConfig) -> Self {
        Self
    }

    /// Initialize null console (no-op)
    pub fn init(&self) {}
}

impl Console for NullConsole {
    #[inline(always)]
    fn putc(&self, _c: u8) {}

    #[inline(always)]
    fn puts(&self, _s: &str) {}

    #[inline(always)]
    fn try_getc(&self) -> Option<u8> {
        None
    }
}
