//! Console component trait
//!
//! Provides a minimal console interface for kernel diagnostics.
//! This is NOT a full UART driver - just enough for `kprintln!`, the
//! logger and the echo loop to work. Console output is never on a control
//! path: nothing in the bring-up sequence waits on it for correctness.

/// Console trait for kernel debug output
///
/// Kernel components must implement this trait to provide debug console
/// functionality.
pub trait Console: Send + Sync {
    /// Write a single character to the console
    ///
    /// This is a blocking operation. The implementation should wait for
    /// the hardware to be ready before writing.
    fn putc(&self, c: u8);

    /// Read a character if one is waiting
    fn try_getc(&self) -> Option<u8>;

    /// Write a string to the console
    ///
    /// Default implementation writes character by character.
    fn puts(&self, s: &str) {
        for byte in s.bytes() {
            if byte == b'\n' {
                self.putc(b'\r'); // CRLF for terminals
            }
            self.putc(byte);
        }
    }

    /// Block until a character arrives
    fn getc(&self) -> u8 {
        loop {
            if let Some(c) = self.try_getc() {
                return c;
            }
            core::hint::spin_loop();
        }
    }
}

// Component implementations
pub mod mini_uart;
pub mod null;
