//! Debug output and logging
//!
//! `kprint!`/`kprintln!` write straight to the configured console. The
//! `log` facade is backed by [`KernelLogger`], which prefixes each record
//! with its level and target. The maximum level is chosen at compile time
//! through the `log-*` features.

use core::fmt;

use log::{LevelFilter, Log, Metadata, Record};

use crate::components::console::Console;

/// Debug writer (uses the configured console)
pub struct DebugWriter;

impl fmt::Write for DebugWriter {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        crate::config::console().puts(s);
        Ok(())
    }
}

/// Print macro for kernel
#[macro_export]
macro_rules! kprint {
    ($($arg:tt)*) => ({
        use core::fmt::Write;
        let _ = write!($crate::debug::DebugWriter, $($arg)*);
    });
}

/// Print with newline macro for kernel
#[macro_export]
macro_rules! kprintln {
    () => ($crate::kprint!("\n"));
    ($($arg:tt)*) => ({
        use core::fmt::Write;
        let _ = writeln!($crate::debug::DebugWriter, $($arg)*);
    });
}

/// `log` backend writing to the kernel console
pub struct KernelLogger;

static LOGGER: KernelLogger = KernelLogger;

impl Log for KernelLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            crate::kprintln!("[{:<5} {}] {}", record.level(), record.target(), record.args());
        }
    }

    fn flush(&self) {}
}

/// Level selected by the `log-*` features (most verbose one wins)
pub const fn max_level() -> LevelFilter {
    if cfg!(feature = "log-trace") {
        LevelFilter::Trace
    } else if cfg!(feature = "log-debug") {
        LevelFilter::Debug
    } else if cfg!(feature = "log-info") {
        LevelFilter::Info
    } else if cfg!(feature = "log-warn") {
        LevelFilter::Warn
    } else if cfg!(feature = "log-error") {
        LevelFilter::Error
    } else {
        LevelFilter::Off
    }
}

/// Install the kernel logger
///
/// Call once, after the console is initialized. A second call is ignored.
pub fn init_logger() {
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(max_level());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_features_log_at_info() {
        // Default feature set enables log-info and nothing more verbose
        if cfg!(feature = "log-info")
            && !cfg!(feature = "log-debug")
            && !cfg!(feature = "log-trace")
        {
            assert_eq!(max_level(), LevelFilter::Info);
        }
    }
}
