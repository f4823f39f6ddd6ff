//! Bentley - leveled terminal logging for the notifind workspace
//!
//! ## Features
//!
//! - Standard logging levels (info, warn, error, success, verbose)
//! - Multi-line message support with consistent prefixes
//! - Format-args macros (`bentley::info!("indexed {count} documents")`)
//! - `tracing` subscriber setup shared by every binary
//! - All output to stderr so stdout stays machine-readable
//!
//! Verbose output is suppressed until [`init`] is called with `verbose = true`.

use colored::*;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

static VERBOSE: AtomicBool = AtomicBool::new(false);

/// Targets that drown out our own output at info level.
const QUIET_TARGETS: &str = "lance=error,lance_datafusion=error,lance_index=error,datafusion=error";

/// Initialize logging: verbosity gate plus a `tracing` subscriber.
///
/// `RUST_LOG` wins over the built-in filter when set. Calling this twice is harmless.
pub fn init(verbose: bool) {
  VERBOSE.store(verbose, Ordering::Relaxed);

  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(verbose));
  let _ = tracing_subscriber::registry()
    .with(fmt::layer().with_writer(std::io::stderr))
    .with(filter)
    .try_init();
}

fn default_filter(verbose: bool) -> EnvFilter {
  if verbose {
    EnvFilter::new(format!("info,notifind=debug,{QUIET_TARGETS}"))
  } else {
    EnvFilter::new(format!("notifind=info,{QUIET_TARGETS},warn"))
  }
}

/// Whether verbose output is enabled
pub fn is_verbose() -> bool {
  VERBOSE.load(Ordering::Relaxed)
}

/// Core logging function that handles the actual output
pub fn log(message: &str) {
  for line in message.lines() {
    eprintln!("{line}");
  }
}

/// Format a colored prefix for log messages
fn format_prefix(color: Color, prefix: &str) -> String {
  format!("[{}]{:<width$}", prefix.color(color).bold(), "", width = 7 - prefix.len() - 2)
}

fn log_with_prefix(color: Color, prefix: &str, message: &str) {
  let prefix = format_prefix(color, prefix);
  for line in message.lines() {
    log(&format!("{prefix} {line}"));
  }
}

/// Create a banner line of the specified length and character
pub fn banner_line(length: usize, char: char) -> String {
  char.to_string().repeat(length)
}

/// Detail output, only shown in verbose mode
pub fn verbose(message: &str) {
  if is_verbose() {
    log_with_prefix(Color::Cyan, "verb", message);
  }
}

/// Info level logging - general information
pub fn info(message: &str) {
  log_with_prefix(Color::Blue, "info", message);
}

/// Warning level logging - something needs attention
pub fn warn(message: &str) {
  log_with_prefix(Color::Yellow, "warn", message);
}

/// Error level logging - something went wrong
pub fn error(message: &str) {
  log_with_prefix(Color::Red, "error", message);
}

/// Success level logging - something completed successfully
pub fn success(message: &str) {
  log_with_prefix(Color::Green, "sccs", message);
}

/// Theatrical announcement - a message framed by banner lines
pub fn announce(message: &str) {
  let banner = banner_line(50, '-');
  log(&banner.blue().bold().to_string());
  log(&message.blue().bold().to_string());
  log(&banner.blue().bold().to_string());
}

/// Macros accept either a single `&str` expression or format arguments.
/// They expand with LCOV_EXCL_LINE at call sites.
#[macro_export]
macro_rules! info {
  ($msg:literal) => {
    $crate::info(&format!($msg)) // LCOV_EXCL_LINE
  };
  ($fmt:literal, $($arg:tt)*) => {
    $crate::info(&format!($fmt, $($arg)*)) // LCOV_EXCL_LINE
  };
  ($msg:expr) => {
    $crate::info($msg) // LCOV_EXCL_LINE
  };
}

#[macro_export]
macro_rules! warn {
  ($msg:literal) => {
    $crate::warn(&format!($msg)) // LCOV_EXCL_LINE
  };
  ($fmt:literal, $($arg:tt)*) => {
    $crate::warn(&format!($fmt, $($arg)*)) // LCOV_EXCL_LINE
  };
  ($msg:expr) => {
    $crate::warn($msg) // LCOV_EXCL_LINE
  };
}

#[macro_export]
macro_rules! error {
  ($msg:literal) => {
    $crate::error(&format!($msg)) // LCOV_EXCL_LINE
  };
  ($fmt:literal, $($arg:tt)*) => {
    $crate::error(&format!($fmt, $($arg)*)) // LCOV_EXCL_LINE
  };
  ($msg:expr) => {
    $crate::error($msg) // LCOV_EXCL_LINE
  };
}

#[macro_export]
macro_rules! verbose {
  ($msg:literal) => {
    $crate::verbose(&format!($msg)) // LCOV_EXCL_LINE
  };
  ($fmt:literal, $($arg:tt)*) => {
    $crate::verbose(&format!($fmt, $($arg)*)) // LCOV_EXCL_LINE
  };
  ($msg:expr) => {
    $crate::verbose($msg) // LCOV_EXCL_LINE
  };
}

#[macro_export]
macro_rules! success {
  ($msg:literal) => {
    $crate::success(&format!($msg)) // LCOV_EXCL_LINE
  };
  ($fmt:literal, $($arg:tt)*) => {
    $crate::success(&format!($fmt, $($arg)*)) // LCOV_EXCL_LINE
  };
  ($msg:expr) => {
    $crate::success($msg) // LCOV_EXCL_LINE
  };
}

#[macro_export]
macro_rules! announce {
  ($msg:literal) => {
    $crate::announce(&format!($msg)) // LCOV_EXCL_LINE
  };
  ($fmt:literal, $($arg:tt)*) => {
    $crate::announce(&format!($fmt, $($arg)*)) // LCOV_EXCL_LINE
  };
  ($msg:expr) => {
    $crate::announce($msg) // LCOV_EXCL_LINE
  };
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_banner_line() {
    assert_eq!(banner_line(5, '='), "=====");
    assert_eq!(banner_line(0, '-'), "");
  }

  #[test]
  fn test_prefix_pads_to_fixed_width() {
    colored::control::set_override(false);
    assert_eq!(format_prefix(Color::Blue, "info"), "[info] ");
    assert_eq!(format_prefix(Color::Red, "error"), "[error]");
    colored::control::unset_override();
  }

  #[test]
  fn test_macros_accept_all_forms() {
    let count = 3;
    info!("plain literal");
    info!("inline {count}");
    warn!("positional {}", count);
    let owned = String::from("owned message");
    error!(&owned);
    success!("done");
    verbose!("hidden unless verbose");
  }

  #[test]
  fn test_init_is_idempotent() {
    init(false);
    init(true);
    assert!(is_verbose());
    init(false);
    assert!(!is_verbose());
  }
}
