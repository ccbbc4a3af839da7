//! Logger bootstrap for hosts embedding this library.
//!
//! The library itself only emits records via the [`log`] facade, so without
//! a call to [`init_logger()`] they go wherever the host's own [`log`]
//! implementation sends them.

use slog::{o, Drain as _};
use slog_scope::GlobalLoggerGuard;

/// Initializes a global [`slog`] logger writing to the terminal and routes
/// all the [`log`] facade records into it.
///
/// Filtering is configured with the `RUST_LOG` environment variable, as with
/// [`slog_envlogger`]. The returned guard must be held for as long as the
/// logger is in use.
///
/// # Panics
///
/// If [`slog_stdlog`] fails to [initialize](slog_stdlog::init), which happens
/// if another [`log`] implementation has already been installed.
pub fn init_logger() -> GlobalLoggerGuard {
    let decorator = slog_term::TermDecorator::new().build();
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let drain = slog_envlogger::new(drain).fuse();
    let drain = slog_async::Async::new(drain).build().fuse();
    let logger = slog::Logger::root(drain, o!("lib" => "calls-rtc"));
    let scope_guard = slog_scope::set_global_logger(logger);
    slog_stdlog::init().unwrap();

    scope_guard
}
