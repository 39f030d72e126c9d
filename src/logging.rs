//! Tracing setup helper
//!
//! The driver logs through `tracing` (frame faults and adaptor errors at
//! warn, lifecycle at debug/info). Host applications with their own
//! subscriber can skip this and filter the `usbcan_link` target themselves.

/// Initialize a compact tracing subscriber for driver output
///
/// Call early in main() before any logging occurs.
/// Set `verbose` to true for debug-level output.
pub fn init_tracing(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let level = if verbose { "debug" } else { "warn" };

    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_file(false)
                .compact(),
        )
        .with(tracing_subscriber::EnvFilter::new(level))
        .try_init();
}
