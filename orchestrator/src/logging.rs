//! Tracing setup for the orchestrator binary.
//!
//! # Separation of Concerns
//!
//! - **Tracing (this module)**: progress and diagnostics via `RUST_LOG`,
//!   output to stderr. Not persisted.
//!
//! - **Artifacts (`io/artifacts`)**: deliverables in `out/` and transcripts in
//!   `logs/`. Always written, unaffected by `RUST_LOG`.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_FILTER: &str = "orchestrator=info";

/// Initialize the tracing subscriber.
///
/// Reads `RUST_LOG` env var. Defaults to [`DEFAULT_FILTER`] if unset.
/// Output: stderr, compact format.
///
/// # Example
/// ```bash
/// RUST_LOG=orchestrator=debug orchestrator queue
/// ```
pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
