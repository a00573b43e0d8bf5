//! Logging and tracing configuration
//!
//! Logs go to stderr so stdout stays free for event output when running
//! with `--print-events`.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter when `RUST_LOG` is unset: INFO for this crate, WARN for dependencies
const DEFAULT_FILTER: &str = "gatling_service=info,warn";

/// Initialize tracing
///
/// Logs are controlled by the `RUST_LOG` environment variable.
pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .init();
}
