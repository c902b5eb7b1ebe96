/*!
Logging setup for the terminal front end.

Log lines go to stderr so they never interleave with the command output on
stdout. With the `profiling` feature, `profiling` scopes are emitted as tracing
spans and their timings are logged when each span closes.
*/

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::{self, format::FmtSpan};
use tracing_subscriber::prelude::*;

/// Filter used when `RUST_LOG` is unset
pub fn default_filter() -> &'static str {
    if cfg!(debug_assertions) {
        "debug,hyper_util=info,reqwest::connect=info"
    } else {
        "info"
    }
}

/// Install the global subscriber
pub fn setup_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter()));

    let span_events = if cfg!(feature = "profiling") {
        FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };
    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_span_events(span_events)
        .with_filter(filter);

    tracing_subscriber::registry().with(fmt_layer).init();

    if cfg!(feature = "profiling") {
        tracing::info!("Logging initialized with profiling spans");
    } else {
        tracing::info!("Logging initialized (profiling disabled in this build)");
    }
}
