//! Tracing subscriber setup

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

const CRATES: [&str; 5] = [
    "shipmate",
    "shipmate_core",
    "shipmate_host",
    "shipmate_chart",
    "shipmate_pipeline",
];

/// Default filter when `RUST_LOG` is unset
fn default_directives(debug: bool) -> String {
    let level = if debug { "debug" } else { "warn" };
    let mut directives = vec!["warn".to_string()];
    directives.extend(CRATES.iter().map(|c| format!("{}={}", c, level)));
    directives.join(",")
}

/// Install the global subscriber writing to stderr
pub fn init(debug: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(debug)));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(debug),
        )
        .try_init()
        .ok();
}
