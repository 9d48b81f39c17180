//! Log output for the `lapwatch` binary.
//!
//! Logs go to stderr so they never interleave with the readout on stdout.
//! `LAPWATCH_LOG` takes an `EnvFilter` directive such as `debug` or
//! `lapwatch=trace`; the default is `info`.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub const ENV_LOG: &str = "LAPWATCH_LOG";

pub fn init() {
    let filter = EnvFilter::try_from_env(ENV_LOG).unwrap_or_else(|_| EnvFilter::new("info"));

    // A second call (e.g. from tests) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init();
}
