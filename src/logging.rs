//! Tracing subscriber setup for the command line.

use std::sync::Once;

use tracing_subscriber::EnvFilter;

use crate::config::LoggingSettings;

static INIT: Once = Once::new();

/// Install the global subscriber.
///
/// `STRATA_LOG` overrides the configured filter, e.g.
/// `STRATA_LOG=strata::layout=debug,strata=info`. Logs go to stderr so that
/// hierarchies written to stdout stay machine readable.
///
/// Calling this more than once has no effect.
pub fn init_tracing(settings: &LoggingSettings) {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env("STRATA_LOG")
            .or_else(|_| EnvFilter::try_new(&settings.filter))
            .unwrap_or_else(|_| EnvFilter::new("strata=info"));

        let builder = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(std::io::stderr);

        if settings.json {
            builder.json().init();
        } else {
            builder.init();
        }
    });
}
