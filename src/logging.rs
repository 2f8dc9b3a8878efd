//! Process-wide tracing setup for the binary.
//!
//! The filter is read from `RUST_LOG` and defaults to `info`. Events are
//! written to stderr so that the summary printed on stdout stays clean.

use std::io::IsTerminal;
use std::sync::OnceLock;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};


static INITIALISED: OnceLock<bool> = OnceLock::new();

/// Installs the global subscriber once. Returns `false` if another subscriber
/// was already installed by someone else.
pub fn init_tracing() -> bool {
    *INITIALISED.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_ansi(std::io::stderr().is_terminal())
            .with_writer(std::io::stderr);
        Registry::default()
            .with(filter)
            .with(fmt_layer)
            .try_init()
            .is_ok()
    })
}
