//! Tracing initialisation for tide-script hosts.
//!
//! Hosts call [`init_from_config`] once at program start with the `[logging]`
//! section of their [`ScriptConfig`](crate::ScriptConfig). Later calls are
//! ignored since the global subscriber can only be set once per process.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingConfig;

/// Install the global subscriber described by `logging`.
///
/// `RUST_LOG` takes precedence over `logging.level`. Output goes to stderr so
/// stdout stays free for command results; `logging.json` switches to
/// newline-delimited JSON.
pub fn init_from_config(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(logging.tracing_level().as_str()));
    let layer = fmt::layer().with_target(false).with_writer(std::io::stderr);
    let subscriber = tracing_subscriber::registry().with(filter);

    let installed = if logging.json {
        subscriber.with(layer.json()).try_init().is_ok()
    } else {
        subscriber.with(layer).try_init().is_ok()
    };
    if installed {
        tracing::debug!(level = %logging.level, json = logging.json, "tracing initialised");
    }
}
