//! Global subscriber initialisation. Kept in its own test binary because the
//! subscriber is process-wide.

use tide_script::{init_from_config, LoggingConfig};

#[test]
fn init_twice_is_harmless() {
    let warn_only = LoggingConfig {
        json: false,
        level: "warn".into(),
    };
    init_from_config(&warn_only);
    init_from_config(&LoggingConfig::default().with_overrides(true, true));
    tracing::info!("still logging");
}
