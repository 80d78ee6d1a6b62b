//! Tracing subscriber setup
//!
//! `RUST_LOG` takes precedence over the configured level. JSON output is used
//! when requested explicitly or when running in production.

use crate::config::{LogFormat, Settings};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global tracing subscriber
///
/// Calling this twice (e.g. from tests) is harmless: the second install is ignored.
pub fn init_logging(settings: &Settings) {
    let default_directive = format!(
        "songs_api={level},songs_common={level},tower_http=info",
        level = settings.logging.level
    );
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    let registry = tracing_subscriber::registry().with(filter);

    let result = if use_json(settings) {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(false))
            .try_init()
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .try_init()
    };

    if let Err(e) = result {
        tracing::debug!("Tracing subscriber already installed: {}", e);
    }
}

fn use_json(settings: &Settings) -> bool {
    settings.logging.format == LogFormat::Json || settings.is_production()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Environment;

    #[test]
    fn test_production_forces_json() {
        let mut settings = Settings::default();
        assert!(!use_json(&settings));

        settings.environment = Environment::Production;
        assert!(use_json(&settings));
    }

    #[test]
    fn test_init_twice_does_not_panic() {
        let settings = Settings::default();
        init_logging(&settings);
        init_logging(&settings);
    }
}
