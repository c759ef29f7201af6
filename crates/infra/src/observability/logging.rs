//! Tracing subscriber setup

use authgate_domain::constants::DEFAULT_LOG_FILTER;
use authgate_domain::LoggingConfig;
use tracing_subscriber::EnvFilter;

/// Resolve the active filter: `RUST_LOG` wins, then the configured
/// directive, then the built-in default.
pub fn build_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.filter))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
}

/// Install the global `fmt` subscriber.
///
/// Returns `false` if a global subscriber was already installed, in which
/// case the existing one is kept.
pub fn init_tracing(config: &LoggingConfig) -> bool {
    let filter = build_filter(config);

    let installed = if config.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .try_init()
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).with_target(true).try_init()
    };

    match installed {
        Ok(()) => {
            tracing::debug!(filter = %config.filter, json = config.json, "tracing initialised");
            true
        }
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_initialisation_keeps_the_first() {
        let config = LoggingConfig { filter: "warn".into(), json: false };
        init_tracing(&config);
        assert!(!init_tracing(&LoggingConfig { filter: "debug".into(), json: true }));
    }

    #[test]
    fn configured_directive_is_used() {
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        let config = LoggingConfig { filter: "authgate_core=debug".into(), json: false };
        let filter = build_filter(&config);
        assert!(filter.to_string().contains("authgate_core=debug"));
    }
}
