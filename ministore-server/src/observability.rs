use std::env;
use std::io::IsTerminal;

use secrecy::ExposeSecret;
use sentry::integrations::tracing as sentry_tracing;
use tracing::Level;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, Layer, prelude::*};

use crate::config::{Config, LogFormat};

/// Initializes the Sentry client if a DSN is configured.
///
/// This must be called before the async runtime is created. The returned guard flushes pending
/// events when dropped.
pub fn init_sentry(config: &Config) -> Option<sentry::ClientInitGuard> {
    let sentry_config = &config.sentry;
    let dsn = sentry_config.dsn.as_ref()?;

    Some(sentry::init(sentry::ClientOptions {
        dsn: dsn.expose_secret().as_str().parse().ok(),
        release: sentry::release_name!(),
        environment: sentry_config.environment.clone(),
        sample_rate: sentry_config.sample_rate,
        traces_sample_rate: sentry_config.traces_sample_rate,
        enable_logs: true,
        ..Default::default()
    }))
}

/// Installs the global tracing subscriber.
///
/// Logs go to stderr in the configured [`LogFormat`]. If Sentry is enabled, warnings and errors are
/// also reported as Sentry events.
pub fn init_tracing(config: &Config) {
    // Same as the default filter, except it converts warnings into events
    // and also sends everything at or above INFO as logs instead of breadcrumbs.
    let sentry_layer = config.sentry.is_enabled().then(|| {
        sentry_tracing::layer().event_filter(|metadata| match *metadata.level() {
            Level::ERROR | Level::WARN => {
                sentry_tracing::EventFilter::Event | sentry_tracing::EventFilter::Log
            }
            Level::INFO => sentry_tracing::EventFilter::Log,
            Level::DEBUG | Level::TRACE => sentry_tracing::EventFilter::Ignore,
        })
    });

    let format = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true);

    let format = match resolve_format(config.logging.format) {
        LogFormat::Json => format.json().flatten_event(true).boxed(),
        LogFormat::Pretty => format.pretty().boxed(),
        LogFormat::Simplified | LogFormat::Auto => format.compact().with_ansi(false).boxed(),
    };

    tracing_subscriber::registry()
        .with(format)
        .with(sentry_layer)
        .with(env_filter(config.logging.level))
        .init();
}

/// Resolves [`LogFormat::Auto`] based on whether stderr is a terminal.
fn resolve_format(format: LogFormat) -> LogFormat {
    match format {
        LogFormat::Auto if std::io::stderr().is_terminal() => LogFormat::Pretty,
        LogFormat::Auto => LogFormat::Simplified,
        format => format,
    }
}

/// Builds the log filter from `RUST_LOG`, or the configured level if unset.
fn env_filter(level: LevelFilter) -> EnvFilter {
    match env::var(EnvFilter::DEFAULT_ENV) {
        Ok(value) => EnvFilter::new(value),
        Err(_) => EnvFilter::new(format!("{level},tower_http=WARN")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_format_is_kept() {
        assert_eq!(resolve_format(LogFormat::Json), LogFormat::Json);
        assert_eq!(resolve_format(LogFormat::Pretty), LogFormat::Pretty);
        assert_ne!(resolve_format(LogFormat::Auto), LogFormat::Auto);
    }
}
