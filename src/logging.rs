//! Tracing subscriber setup

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::LoggingConfig;

/// Default filter when `RUST_LOG` is not set
pub fn default_filter(level: &str) -> String {
    format!("shelfmark={},tower_http=debug", level)
}

/// Install the global subscriber.
///
/// The returned guard flushes the log file on drop and must live as long as the process.
pub fn init(config: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(&config.level)));

    let json = config.format.eq_ignore_ascii_case("json");
    let stdout = if json {
        fmt::layer().json().boxed()
    } else {
        fmt::layer().boxed()
    };

    let (file, guard) = match &config.directory {
        Some(directory) => {
            let appender = tracing_appender::rolling::daily(directory, "shelfmark.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = if json {
                fmt::layer().json().with_writer(writer).with_ansi(false).boxed()
            } else {
                fmt::layer().with_writer(writer).with_ansi(false).boxed()
            };
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout)
        .with(file)
        .init();

    guard
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filter_targets_crate_and_http() {
        assert_eq!(default_filter("warn"), "shelfmark=warn,tower_http=debug");
    }
}
