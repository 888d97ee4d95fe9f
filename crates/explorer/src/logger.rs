use clap::ValueEnum;
use tracing::warn;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Maps a configured level name to a [`tracing::Level`], falling back to `info`.
pub fn parse_log_level(log_level: &str) -> tracing::Level {
    match log_level.to_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "info" => tracing::Level::INFO,
        "warn" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => {
            warn!("Invalid log level '{}', defaulting to 'info'", log_level);
            tracing::Level::INFO
        }
    }
}

/// Installs the global subscriber. `RUST_LOG` takes precedence over `log_level`.
pub fn init_logger(log_level: &str, format: LogFormat) {
    let level = parse_log_level(log_level);
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()));

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(true))
            .init(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_log_level() {
        assert_eq!(parse_log_level("DEBUG"), tracing::Level::DEBUG);
        assert_eq!(parse_log_level("error"), tracing::Level::ERROR);
        assert_eq!(parse_log_level("verbose"), tracing::Level::INFO);
    }
}
