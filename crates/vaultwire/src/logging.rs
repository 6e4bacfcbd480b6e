use clap::ValueEnum;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

/// Crates whose events honor `--log-level`; everything else stays at WARN.
const VAULTWIRE_TARGETS: [&str; 4] = [
    "vaultwire",
    "vaultwire_client",
    "vaultwire_frame",
    "vaultwire_transport",
];

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

fn filter(level: LogLevel) -> Targets {
    let level = LevelFilter::from(level);
    Targets::new()
        .with_default(LevelFilter::WARN.min(level))
        .with_targets(VAULTWIRE_TARGETS.map(|target| (target, level)))
}

/// Install the stderr subscriber. Stdout is reserved for command output.
pub fn init_logging(format: LogFormat, level: LogLevel) {
    let base = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(false);

    let _ = match format {
        LogFormat::Text => tracing_subscriber::registry()
            .with(base.with_filter(filter(level)))
            .try_init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(base.json().with_filter(filter(level)))
            .try_init(),
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_convert() {
        assert_eq!(LevelFilter::from(LogLevel::Error), LevelFilter::ERROR);
        assert_eq!(LevelFilter::from(LogLevel::Trace), LevelFilter::TRACE);
    }

    #[test]
    fn foreign_targets_capped_at_warn() {
        let targets = filter(LogLevel::Trace);
        assert!(targets.would_enable("vaultwire_client::mux", &tracing::Level::TRACE));
        assert!(!targets.would_enable("tokio::runtime", &tracing::Level::DEBUG));
        assert!(targets.would_enable("tokio::runtime", &tracing::Level::WARN));
    }

    #[test]
    fn quiet_levels_apply_everywhere() {
        let targets = filter(LogLevel::Error);
        assert!(!targets.would_enable("vaultwire_client", &tracing::Level::WARN));
        assert!(!targets.would_enable("tokio", &tracing::Level::WARN));
    }
}
