use crate::env::{env_or, LOG_LEVEL_ENV};
use crate::error::{ConfigError, InitError};
use crate::formatter::FormatterConfig;
use crate::layer::JsonLogLayer;
use tracing::{Level, Subscriber};
use tracing_subscriber::filter::Targets;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

/// Targets that are chatty at INFO and below in most services.
pub const DEFAULT_SUPPRESSED_TARGETS: &[&str] = &["hyper", "h2", "tokio", "reqwest", "rustls"];

/// Process-wide logging configuration.
///
/// **Fields**
/// - `level`: most verbose level written for ordinary targets.
/// - `suppressed_targets`: targets capped at `WARN` whenever `level` is
///   `INFO` or more verbose.
/// - `formatter`: options for the [`SanitizedJsonFormatter`](crate::formatter::SanitizedJsonFormatter)
///   that renders every line.
#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: Level,
    pub suppressed_targets: Vec<String>,
    pub formatter: FormatterConfig,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            suppressed_targets: DEFAULT_SUPPRESSED_TARGETS.iter().map(|t| t.to_string()).collect(),
            formatter: FormatterConfig::default(),
        }
    }
}

impl LoggingConfig {
    /// Defaults, with the level taken from [`LOG_LEVEL_ENV`] when set.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            level: parse_level(&env_or(LOG_LEVEL_ENV, "info"))?,
            ..Self::default()
        })
    }
}

pub fn parse_level(value: &str) -> Result<Level, ConfigError> {
    value
        .trim()
        .parse::<Level>()
        .map_err(|_| ConfigError::UnknownLevel(value.to_string()))
}

/// Level applied to suppressed targets for a configured `level`.
pub fn suppressed_level(level: Level) -> Level {
    if level >= Level::INFO {
        Level::WARN
    } else {
        level
    }
}

/// Build the subscriber [`init_logging`] installs, without installing it.
pub fn build_subscriber(config: LoggingConfig) -> Result<impl Subscriber + Send + Sync + 'static, ConfigError> {
    let formatter = config.formatter.build()?;
    let capped = suppressed_level(config.level);
    let targets = Targets::new().with_default(config.level).with_targets(
        config
            .suppressed_targets
            .into_iter()
            .map(move |target| (target, capped)),
    );

    Ok(Registry::default().with(targets).with(JsonLogLayer::new(formatter)))
}

/// Install a global subscriber writing sanitized JSON lines to stderr.
pub fn init_logging(config: LoggingConfig) -> Result<(), InitError> {
    let subscriber = build_subscriber(config)?;
    tracing::subscriber::set_global_default(subscriber)?;
    tracing::debug!("logging configured");
    Ok(())
}
