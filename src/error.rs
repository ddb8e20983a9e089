use tracing::subscriber::SetGlobalDefaultError;

/// Invalid configuration, reported when a formatter or subscriber is built.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("request context is missing a request id")]
    MissingRequestId,

    #[error("unknown log level: {0}")]
    UnknownLevel(String),

    #[error("redaction keys must not be empty strings")]
    EmptyRedactKey,
}

/// Error type returned when installing the global subscriber.
#[derive(thiserror::Error, Debug)]
pub enum InitError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to install global subscriber: {0}")]
    SetGlobalDefault(#[from] SetGlobalDefaultError),
}
