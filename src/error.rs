use thiserror::Error;

/// Crate-wide error type.
///
/// Parsing and probing never error: malformed playlist lines are skipped
/// and probe failures fold into an `unavailable` status. Errors surface
/// only from source fetching and configuration I/O.
#[derive(Debug, Error)]
pub enum IptvError {
    #[error("Source error: {0}")]
    SourceError(String),

    #[error("Config error: {0}")]
    ConfigError(String),
}

pub type Result<T> = std::result::Result<T, IptvError>;
