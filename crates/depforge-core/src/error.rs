use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    // Configuration errors
    #[error("CONFIGURATION_ERROR: {0}")]
    Configuration(String),

    #[error("CONFIG_NOT_FOUND: configuration file {0} does not exist")]
    ConfigNotFound(PathBuf),

    #[error("CONFIG_PARSE_ERROR: failed to parse {path}: {reason}")]
    ConfigParse { path: PathBuf, reason: String },

    #[error("UNKNOWN_DEPENDENCY: no library named '{0}' in the catalog")]
    UnknownDependency(String),

    #[error("UNSUPPORTED_PLATFORM: {0}")]
    UnsupportedPlatform(String),

    // Lock errors
    #[error("LOCK_ERROR: {0}")]
    Lock(#[from] crate::lock::LockError),

    // State errors
    #[error("STATE_READ_ERROR: failed to read state.json: {0}")]
    StateRead(String),

    #[error("STATE_WRITE_ERROR: failed to write state.json: {0}")]
    StateWrite(String),

    #[error("STATE_INVALID_SCHEMA: unknown schema version '{0}'")]
    StateInvalidSchema(String),

    // IO errors
    #[error("IO_ERROR: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl CoreError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        CoreError::Io {
            context: context.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
