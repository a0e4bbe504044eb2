use depforge_core::CoreError;
use depforge_core::lock::LockError;
use depforge_fetch::{ArchiveError, DownloadError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ForgeError {
    /// Unknown dependency or recipe, malformed catalog. Aborts a batch.
    #[error("CONFIGURATION_ERROR: {0}")]
    Configuration(String),

    #[error(transparent)]
    Download(#[from] DownloadError),

    #[error(transparent)]
    Extraction(#[from] ArchiveError),

    #[error("BUILD_ERROR: `{command}` failed with exit code {code:?}")]
    Build { command: String, code: Option<i32> },

    #[error("TOOLCHAIN_ERROR: {0}")]
    Toolchain(String),

    #[error("LOCK_ERROR: {0}")]
    Lock(#[from] LockError),

    #[error("STATE_ERROR: {0}")]
    State(String),

    #[error("IO_ERROR: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl ForgeError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        ForgeError::Io {
            context: context.into(),
            source,
        }
    }

    /// Whether a batch should stop instead of moving to the next dependency.
    pub fn aborts_batch(&self) -> bool {
        matches!(self, ForgeError::Configuration(_))
    }
}

impl From<CoreError> for ForgeError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Lock(inner) => ForgeError::Lock(inner),
            CoreError::Io { context, source } => ForgeError::Io { context, source },
            CoreError::StateRead(_)
            | CoreError::StateWrite(_)
            | CoreError::StateInvalidSchema(_) => ForgeError::State(err.to_string()),
            other => ForgeError::Configuration(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, ForgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_dependency_is_configuration() {
        let err: ForgeError = CoreError::UnknownDependency("boost".to_string()).into();
        assert!(matches!(err, ForgeError::Configuration(ref m) if m.contains("boost")));
        assert!(err.aborts_batch());
    }

    #[test]
    fn test_build_error_names_command() {
        let err = ForgeError::Build {
            command: "ninja install".to_string(),
            code: Some(2),
        };
        assert!(!err.aborts_batch());
        let msg = err.to_string();
        assert!(msg.starts_with("BUILD_ERROR"));
        assert!(msg.contains("ninja install"));
        assert!(msg.contains("Some(2)"));
    }

    #[test]
    fn test_core_io_keeps_context() {
        let err: ForgeError = CoreError::io(
            "read catalog",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        )
        .into();
        assert!(matches!(err, ForgeError::Io { ref context, .. } if context == "read catalog"));
    }
}
