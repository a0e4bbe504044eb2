use std::fmt;
use std::path::PathBuf;

#[derive(Debug)]
pub enum LockError {
    /// Another holder kept the lock past the timeout.
    Timeout { path: PathBuf, description: String },
    Io {
        source: std::io::Error,
        path: PathBuf,
        operation: &'static str,
    },
}

impl fmt::Display for LockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockError::Timeout { path, description } => write!(
                f,
                "timed out waiting for lock {} ({})",
                path.display(),
                description
            ),
            LockError::Io {
                source,
                path,
                operation,
            } => write!(f, "failed to {} {}: {}", operation, path.display(), source),
        }
    }
}

impl std::error::Error for LockError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LockError::Timeout { .. } => None,
            LockError::Io { source, .. } => Some(source),
        }
    }
}
