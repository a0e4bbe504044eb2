use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("DOWNLOAD_ERROR: giving up on {url} after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        url: String,
        attempts: u32,
        last_error: String,
    },

    #[error("DOWNLOAD_ERROR: {url} answered with status {status}")]
    Status { url: String, status: u16 },

    #[error("DOWNLOAD_ERROR: failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("DOWNLOAD_ERROR: '{0}' is neither a URL, a VCS reference nor an existing path")]
    UnsupportedSource(String),

    #[error("DESTINATION_EXISTS: {0} already exists")]
    DestinationExists(PathBuf),

    #[error("VCS_ERROR: `{command}` failed with exit code {code:?}")]
    Vcs { command: String, code: Option<i32> },

    #[error("IO_ERROR: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl DownloadError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        DownloadError::Io {
            context: context.into(),
            source,
        }
    }
}

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("EXTRACTION_COLLISION: {0} already exists, refusing to extract over it")]
    Collision(PathBuf),

    #[error("EXTRACTION_ERROR: failed to extract {archive}: {reason}")]
    Extract { archive: PathBuf, reason: String },

    #[error("ARCHIVER_MISSING: no 7z archiver available to handle {0}")]
    ArchiverMissing(PathBuf),

    #[error("ARCHIVER_FAILED: `{command}` failed with exit code {code:?}")]
    Archiver { command: String, code: Option<i32> },

    #[error("PACKAGE_ERROR: failed to write {path}: {reason}")]
    Package { path: PathBuf, reason: String },

    #[error("IO_ERROR: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl ArchiveError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        ArchiveError::Io {
            context: context.into(),
            source,
        }
    }
}
