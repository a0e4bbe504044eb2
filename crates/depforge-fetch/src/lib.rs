//! Fetching and packaging for depforge.
//!
//! - [`download`]: the [`Downloader`], which copies local paths, clones VCS
//!   repositories and streams HTTP(S) resources with retry, throttling and
//!   progress reporting
//! - [`archive`]: the [`ArchiveService`], which extracts source archives and
//!   cache packages and writes new packages with deterministic settings

pub mod archive;
pub mod client;
pub mod download;
pub mod error;

pub use archive::{ArchiveService, Format};
pub use download::{DownloadOptions, Downloader, FetchOutcome, Progress, SourceKind};
pub use error::{ArchiveError, DownloadError};
