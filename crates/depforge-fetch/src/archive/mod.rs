//! Archive extraction and packaging.
//!
//! Formats are picked from the file name through a suffix table. `.tar.xz`,
//! `.tar.gz` and `.zip` are handled in-process; everything else falls back
//! to a 7z-compatible archiver, which must then be configured with
//! [`ArchiveService::with_archiver`].

mod extract;
mod package;

use depforge_core::{CommandRunner, SystemRunner};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Archive format of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    TarXz,
    TarGz,
    Zip,
    SevenZip,
    /// Self-extracting 7z executable (`.7z.exe`).
    SelfExtracting,
}

/// Suffix table, longest suffixes first so `.7z.exe` wins over `.exe`.
const STRATEGIES: &[(&str, Format)] = &[
    (".tar.xz", Format::TarXz),
    (".tar.gz", Format::TarGz),
    (".7z.exe", Format::SelfExtracting),
    (".txz", Format::TarXz),
    (".tgz", Format::TarGz),
    (".zip", Format::Zip),
    (".7z", Format::SevenZip),
];

/// Multi-part suffixes stripped as a whole when deriving a directory name.
const COMPOUND_SUFFIXES: &[&str] = &[".tar.xz", ".tar.gz", ".tar.bz2", ".7z.exe"];

impl Format {
    /// Format for a file name; unknown suffixes go to the archiver.
    pub fn detect(path: &Path) -> Format {
        let name = file_name_lower(path);
        STRATEGIES
            .iter()
            .find(|(suffix, _)| name.ends_with(suffix))
            .map(|(_, format)| *format)
            .unwrap_or(Format::SevenZip)
    }

    /// Format written for a package extension such as `tar.xz` or `7z`.
    pub fn for_extension(ext: &str) -> Format {
        Format::detect(Path::new(&format!("package.{}", ext.trim_start_matches('.'))))
    }

    /// Handled without an external archiver.
    pub fn is_native(self) -> bool {
        matches!(self, Format::TarXz | Format::TarGz | Format::Zip)
    }
}

fn file_name_lower(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default()
}

/// File name without its archive suffix: `zlib-1.3.tar.gz` gives `zlib-1.3`,
/// `LLVM-17.0.6-win64.7z.exe` gives `LLVM-17.0.6-win64`, and any other name
/// loses its last extension only.
pub fn strip_archive_suffix(file_name: &str) -> &str {
    let lower = file_name.to_ascii_lowercase();
    for suffix in COMPOUND_SUFFIXES {
        if lower.ends_with(suffix) {
            return &file_name[..file_name.len() - suffix.len()];
        }
    }
    match file_name.rfind('.') {
        Some(idx) if idx > 0 => &file_name[..idx],
        _ => file_name,
    }
}

/// Extracts archives and writes cache packages.
#[derive(Clone)]
pub struct ArchiveService {
    archiver: Option<PathBuf>,
    runner: Arc<dyn CommandRunner>,
}

impl Default for ArchiveService {
    fn default() -> Self {
        Self::new(Arc::new(SystemRunner))
    }
}

impl ArchiveService {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            archiver: None,
            runner,
        }
    }

    /// Use `path` (a `7z`/`7za` executable) for non-native formats.
    pub fn with_archiver(mut self, path: impl Into<PathBuf>) -> Self {
        self.archiver = Some(path.into());
        self
    }

    pub fn archiver(&self) -> Option<&Path> {
        self.archiver.as_deref()
    }
}
