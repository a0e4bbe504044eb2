use std::fs::File;
use std::path::{Path, PathBuf};

/// Holds an advisory lock until dropped.
///
/// The lock lives on the open file descriptor, so closing the file on drop
/// releases it.
#[derive(Debug)]
pub struct LockGuard {
    pub(crate) _file: File,
    pub(crate) path: PathBuf,
}

impl LockGuard {
    pub fn path(&self) -> &Path {
        &self.path
    }
}
