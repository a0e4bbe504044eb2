//! Filesystem helpers shared by the fetch and build crates.

use log::info;
use std::fs;
use std::io;
use std::path::Path;

/// Remove a directory tree; a missing path is not an error.
pub fn remove_dir_if_exists(path: &Path) -> io::Result<bool> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

/// Remove a file; a missing path is not an error.
pub fn remove_file_if_exists(path: &Path) -> io::Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

/// Add the executable bits to a file if it lacks them. No-op off Unix.
#[cfg(unix)]
pub fn add_execute_permission(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut permissions = fs::metadata(path)?.permissions();
    let mode = permissions.mode();
    if mode & 0o111 == 0o111 {
        return Ok(());
    }

    info!("Adding execute permission on {}", path.display());
    permissions.set_mode(mode | 0o111);
    fs::set_permissions(path, permissions)
}

#[cfg(not(unix))]
pub fn add_execute_permission(_path: &Path) -> io::Result<()> {
    Ok(())
}

/// Replace `${DEPFORGE_DIR}` and `${HOME}` in a configured path or URL.
pub fn expand_placeholders(raw: &str, root_dir: &Path, home_dir: Option<&Path>) -> String {
    let mut out = raw.replace("${DEPFORGE_DIR}", &root_dir.to_string_lossy());
    if let Some(home) = home_dir {
        out = out.replace("${HOME}", &home.to_string_lossy());
    }
    out
}

/// Copy a directory tree. `dest` must not exist yet.
pub fn copy_dir_all(src: &Path, dest: &Path) -> io::Result<()> {
    fs::create_dir_all(dest)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let target = dest.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir_all(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}
