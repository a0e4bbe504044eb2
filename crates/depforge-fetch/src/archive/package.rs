use super::extract::run_archiver;
use super::{ArchiveService, Format};
use crate::error::ArchiveError;
use depforge_core::fsutil::remove_file_if_exists;
use log::{info, warn};
use std::fs::{self, File, Metadata};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::NamedTempFile;
use walkdir::WalkDir;

const XZ_PRESET: u32 = 6;
const GZ_LEVEL: u32 = 9;

/// 7z settings: solid LZMA2, maximum level, fixed word size.
const SEVEN_ZIP_FLAGS: &[&str] = &[
    "-m0=lzma2", "-mx=9", "-aoa", "-mfb=64", "-ms=on", "-mmt=2", "-r",
];

impl ArchiveService {
    /// Write `source_dir` to `dest_dir/package_name`, the format following
    /// the name's suffix.
    ///
    /// Returns `Ok(false)` without writing anything when `source_dir` does
    /// not exist. Native formats store entries sorted by name with zeroed
    /// timestamps and owners, so packaging the same tree twice yields the
    /// same entry list and metadata. The archive is built next to its final
    /// path and moved into place once complete.
    pub fn package(
        &self,
        source_dir: &Path,
        dest_dir: &Path,
        package_name: &str,
    ) -> Result<bool, ArchiveError> {
        if !source_dir.is_dir() {
            warn!(
                "Nothing to package: {} does not exist",
                source_dir.display()
            );
            return Ok(false);
        }

        fs::create_dir_all(dest_dir)
            .map_err(|e| ArchiveError::io(format!("create {}", dest_dir.display()), e))?;
        let dest = dest_dir.join(package_name);
        info!("Packaging {} into {}", source_dir.display(), dest.display());

        let format = Format::detect(&dest);
        if format.is_native() {
            write_native(format, source_dir, dest_dir, &dest)?;
        } else {
            self.write_with_archiver(source_dir, &dest)?;
        }
        Ok(true)
    }

    fn write_with_archiver(&self, source_dir: &Path, dest: &Path) -> Result<(), ArchiveError> {
        let archiver = self
            .archiver
            .as_ref()
            .ok_or_else(|| ArchiveError::ArchiverMissing(dest.to_path_buf()))?;

        let mut partial = dest.as_os_str().to_os_string();
        partial.push(".partial");
        let partial = PathBuf::from(partial);
        remove_file_if_exists(&partial)
            .map_err(|e| ArchiveError::io(format!("remove {}", partial.display()), e))?;

        let mut cmd = Command::new(archiver);
        cmd.arg("a")
            .arg("-t7z")
            .arg(&partial)
            .arg(source_dir)
            .args(SEVEN_ZIP_FLAGS);
        run_archiver(self, &mut cmd)?;

        fs::rename(&partial, dest)
            .map_err(|e| ArchiveError::io(format!("rename to {}", dest.display()), e))
    }
}

fn write_native(
    format: Format,
    source_dir: &Path,
    dest_dir: &Path,
    dest: &Path,
) -> Result<(), ArchiveError> {
    let package_err = |reason: String| ArchiveError::Package {
        path: dest.to_path_buf(),
        reason,
    };

    let temp = NamedTempFile::new_in(dest_dir)
        .map_err(|e| ArchiveError::io(format!("create temp file in {}", dest_dir.display()), e))?;
    let file = temp
        .as_file()
        .try_clone()
        .map_err(|e| ArchiveError::io("clone temp file handle", e))?;

    let written = match format {
        Format::TarXz => write_tar(xz2::write::XzEncoder::new(file, XZ_PRESET), source_dir)
            .and_then(|enc| enc.finish()),
        Format::TarGz => write_tar(
            flate2::write::GzEncoder::new(file, flate2::Compression::new(GZ_LEVEL)),
            source_dir,
        )
        .and_then(|enc| enc.finish()),
        Format::Zip => write_zip(file, source_dir),
        Format::SevenZip | Format::SelfExtracting => {
            return Err(package_err("not a native format".to_string()));
        }
    };
    let file = written.map_err(|e| package_err(e.to_string()))?;
    file.sync_all().map_err(|e| package_err(e.to_string()))?;
    drop(file);

    temp.persist(dest)
        .map_err(|e| ArchiveError::io(format!("persist {}", dest.display()), e.error))?;
    Ok(())
}

/// Entries under `source_dir`, sorted, each with its archive name rooted at
/// the directory's own name.
fn sorted_entries(source_dir: &Path) -> io::Result<Vec<(PathBuf, PathBuf, Metadata)>> {
    let root_name = source_dir
        .file_name()
        .map(PathBuf::from)
        .ok_or_else(|| io::Error::other("source directory has no name"))?;

    let mut out = Vec::new();
    for entry in WalkDir::new(source_dir).sort_by_file_name() {
        let entry = entry.map_err(io::Error::other)?;
        let rel = entry
            .path()
            .strip_prefix(source_dir)
            .map_err(io::Error::other)?;
        let meta = entry.path().symlink_metadata()?;
        out.push((entry.path().to_path_buf(), root_name.join(rel), meta));
    }
    Ok(out)
}

#[cfg(unix)]
fn file_mode(meta: &Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode() & 0o777
}

#[cfg(not(unix))]
fn file_mode(_meta: &Metadata) -> u32 {
    0o644
}

fn write_tar<W: Write>(writer: W, source_dir: &Path) -> io::Result<W> {
    let mut builder = tar::Builder::new(writer);
    builder.follow_symlinks(false);

    for (path, name, meta) in sorted_entries(source_dir)? {
        let mut header = tar::Header::new_gnu();
        header.set_mtime(0);
        header.set_uid(0);
        header.set_gid(0);

        let file_type = meta.file_type();
        if file_type.is_dir() {
            header.set_entry_type(tar::EntryType::Directory);
            header.set_mode(0o755);
            header.set_size(0);
            builder.append_data(&mut header, &name, io::empty())?;
        } else if file_type.is_symlink() {
            let target = fs::read_link(&path)?;
            header.set_entry_type(tar::EntryType::Symlink);
            header.set_mode(0o777);
            header.set_size(0);
            builder.append_link(&mut header, &name, &target)?;
        } else {
            header.set_entry_type(tar::EntryType::Regular);
            header.set_mode(file_mode(&meta));
            header.set_size(meta.len());
            builder.append_data(&mut header, &name, File::open(&path)?)?;
        }
    }

    builder.into_inner()
}

fn write_zip(file: File, source_dir: &Path) -> io::Result<File> {
    use zip::write::SimpleFileOptions;
    use zip::{CompressionMethod, DateTime, ZipWriter};

    let mut zip = ZipWriter::new(file);
    let base = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default());

    for (path, name, meta) in sorted_entries(source_dir)? {
        let name = name
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        let file_type = meta.file_type();
        if file_type.is_dir() {
            zip.add_directory(format!("{}/", name), base.unix_permissions(0o755))
                .map_err(io::Error::other)?;
        } else if file_type.is_symlink() {
            let target = fs::read_link(&path)?.to_string_lossy().into_owned();
            zip.add_symlink(name, target, base)
                .map_err(io::Error::other)?;
        } else {
            zip.start_file(name, base.unix_permissions(file_mode(&meta)))
                .map_err(io::Error::other)?;
            io::copy(&mut File::open(&path)?, &mut zip)?;
        }
    }

    zip.finish().map_err(io::Error::other)
}
