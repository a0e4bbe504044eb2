use super::{ArchiveService, Format, strip_archive_suffix};
use crate::error::ArchiveError;
use depforge_core::process::describe;
use log::{debug, info};
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::Command;

impl ArchiveService {
    /// Extract `archive` into `dest_dir`.
    ///
    /// The result is named `expected` when given, otherwise the archive file
    /// name without its suffix. Extraction refuses to start if either that
    /// name or the archive's stripped file name already exists in `dest_dir`,
    /// and never touches the existing entry. An archive of loose files is
    /// unpacked straight into `dest_dir`, which is then returned.
    pub fn extract(
        &self,
        archive: &Path,
        dest_dir: &Path,
        expected: Option<&str>,
    ) -> Result<PathBuf, ArchiveError> {
        let file_name = archive
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| ArchiveError::Extract {
                archive: archive.to_path_buf(),
                reason: "path has no file name".to_string(),
            })?;
        let native = strip_archive_suffix(&file_name).to_string();
        let target = expected.unwrap_or(&native);

        for name in [target, native.as_str()] {
            let candidate = dest_dir.join(name);
            if candidate.exists() {
                return Err(ArchiveError::Collision(candidate));
            }
        }

        fs::create_dir_all(dest_dir)
            .map_err(|e| ArchiveError::io(format!("create {}", dest_dir.display()), e))?;
        let staging = tempfile::Builder::new()
            .prefix(".extract-")
            .tempdir_in(dest_dir)
            .map_err(|e| ArchiveError::io(format!("create staging dir in {}", dest_dir.display()), e))?;

        let format = Format::detect(archive);
        info!("Extracting {} into {}", archive.display(), dest_dir.display());
        self.unpack(archive, staging.path(), format)?;

        let entries = fs::read_dir(staging.path())
            .and_then(|rd| rd.collect::<io::Result<Vec<_>>>())
            .map_err(|e| ArchiveError::io(format!("list {}", staging.path().display()), e))?;

        let single_dir = match entries.as_slice() {
            [only] if only.path().is_dir() => Some(only.path()),
            _ => None,
        };

        match single_dir {
            Some(top) => {
                let final_path = dest_dir.join(target);
                if final_path.exists() {
                    return Err(ArchiveError::Collision(final_path));
                }
                debug!("Renaming {} to {}", top.display(), final_path.display());
                fs::rename(&top, &final_path).map_err(|e| {
                    ArchiveError::io(format!("rename to {}", final_path.display()), e)
                })?;
                Ok(final_path)
            }
            None => {
                debug!("{} has no single top-level directory", archive.display());
                for entry in entries {
                    let to = dest_dir.join(entry.file_name());
                    if to.exists() {
                        return Err(ArchiveError::Collision(to));
                    }
                    fs::rename(entry.path(), &to)
                        .map_err(|e| ArchiveError::io(format!("move to {}", to.display()), e))?;
                }
                Ok(dest_dir.to_path_buf())
            }
        }
    }

    fn unpack(&self, archive: &Path, into: &Path, format: Format) -> Result<(), ArchiveError> {
        match format {
            Format::TarXz => unpack_tar(archive, into, xz2::read::XzDecoder::new),
            Format::TarGz => unpack_tar(archive, into, flate2::read::GzDecoder::new),
            Format::Zip => unpack_zip(archive, into),
            Format::SevenZip | Format::SelfExtracting => self.unpack_with_archiver(archive, into),
        }
    }

    fn unpack_with_archiver(&self, archive: &Path, into: &Path) -> Result<(), ArchiveError> {
        let archiver = self
            .archiver
            .as_ref()
            .ok_or_else(|| ArchiveError::ArchiverMissing(archive.to_path_buf()))?;

        let mut out_flag = std::ffi::OsString::from("-o");
        out_flag.push(into.as_os_str());
        let mut cmd = Command::new(archiver);
        cmd.arg("x").arg(archive).arg(out_flag).arg("-y");
        run_archiver(self, &mut cmd)
    }
}

pub(super) fn run_archiver(service: &ArchiveService, cmd: &mut Command) -> Result<(), ArchiveError> {
    let command = describe(cmd);
    let output = service
        .runner
        .output(cmd)
        .map_err(|e| ArchiveError::io(format!("spawn `{}`", command), e))?;
    if output.status.success() {
        Ok(())
    } else {
        log::error!(
            "`{}` failed: {}",
            command,
            String::from_utf8_lossy(&output.stderr).trim()
        );
        Err(ArchiveError::Archiver {
            command,
            code: output.status.code(),
        })
    }
}

fn unpack_tar<R, F>(archive: &Path, into: &Path, decoder: F) -> Result<(), ArchiveError>
where
    R: Read,
    F: FnOnce(File) -> R,
{
    let extract_err = |e: io::Error| ArchiveError::Extract {
        archive: archive.to_path_buf(),
        reason: e.to_string(),
    };

    let file = File::open(archive)
        .map_err(|e| ArchiveError::io(format!("open {}", archive.display()), e))?;
    let mut tar = tar::Archive::new(decoder(file));

    // unpack_in rejects entries escaping `into`
    for entry in tar.entries().map_err(extract_err)? {
        let mut entry = entry.map_err(extract_err)?;
        entry.unpack_in(into).map_err(extract_err)?;
    }
    Ok(())
}

fn unpack_zip(archive: &Path, into: &Path) -> Result<(), ArchiveError> {
    let zip_err = |e: zip::result::ZipError| ArchiveError::Extract {
        archive: archive.to_path_buf(),
        reason: e.to_string(),
    };

    let file = File::open(archive)
        .map_err(|e| ArchiveError::io(format!("open {}", archive.display()), e))?;
    let mut zip = zip::ZipArchive::new(file).map_err(zip_err)?;

    for i in 0..zip.len() {
        let mut entry = zip.by_index(i).map_err(zip_err)?;
        let Some(rel) = entry.enclosed_name() else {
            continue;
        };
        let out_path = into.join(rel);

        if entry.is_dir() {
            fs::create_dir_all(&out_path)
                .map_err(|e| ArchiveError::io(format!("create {}", out_path.display()), e))?;
            continue;
        }
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| ArchiveError::io(format!("create {}", parent.display()), e))?;
        }
        let mut out = File::create(&out_path)
            .map_err(|e| ArchiveError::io(format!("create {}", out_path.display()), e))?;
        io::copy(&mut entry, &mut out)
            .map_err(|e| ArchiveError::io(format!("write {}", out_path.display()), e))?;

        #[cfg(unix)]
        if let Some(mode) = entry.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&out_path, fs::Permissions::from_mode(mode & 0o777))
                .map_err(|e| ArchiveError::io(format!("chmod {}", out_path.display()), e))?;
        }
    }
    Ok(())
}
