use super::Orchestrator;
use crate::error::{ForgeError, Result};
use crate::tools::{extract_to, vcs_source};
use depforge_core::fsutil::remove_dir_if_exists;
use depforge_core::{LibraryDescriptor, PackageKey};
use depforge_fetch::ArchiveError;
use depforge_fetch::download::vcs;
use log::{info, warn};
use std::path::{Path, PathBuf};

/// Working directories of one build attempt.
///
/// The source dir doubles as the build dir; it belongs to this attempt
/// until packaging or cleanup.
#[derive(Debug, Clone)]
pub struct BuildContext {
    pub source_dir: PathBuf,
    pub prefix: PathBuf,
    pub key: PackageKey,
}

impl Orchestrator {
    /// Fetch and unpack the sources of `desc` into `build/libraries/{key}`.
    ///
    /// An existing source dir is removed first unless `use_existing_src` is
    /// set, in which case it is reused (and pulled for VCS sources).
    pub fn prepare_sources(
        &self,
        desc: &LibraryDescriptor,
        key: &PackageKey,
        use_existing_src: bool,
    ) -> Result<BuildContext> {
        let source = desc.source_for(self.platform()).ok_or_else(|| {
            ForgeError::Configuration(format!(
                "library '{}' has no source url or git repository for {}",
                desc.name,
                self.platform()
            ))
        })?;

        let base = self.layout.build_dir();
        let source_dir = base.join(key.dir_name());

        if !use_existing_src
            && remove_dir_if_exists(&source_dir)
                .map_err(|e| ForgeError::io(format!("remove {}", source_dir.display()), e))?
        {
            info!("Removed previous source folder {}", source_dir.display());
        }

        if source_dir.is_dir() {
            if source.from_vcs {
                self.pull_sources(&source.url, &source_dir);
            }
            info!("Using existing source folder {}", source_dir.display());
        } else if source.from_vcs {
            self.clone_sources(&source.url, &base, &source_dir, key)?;
        } else {
            self.download_sources(desc, &source.url, &base, &source_dir)?;
        }

        Ok(BuildContext {
            source_dir,
            prefix: self.layout.install_path(&self.flavor(), key),
            key: key.clone(),
        })
    }

    fn download_sources(
        &self,
        desc: &LibraryDescriptor,
        url: &str,
        base: &Path,
        source_dir: &Path,
    ) -> Result<()> {
        let file_name = url.rsplit(['/', '\\']).next().unwrap_or(url);
        let archive_path = base.join(file_name);
        if archive_path.exists() {
            info!("Using already downloaded {}", archive_path.display());
        } else {
            self.downloader.fetch(url, &archive_path)?;
        }

        if let Some(extracted) = &desc.extracted_dir {
            let leftover = base.join(extracted);
            if leftover.exists() {
                return Err(ArchiveError::Collision(leftover).into());
            }
        }

        let archive = self.archive_for(&archive_path)?;
        extract_to(&archive, &archive_path, source_dir)
    }

    fn clone_sources(&self, url: &str, base: &Path, source_dir: &Path, key: &PackageKey) -> Result<()> {
        self.downloader.fetch(&vcs_source(url), source_dir)?;

        info!("Removing .git folder...");
        remove_dir_if_exists(&source_dir.join(".git"))
            .map_err(|e| ForgeError::io(format!("remove .git in {}", source_dir.display()), e))?;

        let snapshot = format!(
            "{}-{}.{}",
            key.dir_name(),
            self.platform(),
            self.platform().package_extension()
        );
        let packaged = self
            .archive_for(Path::new(&snapshot))
            .and_then(|archive| archive.package(source_dir, base, &snapshot).map_err(ForgeError::from));
        match packaged {
            Ok(_) => info!("Created source package {}", snapshot),
            Err(e) => warn!("Failed to create source package {}: {}", snapshot, e),
        }
        Ok(())
    }

    fn pull_sources(&self, url: &str, source_dir: &Path) {
        let reference = vcs_source(url);
        let Some((kind, _)) = vcs::parse_reference(&reference) else {
            return;
        };
        if let Err(e) = vcs::pull(self.runner(), kind, source_dir) {
            warn!("Could not update {}: {}", source_dir.display(), e);
        }
    }
}
