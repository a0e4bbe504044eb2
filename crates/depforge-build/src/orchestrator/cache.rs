use super::{BuildContext, Orchestrator};
use crate::error::{ForgeError, Result};
use crate::tools::{ARCHIVER_TOOL, extract_to};
use depforge_core::fsutil::{remove_dir_if_exists, remove_file_if_exists};
use depforge_core::{Flavor, PackageKey};
use depforge_fetch::{ArchiveService, Format};
use log::{info, warn};
use std::path::{Path, PathBuf};

impl Orchestrator {
    /// Archive service able to handle `path`, with the archiver tool
    /// provisioned for non-native formats.
    pub fn archive_for(&self, path: &Path) -> Result<ArchiveService> {
        if Format::detect(path).is_native() {
            return Ok(self.archive.clone());
        }
        let archiver = self.tool(ARCHIVER_TOOL)?;
        Ok(self.archive.clone().with_archiver(archiver.path))
    }

    /// Remove the install dir and the local cache package of `key`.
    /// Missing paths are fine.
    pub(super) fn purge(&self, flavor: &Flavor, key: &PackageKey) -> Result<()> {
        let install_dir = self.layout.install_path(flavor, key);
        remove_dir_if_exists(&install_dir)
            .map_err(|e| ForgeError::io(format!("remove {}", install_dir.display()), e))?;

        let artifact = self.layout.package_path(flavor, key);
        if remove_file_if_exists(&artifact)
            .map_err(|e| ForgeError::io(format!("remove {}", artifact.display()), e))?
        {
            info!("Removed cache package {}", artifact.display());
        }
        Ok(())
    }

    /// Local cache package of `key`, else one downloaded from a mirror.
    /// The flag tells whether it came from a mirror.
    pub(super) fn locate_artifact(
        &self,
        flavor: &Flavor,
        key: &PackageKey,
        allow_mirror: bool,
    ) -> Option<(PathBuf, bool)> {
        let artifact = self.layout.package_path(flavor, key);
        if artifact.is_file() {
            return Some((artifact, false));
        }
        if allow_mirror && self.fetch_from_mirror(&artifact) {
            return Some((artifact, true));
        }
        None
    }

    /// Try every mirror for `{base}libraries/{artifact name}`. Failures only
    /// mean the package gets built from source.
    fn fetch_from_mirror(&self, artifact: &Path) -> bool {
        let Some(name) = artifact.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        let urls: Vec<String> = self
            .mirrors
            .iter()
            .map(|base| format!("{}libraries/{}", base, name))
            .collect();

        let Some(url) = self.downloader.first_reachable(&urls) else {
            return false;
        };
        info!("Retrieving package {} from {}", name, url);
        match self.downloader.fetch(url, artifact) {
            Ok(_) => true,
            Err(e) => {
                warn!("Failed to retrieve {}: {}", url, e);
                false
            }
        }
    }

    /// Extract a cache package so it becomes `install_dir`.
    pub(super) fn install_artifact(&self, artifact: &Path, install_dir: &Path) -> Result<()> {
        info!(
            "Extracting {} into {}",
            artifact.display(),
            install_dir.display()
        );
        let archive = self.archive_for(artifact)?;
        extract_to(&archive, artifact, install_dir)
    }

    /// Package the installed prefix into the cache dir.
    ///
    /// Never fails: the installed tree is usable either way. Returns the
    /// warning when no package was written.
    pub(super) fn package_prefix(&self, ctx: &BuildContext) -> Option<String> {
        let flavor = self.flavor();
        let artifact = self.layout.package_path(&flavor, &ctx.key);
        let (Some(dir), Some(name)) = (
            artifact.parent(),
            artifact.file_name().and_then(|n| n.to_str()),
        ) else {
            return Some(format!("invalid package path {}", artifact.display()));
        };

        info!("Creating package {}...", name);
        let packaged = self
            .archive_for(&artifact)
            .and_then(|archive| archive.package(&ctx.prefix, dir, name).map_err(ForgeError::from));
        let warning = match packaged {
            Ok(true) => return None,
            Ok(false) => format!(
                "install prefix {} was not created, no package written",
                ctx.prefix.display()
            ),
            Err(e) => format!("failed to create package {}: {}", name, e),
        };
        warn!("{}", warning);
        Some(warning)
    }
}
