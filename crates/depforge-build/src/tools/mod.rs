//! Tool provisioning.
//!
//! Tools are the binaries needed before any library can be built: archivers,
//! build generators, VCS clients. A tool is resolved once per process and
//! memoized. Resolution never downloads or extracts again when the tool's
//! executable already exists on disk.

pub mod hooks;

pub use hooks::{HookContext, HookRegistry, PostInstallHook};

use crate::error::{ForgeError, Result};
use depforge_core::fsutil::{add_execute_permission, remove_dir_if_exists};
use depforge_core::{CommandRunner, Platform, ToolDescriptor};
use depforge_fetch::{ArchiveError, ArchiveService, Downloader, Format};
use log::{debug, info, warn};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the archiver tool used for non-native archive formats.
pub const ARCHIVER_TOOL: &str = "7z";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolHandle {
    pub name: String,
    /// The executable.
    pub path: PathBuf,
    /// Install directory of the tool.
    pub base_dir: PathBuf,
    pub version: Option<String>,
}

impl ToolHandle {
    /// Directory holding the executable, for `PATH`.
    pub fn dir(&self) -> &Path {
        self.path.parent().unwrap_or(&self.base_dir)
    }
}

/// Services a provisioning run needs.
pub struct Services<'a> {
    pub downloader: &'a Downloader,
    pub archive: &'a ArchiveService,
    pub runner: &'a dyn CommandRunner,
}

pub struct ToolProvisioner {
    platform: Platform,
    tools_dir: PathBuf,
    descriptors: Vec<ToolDescriptor>,
    mirrors: Vec<String>,
    prioritize_mirrors: bool,
    hooks: HookRegistry,
    resolved: RefCell<HashMap<String, ToolHandle>>,
}

impl ToolProvisioner {
    /// `mirrors` are base URLs with placeholders already expanded.
    pub fn new(
        platform: Platform,
        tools_dir: impl Into<PathBuf>,
        descriptors: Vec<ToolDescriptor>,
        mirrors: Vec<String>,
        prioritize_mirrors: bool,
    ) -> Self {
        Self {
            platform,
            tools_dir: tools_dir.into(),
            descriptors,
            mirrors,
            prioritize_mirrors,
            hooks: HookRegistry::with_builtins(),
            resolved: RefCell::new(HashMap::new()),
        }
    }

    pub fn with_hooks(mut self, hooks: HookRegistry) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn tools_dir(&self) -> &Path {
        &self.tools_dir
    }

    pub fn descriptors(&self) -> &[ToolDescriptor] {
        &self.descriptors
    }

    /// Case-insensitive descriptor lookup.
    pub fn descriptor(&self, name: &str) -> Option<&ToolDescriptor> {
        self.descriptors
            .iter()
            .find(|d| d.name.eq_ignore_ascii_case(name))
    }

    /// Already resolved handle, without provisioning.
    pub fn cached(&self, name: &str) -> Option<ToolHandle> {
        self.resolved
            .borrow()
            .get(&name.to_ascii_lowercase())
            .cloned()
    }

    /// Resolve `name` to an executable, provisioning it when needed.
    ///
    /// Sub tools resolve through their parent. Names without a descriptor
    /// fall back to a `PATH` lookup.
    pub fn resolve(&self, name: &str, services: &Services<'_>) -> Result<ToolHandle> {
        if let Some(handle) = self.cached(name) {
            return Ok(handle);
        }

        let handle = if let Some(desc) = self.descriptor(name) {
            self.provision(desc, services)?
        } else if let Some(parent) = self
            .descriptors
            .iter()
            .find(|d| d.sub_tools.keys().any(|k| k.eq_ignore_ascii_case(name)))
        {
            let parent_handle = self.provision(parent, services)?;
            self.remember(&parent.name, parent_handle);
            return self.cached(name).ok_or_else(|| {
                ForgeError::Toolchain(format!(
                    "sub tool '{}' of '{}' was not registered",
                    name, parent.name
                ))
            });
        } else {
            from_path(name)?
        };

        self.remember(name, handle.clone());
        Ok(handle)
    }

    fn remember(&self, name: &str, handle: ToolHandle) {
        self.resolved
            .borrow_mut()
            .insert(name.to_ascii_lowercase(), handle);
    }

    fn provision(&self, desc: &ToolDescriptor, services: &Services<'_>) -> Result<ToolHandle> {
        if let Some(path) = &desc.path {
            return system_tool(desc, path);
        }

        let full_name = desc.full_name();
        let install_dir = desc
            .root_dir
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| self.tools_dir.join(&full_name));
        let tool_path = install_dir.join(self.sub_path(desc));

        if !tool_path.exists() {
            if let Some(git) = &desc.git {
                self.install_from_git(desc, git, &install_dir, services)?;
            } else {
                self.install_from_package(desc, &install_dir, services)?;
                if let Some(hook) = self.hooks.find(&desc.name, self.platform) {
                    hook(&HookContext {
                        tool: desc,
                        install_dir: &install_dir,
                        runner: services.runner,
                    })?;
                }
            }
        } else {
            debug!("Tool {} already installed in {}", full_name, install_dir.display());
        }

        if !tool_path.exists() {
            return Err(ForgeError::Toolchain(format!(
                "tool {} not found at {} after installation",
                full_name,
                tool_path.display()
            )));
        }
        add_execute_permission(&tool_path)
            .map_err(|e| ForgeError::io(format!("chmod {}", tool_path.display()), e))?;

        for (sub_name, rel) in &desc.sub_tools {
            let sub_path = install_dir.join(rel);
            if sub_path.exists() {
                add_execute_permission(&sub_path)
                    .map_err(|e| ForgeError::io(format!("chmod {}", sub_path.display()), e))?;
            } else {
                warn!("Sub tool {} missing at {}", sub_name, sub_path.display());
            }
            self.remember(
                sub_name,
                ToolHandle {
                    name: sub_name.clone(),
                    path: sub_path,
                    base_dir: install_dir.clone(),
                    version: desc.version.clone(),
                },
            );
        }

        Ok(ToolHandle {
            name: desc.name.clone(),
            path: tool_path,
            base_dir: install_dir,
            version: desc.version.clone(),
        })
    }

    fn sub_path(&self, desc: &ToolDescriptor) -> String {
        desc.sub_path
            .clone()
            .unwrap_or_else(|| format!("{}{}", desc.name, self.platform.exe_suffix()))
    }

    /// Explicit URLs and mirror URLs, mirrors first when prioritized.
    pub fn candidate_urls(&self, desc: &ToolDescriptor) -> Vec<String> {
        let full_name = desc.full_name();
        let mirrors: Vec<String> = self
            .mirrors
            .iter()
            .flat_map(|base| {
                ["7z", "tar.xz"]
                    .map(|ext| format!("{}tools/{}-{}.{}", base, full_name, self.platform, ext))
            })
            .collect();

        if self.prioritize_mirrors {
            mirrors.into_iter().chain(desc.urls.iter().cloned()).collect()
        } else {
            desc.urls.iter().cloned().chain(mirrors).collect()
        }
    }

    fn install_from_package(
        &self,
        desc: &ToolDescriptor,
        install_dir: &Path,
        services: &Services<'_>,
    ) -> Result<()> {
        let urls = self.candidate_urls(desc);
        let url = services.downloader.first_reachable(&urls).ok_or_else(|| {
            ForgeError::Toolchain(format!(
                "no reachable package for tool {} (tried {})",
                desc.full_name(),
                urls.join(", ")
            ))
        })?;

        let file_name = url.rsplit(['/', '\\']).next().unwrap_or(url);
        let package = self.tools_dir.join(file_name);
        if package.exists() {
            info!("Using already downloaded package {}", package.display());
        } else {
            services.downloader.fetch(url, &package)?;
        }

        let archive = self.archive_for(desc, &package, services)?;
        extract_to(&archive, &package, install_dir)
    }

    fn archive_for(
        &self,
        desc: &ToolDescriptor,
        package: &Path,
        services: &Services<'_>,
    ) -> Result<ArchiveService> {
        if Format::detect(package).is_native() {
            return Ok(services.archive.clone());
        }
        if desc.name.eq_ignore_ascii_case(ARCHIVER_TOOL) {
            return Err(ForgeError::Toolchain(format!(
                "the {} archiver cannot be installed from {}",
                ARCHIVER_TOOL,
                package.display()
            )));
        }
        let archiver = self.resolve(ARCHIVER_TOOL, services)?;
        Ok(services.archive.clone().with_archiver(archiver.path))
    }

    fn install_from_git(
        &self,
        desc: &ToolDescriptor,
        git: &str,
        install_dir: &Path,
        services: &Services<'_>,
    ) -> Result<()> {
        if install_dir.exists() {
            return Err(ForgeError::Toolchain(format!(
                "{} exists but does not contain {}",
                install_dir.display(),
                desc.name
            )));
        }
        let source = vcs_source(git);
        services.downloader.fetch(&source, install_dir)?;

        let snapshot = format!(
            "{}-{}-{}.{}",
            desc.full_name(),
            chrono::Local::now().format("%Y%m%d"),
            self.platform,
            self.platform.package_extension()
        );
        let archive = match self.archive_for(desc, Path::new(&snapshot), services) {
            Ok(archive) => archive,
            Err(e) => {
                warn!("Skipping tool snapshot {}: {}", snapshot, e);
                return Ok(());
            }
        };
        info!("Creating tool package {}...", snapshot);
        if let Err(e) = archive.package(install_dir, &self.tools_dir, &snapshot) {
            warn!("Failed to create tool package {}: {}", snapshot, e);
        }
        Ok(())
    }
}

fn system_tool(desc: &ToolDescriptor, path: &str) -> Result<ToolHandle> {
    if !desc.sub_tools.is_empty() {
        return Err(ForgeError::Configuration(format!(
            "system tool '{}' cannot declare sub tools",
            desc.name
        )));
    }
    let path = PathBuf::from(path);
    if !path.exists() {
        return Err(ForgeError::Toolchain(format!(
            "system tool {} not found at {}",
            desc.name,
            path.display()
        )));
    }
    let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
    Ok(ToolHandle {
        name: desc.name.clone(),
        path,
        base_dir,
        version: desc.version.clone(),
    })
}

fn from_path(name: &str) -> Result<ToolHandle> {
    let path = which::which(name).map_err(|_| {
        ForgeError::Toolchain(format!(
            "tool '{}' is not configured and not found in PATH",
            name
        ))
    })?;
    debug!("Using {} from PATH: {}", name, path.display());
    let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
    Ok(ToolHandle {
        name: name.to_string(),
        path,
        base_dir,
        version: None,
    })
}

/// Downloader reference for a configured git URL.
pub(crate) fn vcs_source(url: &str) -> String {
    if depforge_fetch::download::vcs::parse_reference(url).is_some() {
        url.to_string()
    } else {
        format!("git+{}", url)
    }
}

/// Extract `package` so that its content ends up exactly at `target`.
///
/// Extraction happens in a private dir next to `target`, so packages of
/// loose files land under `target` as well.
pub(crate) fn extract_to(archive: &ArchiveService, package: &Path, target: &Path) -> Result<()> {
    if target.exists() {
        return Err(ArchiveError::Collision(target.to_path_buf()).into());
    }
    let (parent, name) = split_dir(target)?;
    let staging = parent.join(format!(".{}.staging", name));
    remove_dir_if_exists(&staging)
        .map_err(|e| ForgeError::io(format!("remove {}", staging.display()), e))?;

    let extracted = archive.extract(package, &staging, Some(name))?;
    fs::rename(&extracted, target).map_err(|e| {
        ForgeError::io(
            format!("move {} to {}", extracted.display(), target.display()),
            e,
        )
    })?;
    remove_dir_if_exists(&staging)
        .map_err(|e| ForgeError::io(format!("remove {}", staging.display()), e))?;
    Ok(())
}

fn split_dir(dir: &Path) -> Result<(&Path, &str)> {
    let parent = dir.parent();
    let name = dir.file_name().and_then(|n| n.to_str());
    match (parent, name) {
        (Some(parent), Some(name)) => Ok((parent, name)),
        _ => Err(ForgeError::Configuration(format!(
            "invalid extraction target {}",
            dir.display()
        ))),
    }
}

#[cfg(test)]
mod tests;
