use super::version::{parse_lenient, probe, version_from_root};
use super::{CompilerCandidate, CompilerKind, Origin};
use crate::error::{ForgeError, Result};
use depforge_core::{CommandRunner, Config, Flavor, Layout};
use log::{debug, warn};
use std::path::{Path, PathBuf};

/// Environment variable naming the MSVC setup script, read once per discovery.
pub const MSVC_SETUP_ENV: &str = "DEPFORGE_MSVC_SETUP";

const VCVARS_RELATIVE: &str = "VC/Auxiliary/Build/vcvarsall.bat";

/// Discovered compiler candidates in discovery order.
#[derive(Debug, Clone, Default)]
pub struct CompilerRegistry {
    candidates: Vec<CompilerCandidate>,
}

impl CompilerRegistry {
    /// Enumerate candidates from, in order: explicit `[[compilers.candidates]]`,
    /// LLVM installed as a library, a `clang` tool entry, the MSVC setup
    /// script (Windows only) and, when `detect_system` is set, `PATH`.
    pub fn discover(config: &Config, layout: &Layout, runner: &dyn CommandRunner) -> Self {
        let msvc_setup = std::env::var_os(MSVC_SETUP_ENV).map(PathBuf::from);
        Self::discover_with(config, layout, runner, msvc_setup)
    }

    pub fn discover_with(
        config: &Config,
        layout: &Layout,
        runner: &dyn CommandRunner,
        msvc_setup: Option<PathBuf>,
    ) -> Self {
        let platform = layout.platform();
        let mut found = Vec::new();

        for entry in &config.compilers.candidates {
            match entry.kind.parse::<CompilerKind>() {
                Ok(kind) => found.push(
                    CompilerCandidate::new(kind, Origin::Toolchain, &entry.root_dir)
                        .with_version(entry.version.as_deref().and_then(parse_lenient)),
                ),
                Err(e) => warn!(
                    "Ignoring compiler candidate {}: {}",
                    entry.root_dir.display(),
                    e
                ),
            }
        }

        let llvm_libs: Vec<_> = config
            .libraries
            .iter()
            .filter(|lib| lib.name.eq_ignore_ascii_case("llvm"))
            .collect();
        for kind_name in config.compilers.supported(platform) {
            let flavor = Flavor::new(platform, kind_name.as_str());
            for lib in &llvm_libs {
                let dir = layout.install_path(&flavor, &lib.key(platform));
                if dir.is_dir() {
                    found.push(
                        CompilerCandidate::new(CompilerKind::Clang, Origin::Toolchain, dir)
                            .with_version(parse_lenient(lib.version_for(platform))),
                    );
                }
            }
        }

        for tool in config
            .tools_for(platform)
            .iter()
            .filter(|t| t.name.eq_ignore_ascii_case("clang"))
        {
            let root = tool
                .root_dir
                .as_ref()
                .map(PathBuf::from)
                .unwrap_or_else(|| layout.tools_dir().join(tool.full_name()));
            found.push(
                CompilerCandidate::new(CompilerKind::Clang, Origin::Toolchain, root)
                    .with_version(tool.version.as_deref().and_then(parse_lenient)),
            );
        }

        if platform.is_windows() {
            let setup = msvc_setup.or_else(|| {
                config
                    .compilers
                    .msvc_install_paths
                    .iter()
                    .map(|dir| Path::new(dir).join(VCVARS_RELATIVE))
                    .find(|script| script.is_file())
            });
            match setup {
                Some(script) => found.push(CompilerCandidate::msvc(script)),
                None => debug!("No MSVC setup script found"),
            }
        }

        if config.compilers.detect_system {
            for kind in [CompilerKind::Clang, CompilerKind::Gcc, CompilerKind::Emcc] {
                let (_, cxx) = kind.drivers();
                let Ok(exe) = which::which(cxx) else {
                    continue;
                };
                let root = match kind {
                    CompilerKind::Emcc => exe.parent(),
                    _ => exe.parent().and_then(Path::parent),
                };
                if let Some(root) = root {
                    found.push(CompilerCandidate::new(kind, Origin::System, root));
                }
            }
        }

        let mut candidates: Vec<CompilerCandidate> = Vec::new();
        for mut candidate in found {
            candidate.discover(platform);
            if candidate.version.is_none() {
                candidate.version = version_from_root(&candidate.root_dir);
            }
            if candidate.version.is_none()
                && candidate.kind != CompilerKind::Msvc
                && candidate.cxx.is_file()
            {
                candidate.version = probe(runner, &candidate.cxx);
            }
            candidate.validate();

            let duplicate = candidates
                .iter()
                .any(|c| c.kind == candidate.kind && c.primary_executable() == candidate.primary_executable());
            if duplicate {
                continue;
            }
            debug!(
                "Found compiler {} in {} ({:?})",
                candidate.name(),
                candidate.root_dir.display(),
                candidate.state
            );
            candidates.push(candidate);
        }

        Self { candidates }
    }

    /// Registry over already validated candidates.
    pub fn from_candidates(candidates: Vec<CompilerCandidate>) -> Self {
        Self { candidates }
    }

    pub fn candidates(&self) -> &[CompilerCandidate] {
        &self.candidates
    }

    /// All candidates, best score first for `requested`.
    pub fn ranked(&self, requested: Option<CompilerKind>) -> Vec<&CompilerCandidate> {
        let mut ranked: Vec<_> = self.candidates.iter().collect();
        ranked.sort_by_key(|c| std::cmp::Reverse(c.score(requested)));
        ranked
    }

    /// Highest scoring available candidate of `kind`. On equal scores the
    /// first discovered wins.
    pub fn select(&self, kind: CompilerKind) -> Result<&CompilerCandidate> {
        let selected = self
            .candidates
            .iter()
            .filter(|c| c.kind == kind && c.is_available())
            .rev()
            .max_by_key(|c| c.score(Some(kind)))
            .ok_or_else(|| {
                ForgeError::Toolchain(format!("no available {} compiler found", kind))
            })?;
        debug!(
            "Selecting compiler {} (in {})",
            selected.name(),
            selected.root_dir.display()
        );
        Ok(selected)
    }
}
