//! Dependency resolution.
//!
//! The [`Orchestrator`] turns a library name into an installed tree under
//! `libraries/{platform}_{compiler}/{name}-{version}`:
//!
//! 1. an existing install dir is used as is,
//! 2. otherwise a cache package is extracted (local first, then mirrors),
//! 3. otherwise the sources are fetched, the library's recipe is run and
//!    the resulting prefix is packaged for the next time.
//!
//! Purge, build and packaging of one key run under an advisory file lock,
//! so separate processes working on the same key wait for each other.

mod cache;
mod source;

pub use source::BuildContext;

use crate::compiler::{CompilerCandidate, CompilerKind, CompilerRegistry};
use crate::error::{ForgeError, Result};
use crate::recipe::{self, DEFAULT_TOOL_ENVS, RecipeContext, RecipeRegistry};
use crate::tools::{HookRegistry, Services, ToolHandle, ToolProvisioner};
use chrono::Utc;
use depforge_core::fsutil::{expand_placeholders, remove_dir_if_exists};
use depforge_core::lock::{PACKAGE_LOCK_TIMEOUT, acquire_lock};
use depforge_core::state::{BuildRecord, State};
use depforge_core::{
    Catalog, CommandRunner, Config, Flavor, Layout, LibraryDescriptor, PackageKey, Platform,
    SystemRunner,
};
use depforge_fetch::{ArchiveService, DownloadOptions, Downloader, Progress};
use log::{debug, error, info, warn};
use std::cell::OnceCell;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Per-run switches, mirroring the `libs` command flags.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolveOptions {
    /// Purge the install dir and cache package, then build from source.
    pub rebuild: bool,
    /// Build into an existing install dir instead of skipping it.
    pub append: bool,
    /// Keep the build dir after the build.
    pub keep_build: bool,
    /// Reuse an existing source dir instead of fetching again.
    pub use_existing_src: bool,
    /// Only prepare the sources.
    pub preview: bool,
}

/// How a dependency was satisfied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    AlreadyInstalled,
    ExtractedFromCache { artifact: PathBuf, from_mirror: bool },
    Built { duration: Duration, packaged: bool },
    Previewed { source_dir: PathBuf },
}

#[derive(Debug, Clone)]
pub struct Outcome {
    pub name: String,
    pub key: PackageKey,
    pub install_dir: PathBuf,
    pub resolution: Resolution,
    /// Set when the build succeeded but no cache package was written.
    pub packaging_warning: Option<String>,
}

/// Per-dependency results of a batch, in processing order.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub results: Vec<(String, Result<Outcome>)>,
}

impl BatchReport {
    pub fn succeeded(&self) -> impl Iterator<Item = &Outcome> {
        self.results.iter().filter_map(|(_, r)| r.as_ref().ok())
    }

    pub fn failed(&self) -> impl Iterator<Item = (&str, &ForgeError)> {
        self.results
            .iter()
            .filter_map(|(name, r)| r.as_ref().err().map(|e| (name.as_str(), e)))
    }

    pub fn is_success(&self) -> bool {
        self.results.iter().all(|(_, r)| r.is_ok())
    }
}

pub struct OrchestratorBuilder {
    config: Config,
    root: PathBuf,
    platform: Option<Platform>,
    runner: Arc<dyn CommandRunner>,
    recipes: Option<RecipeRegistry>,
    compiler: Option<String>,
    progress: Option<fn(&Progress)>,
    hooks: Option<HookRegistry>,
    home_dir: Option<PathBuf>,
}

impl OrchestratorBuilder {
    /// Target platform; defaults to the host.
    pub fn platform(mut self, platform: Platform) -> Self {
        self.platform = Some(platform);
        self
    }

    pub fn runner(mut self, runner: Arc<dyn CommandRunner>) -> Self {
        self.runner = runner;
        self
    }

    /// Recipes to use instead of the builtin ones.
    pub fn recipes(mut self, recipes: RecipeRegistry) -> Self {
        self.recipes = Some(recipes);
        self
    }

    /// Compiler kind to build with; defaults to the platform default of
    /// the `[compilers]` section.
    pub fn compiler(mut self, kind: impl Into<String>) -> Self {
        self.compiler = Some(kind.into());
        self
    }

    pub fn progress(mut self, callback: fn(&Progress)) -> Self {
        self.progress = Some(callback);
        self
    }

    pub fn hooks(mut self, hooks: HookRegistry) -> Self {
        self.hooks = Some(hooks);
        self
    }

    /// Home directory used to expand `${HOME}` in mirror URLs.
    pub fn home_dir(mut self, home: impl Into<PathBuf>) -> Self {
        self.home_dir = Some(home.into());
        self
    }

    pub fn build(self) -> Result<Orchestrator> {
        let platform = match self.platform {
            Some(platform) => platform,
            None => Platform::current()?,
        };
        let catalog = Catalog::new(self.config.libraries.clone())?;
        let kind = select_kind(&self.config, platform, self.compiler.as_deref())?;

        let layout = Layout::new(&self.root, platform).with_config(&self.config.layout);
        let mut downloader = Downloader::with_runner(
            DownloadOptions::from(&self.config.download),
            Arc::clone(&self.runner),
        )?;
        if let Some(callback) = self.progress {
            downloader = downloader.with_progress(callback);
        }
        let archive = ArchiveService::new(Arc::clone(&self.runner));

        let mirrors: Vec<String> = self
            .config
            .package_urls
            .iter()
            .map(|url| expand_placeholders(url, &self.root, self.home_dir.as_deref()))
            .collect();
        let mut tools = ToolProvisioner::new(
            platform,
            layout.tools_dir(),
            self.config.tools_for(platform).to_vec(),
            mirrors.clone(),
            self.config.prioritize_package_urls,
        );
        if let Some(hooks) = self.hooks {
            tools = tools.with_hooks(hooks);
        }

        debug!(
            "Orchestrator for {} in {} with compiler {}",
            platform,
            self.root.display(),
            kind
        );
        Ok(Orchestrator {
            config: self.config,
            catalog,
            layout,
            runner: self.runner,
            downloader,
            archive,
            recipes: self.recipes.unwrap_or_else(RecipeRegistry::with_builtins),
            tools,
            compilers: OnceCell::new(),
            kind,
            active: OnceCell::new(),
            mirrors,
        })
    }
}

fn select_kind(config: &Config, platform: Platform, requested: Option<&str>) -> Result<CompilerKind> {
    let name = requested.unwrap_or_else(|| config.compilers.default_kind(platform));
    let supported = config.compilers.supported(platform);
    if !supported.iter().any(|s| s.eq_ignore_ascii_case(name)) {
        return Err(ForgeError::Configuration(format!(
            "compiler '{}' is not supported on {} (supported: {})",
            name,
            platform,
            supported.join(", ")
        )));
    }
    name.parse::<CompilerKind>()
        .map_err(|_| ForgeError::Configuration(format!("unknown compiler kind '{}'", name)))
}

/// Resolves dependencies for one platform and compiler flavor.
///
/// Tool and compiler tables are filled lazily on first use and never change
/// afterwards. The orchestrator is single threaded; recipes call back into
/// it through [`RecipeContext`].
pub struct Orchestrator {
    config: Config,
    catalog: Catalog,
    layout: Layout,
    runner: Arc<dyn CommandRunner>,
    downloader: Downloader,
    archive: ArchiveService,
    recipes: RecipeRegistry,
    tools: ToolProvisioner,
    compilers: OnceCell<CompilerRegistry>,
    kind: CompilerKind,
    active: OnceCell<CompilerCandidate>,
    mirrors: Vec<String>,
}

impl Orchestrator {
    pub fn builder(config: Config, root: impl Into<PathBuf>) -> OrchestratorBuilder {
        OrchestratorBuilder {
            config,
            root: root.into(),
            platform: None,
            runner: Arc::new(SystemRunner),
            recipes: None,
            compiler: None,
            progress: None,
            hooks: None,
            home_dir: None,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn platform(&self) -> Platform {
        self.layout.platform()
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn runner(&self) -> &dyn CommandRunner {
        self.runner.as_ref()
    }

    pub fn recipes(&self) -> &RecipeRegistry {
        &self.recipes
    }

    pub fn tools(&self) -> &ToolProvisioner {
        &self.tools
    }

    pub fn compiler_kind(&self) -> CompilerKind {
        self.kind
    }

    /// `{platform}_{compiler}` of every package this orchestrator touches.
    pub fn flavor(&self) -> Flavor {
        Flavor::new(self.platform(), self.kind.as_str())
    }

    /// Discovered compilers, enumerated on first call.
    pub fn compilers(&self) -> &CompilerRegistry {
        self.compilers
            .get_or_init(|| CompilerRegistry::discover(&self.config, &self.layout, self.runner()))
    }

    /// Compiler used for source builds, selected on first call.
    pub fn active_compiler(&self) -> Result<&CompilerCandidate> {
        if let Some(active) = self.active.get() {
            return Ok(active);
        }
        let selected = self.compilers().select(self.kind)?.clone();
        info!(
            "Using compiler {} at {}",
            selected.name(),
            selected.root_dir.display()
        );
        Ok(self.active.get_or_init(|| selected))
    }

    fn services(&self) -> Services<'_> {
        Services {
            downloader: &self.downloader,
            archive: &self.archive,
            runner: self.runner(),
        }
    }

    /// Resolve a tool, provisioning it when needed.
    pub fn tool(&self, name: &str) -> Result<ToolHandle> {
        self.tools.resolve(name, &self.services())
    }

    /// Install dir of a library, resolving it first when missing.
    ///
    /// `requirement` is `name` or `name==version`; an explicit version replaces the
    /// catalog version for this lookup only.
    pub fn library_dir(&self, requirement: &str) -> Result<PathBuf> {
        let desc = self.descriptor_for(requirement)?;
        let dir = self
            .layout
            .install_path(&self.flavor(), &desc.key(self.platform()));

        if !dir.is_dir() {
            info!("Running automatic setup for {}", desc.name);
            self.resolve_descriptor(&desc, &ResolveOptions::default())?;
        }
        if !dir.is_dir() {
            return Err(ForgeError::Configuration(format!(
                "library folder {} does not exist after setup",
                dir.display()
            )));
        }
        Ok(dir)
    }

    fn descriptor_for(&self, requirement: &str) -> Result<LibraryDescriptor> {
        let (name, version) = match requirement.split_once("==") {
            Some((name, version)) => (name.trim(), Some(version.trim())),
            None => (requirement.trim(), None),
        };
        let desc = self.catalog.require(name)?;
        Ok(match version {
            Some(version) if version != desc.version_for(self.platform()) => LibraryDescriptor {
                version: version.to_string(),
                linux_version: None,
                windows_version: None,
                ..desc.clone()
            },
            _ => desc.clone(),
        })
    }

    /// Resolve one library by name.
    pub fn resolve(&self, name: &str, opts: &ResolveOptions) -> Result<Outcome> {
        let desc = self.catalog.require(name)?.clone();
        self.resolve_descriptor(&desc, opts)
    }

    /// Resolve each requested library in order (`all` for the whole catalog).
    ///
    /// Unknown names fail before any work. A failing dependency is reported
    /// and the batch moves on, except for configuration errors which stop it.
    pub fn resolve_all<S: AsRef<str>>(&self, names: &[S], opts: &ResolveOptions) -> Result<BatchReport> {
        let selected: Vec<LibraryDescriptor> =
            self.catalog.select(names)?.into_iter().cloned().collect();

        let mut report = BatchReport::default();
        for desc in &selected {
            let result = self.resolve_descriptor(desc, opts);
            let stop = matches!(&result, Err(e) if e.aborts_batch());
            if let Err(e) = &result {
                error!("Failed to resolve {}: {}", desc.name, e);
            }
            report.results.push((desc.name.clone(), result));
            if stop {
                break;
            }
        }
        Ok(report)
    }

    pub fn resolve_descriptor(&self, desc: &LibraryDescriptor, opts: &ResolveOptions) -> Result<Outcome> {
        let platform = self.platform();
        let flavor = self.flavor();
        let key = desc.key(platform);
        let install_dir = self.layout.install_path(&flavor, &key);
        let outcome = |resolution| Outcome {
            name: desc.name.clone(),
            key: key.clone(),
            install_dir: install_dir.clone(),
            resolution,
            packaging_warning: None,
        };

        if opts.preview {
            let ctx = self.prepare_sources(desc, &key, opts.use_existing_src)?;
            info!("Sources of {} ready in {}", key, ctx.source_dir.display());
            return Ok(outcome(Resolution::Previewed {
                source_dir: ctx.source_dir,
            }));
        }

        let _guard = acquire_lock(
            &self.layout.lock_path(&flavor, &key),
            PACKAGE_LOCK_TIMEOUT,
            &format!("resolve {}", key.qualified(&flavor)),
        )?;

        if opts.rebuild {
            info!("Removing previous build for {}", key);
            self.purge(&flavor, &key)?;
        }

        if install_dir.is_dir() && !opts.append {
            debug!("- {}: OK", key);
            return Ok(outcome(Resolution::AlreadyInstalled));
        }

        if !opts.append {
            let allow_mirror = !opts.rebuild;
            if let Some((artifact, from_mirror)) = self.locate_artifact(&flavor, &key, allow_mirror) {
                self.install_artifact(&artifact, &install_dir)?;
                return Ok(outcome(Resolution::ExtractedFromCache {
                    artifact,
                    from_mirror,
                }));
            }
        }

        let (duration, packaging_warning) = self.build_from_source(desc, &key, &install_dir, opts)?;
        let mut result = outcome(Resolution::Built {
            duration,
            packaged: packaging_warning.is_none(),
        });
        result.packaging_warning = packaging_warning;
        Ok(result)
    }

    /// Fetch sources, run the recipe, package the prefix and clean up.
    /// Returns the build time and the packaging warning, if any.
    fn build_from_source(
        &self,
        desc: &LibraryDescriptor,
        key: &PackageKey,
        install_dir: &Path,
        opts: &ResolveOptions,
    ) -> Result<(Duration, Option<String>)> {
        let platform = self.platform();
        let recipe = self.recipes.lookup(&desc.name, platform)?;
        let compiler = self.active_compiler()?;
        let ctx = self.prepare_sources(desc, key, opts.use_existing_src)?;

        let started_at = Utc::now();
        let timer = Instant::now();
        info!("Building {} in {}", key, ctx.source_dir.display());
        let built = RecipeContext::new(self, compiler, DEFAULT_TOOL_ENVS).and_then(|mut rctx| {
            recipe::build(recipe.as_ref(), &mut rctx, &ctx.source_dir, &ctx.prefix, desc)
        });
        let duration = timer.elapsed();

        if let Err(e) = built {
            error!("Build of {} failed: {}", key, e);
            if !opts.append {
                remove_or_warn(install_dir);
            }
            if !opts.keep_build {
                remove_or_warn(&ctx.source_dir);
            }
            return Err(e);
        }

        let packaging_warning = self.package_prefix(&ctx);
        if !opts.keep_build {
            info!("Removing build folder {}", ctx.source_dir.display());
            remove_or_warn(&ctx.source_dir);
        }
        info!(
            "Done building {} (build time: {:.2} seconds)",
            key,
            duration.as_secs_f64()
        );

        let record = BuildRecord {
            name: desc.name.clone(),
            key: key.to_string(),
            flavor: self.flavor().to_string(),
            started_at,
            duration_ms: u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
            packaged: packaging_warning.is_none(),
        };
        if let Err(e) = State::record(self.layout.state_file(), record) {
            warn!("Failed to record build of {}: {}", key, e);
        }
        Ok((duration, packaging_warning))
    }

    /// Previous builds recorded in the state file.
    pub fn history(&self) -> State {
        State::load_or_empty(self.layout.state_file())
    }
}

fn remove_or_warn(dir: &Path) {
    if let Err(e) = remove_dir_if_exists(dir) {
        warn!("Failed to remove {}: {}", dir.display(), e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config {
            libraries: vec![
                LibraryDescriptor::named("zlib", "1.3"),
                LibraryDescriptor {
                    linux_version: Some("1.6.43".to_string()),
                    ..LibraryDescriptor::named("libpng", "1.6.40")
                },
            ],
            ..Config::default()
        }
    }

    fn orchestrator(platform: Platform) -> Orchestrator {
        Orchestrator::builder(config(), "/work")
            .platform(platform)
            .build()
            .unwrap()
    }

    #[test]
    fn test_default_compiler_follows_platform() {
        assert_eq!(orchestrator(Platform::Linux).flavor().to_string(), "linux_clang");
        assert_eq!(orchestrator(Platform::Windows).flavor().to_string(), "windows_msvc");
    }

    #[test]
    fn test_unsupported_compiler_is_rejected() {
        let err = Orchestrator::builder(config(), "/work")
            .platform(Platform::Linux)
            .compiler("msvc")
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, ForgeError::Configuration(ref m) if m.contains("msvc")));
    }

    #[test]
    fn test_duplicate_library_is_rejected() {
        let mut config = config();
        config.libraries.push(LibraryDescriptor::named("ZLIB", "1.2"));
        let err = Orchestrator::builder(config, "/work")
            .platform(Platform::Linux)
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, ForgeError::Configuration(_)));
    }

    #[test]
    fn test_version_override_requirement() {
        let orch = orchestrator(Platform::Linux);
        assert_eq!(orch.descriptor_for("libpng").unwrap().version_for(Platform::Linux), "1.6.43");
        let pinned = orch.descriptor_for("libpng==1.6.37").unwrap();
        assert_eq!(pinned.version_for(Platform::Linux), "1.6.37");
        assert_eq!(pinned.name, "libpng");
        assert!(matches!(
            orch.descriptor_for("boost==1.84"),
            Err(ForgeError::Configuration(_))
        ));
    }

    #[test]
    fn test_batch_report_counts() {
        let report = BatchReport {
            results: vec![
                (
                    "zlib".to_string(),
                    Ok(Outcome {
                        name: "zlib".to_string(),
                        key: PackageKey::new("zlib", "1.3"),
                        install_dir: PathBuf::from("/work/libraries/linux_clang/zlib-1.3"),
                        resolution: Resolution::AlreadyInstalled,
                        packaging_warning: None,
                    }),
                ),
                (
                    "libpng".to_string(),
                    Err(ForgeError::Toolchain("no clang".to_string())),
                ),
            ],
        };
        assert_eq!(report.succeeded().count(), 1);
        assert_eq!(report.failed().map(|(n, _)| n).collect::<Vec<_>>(), vec!["libpng"]);
        assert!(!report.is_success());
    }
}
