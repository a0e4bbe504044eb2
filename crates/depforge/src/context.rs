//! Global context for CLI commands

use crate::output::render_progress;
use anyhow::{Context as _, Result};
use depforge_build::Orchestrator;
use depforge_core::Config;
use depforge_core::config::CONFIG_FILE_NAME;
use log::debug;
use std::env;
use std::path::{Path, PathBuf};

/// Loaded configuration and the orchestrator built from it
pub struct Context {
    pub root: PathBuf,
    pub orchestrator: Orchestrator,
}

impl Context {
    /// Load the merged configuration and build an orchestrator
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The config file does not exist or cannot be parsed
    /// - The catalog is invalid
    /// - `compiler` is not supported on this platform
    pub fn new(config: Option<&Path>, root: Option<&Path>, compiler: Option<&str>) -> Result<Self> {
        let root = match root {
            Some(root) => root.to_path_buf(),
            None => env::current_dir().context("Failed to read current directory")?,
        };
        let config_path = config
            .map(Path::to_path_buf)
            .unwrap_or_else(|| root.join(CONFIG_FILE_NAME));

        debug!("Loading configuration from {}", config_path.display());
        let home = dirs::home_dir();
        let config = Config::load_merged(&config_path, &root, home.as_deref())?;

        let mut builder = Orchestrator::builder(config, &root).progress(render_progress);
        if let Some(home) = home {
            builder = builder.home_dir(home);
        }
        if let Some(kind) = compiler {
            builder = builder.compiler(kind);
        }

        Ok(Self {
            root,
            orchestrator: builder.build()?,
        })
    }
}
