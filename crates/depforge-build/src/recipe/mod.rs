//! Build recipes.
//!
//! A [`Recipe`] turns an extracted source tree into a populated install
//! prefix for one named library. Recipes are registered by name in a
//! [`RecipeRegistry`] and dispatch on the platform themselves through
//! [`Recipe::build_on_linux`] and [`Recipe::build_on_windows`].
//!
//! Recipes never depend on each other implicitly. A library that needs
//! another one asks for its install dir with [`RecipeContext::library_dir`]
//! and wires it up through explicit flags.

pub mod builtin;
mod context;
mod registry;

pub use context::{DEFAULT_TOOL_ENVS, RecipeContext, cmake_path};
pub use registry::RecipeRegistry;

use crate::error::Result;
use depforge_core::{LibraryDescriptor, Platform};
use std::path::Path;

pub trait Recipe: Send + Sync {
    /// Library name the recipe is registered under.
    fn name(&self) -> &str;

    fn supports(&self, platform: Platform) -> bool {
        let _ = platform;
        true
    }

    fn build_on_linux(
        &self,
        ctx: &mut RecipeContext<'_>,
        build_dir: &Path,
        prefix: &Path,
        desc: &LibraryDescriptor,
    ) -> Result<()>;

    fn build_on_windows(
        &self,
        ctx: &mut RecipeContext<'_>,
        build_dir: &Path,
        prefix: &Path,
        desc: &LibraryDescriptor,
    ) -> Result<()>;
}

/// Run the branch of `recipe` matching the context's platform.
pub fn build(
    recipe: &dyn Recipe,
    ctx: &mut RecipeContext<'_>,
    build_dir: &Path,
    prefix: &Path,
    desc: &LibraryDescriptor,
) -> Result<()> {
    match ctx.platform() {
        Platform::Linux => recipe.build_on_linux(ctx, build_dir, prefix, desc),
        Platform::Windows => recipe.build_on_windows(ctx, build_dir, prefix, desc),
    }
}
