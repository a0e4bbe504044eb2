use crate::error::Result;
use crate::recipe::{Recipe, RecipeContext, RecipeRegistry};
use depforge_core::LibraryDescriptor;
use std::path::Path;

pub fn register(registry: &mut RecipeRegistry) {
    registry.register(ZlibRecipe);
}

pub struct ZlibRecipe;

impl ZlibRecipe {
    fn cmake_ninja(ctx: &mut RecipeContext<'_>, build_dir: &Path, prefix: &Path) -> Result<()> {
        ctx.run_cmake(build_dir, prefix, Some("."), &[])?;
        ctx.run_ninja(build_dir)
    }
}

impl Recipe for ZlibRecipe {
    fn name(&self) -> &str {
        "zlib"
    }

    fn build_on_linux(
        &self,
        ctx: &mut RecipeContext<'_>,
        build_dir: &Path,
        prefix: &Path,
        _desc: &LibraryDescriptor,
    ) -> Result<()> {
        Self::cmake_ninja(ctx, build_dir, prefix)
    }

    fn build_on_windows(
        &self,
        ctx: &mut RecipeContext<'_>,
        build_dir: &Path,
        prefix: &Path,
        _desc: &LibraryDescriptor,
    ) -> Result<()> {
        Self::cmake_ninja(ctx, build_dir, prefix)
    }
}
