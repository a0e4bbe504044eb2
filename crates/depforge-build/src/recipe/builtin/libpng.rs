use crate::error::Result;
use crate::recipe::{Recipe, RecipeContext, RecipeRegistry, cmake_path};
use depforge_core::LibraryDescriptor;
use std::path::Path;

pub fn register(registry: &mut RecipeRegistry) {
    registry.register(LibpngRecipe);
}

/// libpng against the static zlib built by depforge.
pub struct LibpngRecipe;

impl LibpngRecipe {
    fn build(
        ctx: &mut RecipeContext<'_>,
        build_dir: &Path,
        prefix: &Path,
        zlib_file: &str,
    ) -> Result<()> {
        let zlib_dir = cmake_path(&ctx.library_dir("zlib")?);
        let flags = [
            format!("-DZLIB_LIBRARY={}/lib/{}", zlib_dir, zlib_file),
            format!("-DZLIB_INCLUDE_DIR={}/include", zlib_dir),
        ];
        ctx.run_cmake(build_dir, prefix, Some("."), &flags)?;
        ctx.run_ninja(build_dir)
    }
}

impl Recipe for LibpngRecipe {
    fn name(&self) -> &str {
        "libpng"
    }

    fn build_on_linux(
        &self,
        ctx: &mut RecipeContext<'_>,
        build_dir: &Path,
        prefix: &Path,
        _desc: &LibraryDescriptor,
    ) -> Result<()> {
        Self::build(ctx, build_dir, prefix, "libz.a")
    }

    // Does not build with clang on Windows.
    fn build_on_windows(
        &self,
        ctx: &mut RecipeContext<'_>,
        build_dir: &Path,
        prefix: &Path,
        _desc: &LibraryDescriptor,
    ) -> Result<()> {
        Self::build(ctx, build_dir, prefix, "zlibstatic.lib")
    }
}
