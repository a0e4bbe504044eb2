use crate::error::Result;
use crate::recipe::{Recipe, RecipeContext, RecipeRegistry};
use depforge_core::LibraryDescriptor;
use std::path::Path;

pub fn register(registry: &mut RecipeRegistry) {
    registry.register(Lz4Recipe);
}

/// Upstream lz4 only ships a Makefile; this CMake project builds the same
/// static library.
const CMAKE_LISTS: &str = r#"cmake_minimum_required(VERSION 3.13)

project(lz4 C)

set(LZ4_SOURCES
    lz4.c
    lz4hc.c
    lz4frame.c
    lz4file.c
    xxhash.c
)

add_library(lz4_static STATIC ${LZ4_SOURCES})

set_target_properties(lz4_static PROPERTIES
    OUTPUT_NAME lz4_static
    POSITION_INDEPENDENT_CODE ON
)

target_include_directories(lz4_static
    PUBLIC
        $<BUILD_INTERFACE:${CMAKE_CURRENT_SOURCE_DIR}>
        $<INSTALL_INTERFACE:include>
)

target_compile_definitions(lz4_static
    PRIVATE XXH_NAMESPACE=LZ4_
)

if(NOT MSVC)
    target_compile_options(lz4_static PRIVATE -O3)
endif()

install(TARGETS lz4_static
    ARCHIVE DESTINATION lib
)

install(FILES
    lz4.h
    lz4hc.h
    lz4frame.h
    lz4frame_static.h
    lz4file.h
    DESTINATION include
)
"#;

const OUT_DIR: &str = "release_build";

pub struct Lz4Recipe;

impl Lz4Recipe {
    fn build(ctx: &mut RecipeContext<'_>, build_dir: &Path, prefix: &Path) -> Result<()> {
        ctx.write_text_file(&build_dir.join("lib").join("CMakeLists.txt"), CMAKE_LISTS)?;
        let flags = ["-S", "lib", "-B", OUT_DIR, "-DBUILD_SHARED_LIBS=OFF"].map(String::from);
        ctx.run_cmake(build_dir, prefix, None, &flags)?;
        ctx.run_ninja(&build_dir.join(OUT_DIR))
    }
}

impl Recipe for Lz4Recipe {
    fn name(&self) -> &str {
        "lz4"
    }

    fn build_on_linux(
        &self,
        ctx: &mut RecipeContext<'_>,
        build_dir: &Path,
        prefix: &Path,
        _desc: &LibraryDescriptor,
    ) -> Result<()> {
        Self::build(ctx, build_dir, prefix)
    }

    fn build_on_windows(
        &self,
        ctx: &mut RecipeContext<'_>,
        build_dir: &Path,
        prefix: &Path,
        _desc: &LibraryDescriptor,
    ) -> Result<()> {
        Self::build(ctx, build_dir, prefix)
    }
}
