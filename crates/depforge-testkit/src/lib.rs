//! Test utilities shared across the depforge workspace.
//!
//! - [`temp_dir_in_workspace`]: scratch directories under `.tmp/`
//! - [`env`]: serialized environment variable overrides
//! - [`fixtures`]: source archives, fake toolchains and fake tools
//! - [`mock`]: one mockito server shared by every test thread

pub mod env;
pub mod fixtures;
pub mod mock;

pub use env::with_isolated_env;
pub use fixtures::{
    FakeToolchain, write_fake_executable, write_source_tar_gz, write_source_tar_xz,
    write_source_zip,
};
pub use mock::get_shared_mock_server;

use tempfile::TempDir;

/// Creates a temporary directory within `.tmp/` at the current directory.
///
/// Keeping every scratch tree under one gitignored folder makes leftovers
/// from aborted runs easy to find.
///
/// # Panics
///
/// Panics if the current directory is unknown or `.tmp/` cannot be created.
///
/// ```rust
/// use depforge_testkit::temp_dir_in_workspace;
///
/// let temp = temp_dir_in_workspace();
/// std::fs::write(temp.path().join("depforge.toml"), "").unwrap();
/// ```
pub fn temp_dir_in_workspace() -> TempDir {
    try_temp_dir_in_workspace().expect("Failed to create temporary directory in .tmp/")
}

/// Fallible variant of [`temp_dir_in_workspace`].
pub fn try_temp_dir_in_workspace() -> std::io::Result<TempDir> {
    let tmp_base = std::env::current_dir()?.join(".tmp");
    std::fs::create_dir_all(&tmp_base)?;
    TempDir::new_in(&tmp_base)
}
