//! Shared model for the depforge build-and-cache orchestrator.
//!
//! This crate owns everything that is pure data or pure filesystem policy:
//!
//! - [`platform`]: the host platform and its naming conventions
//! - [`config`]: `depforge.toml` schema, user overrides and the library catalog
//! - [`key`]: canonical package keys and flavors
//! - [`layout`]: the on-disk directory layout
//! - [`lock`]: advisory file locks used around per-key work
//! - [`state`]: build history persisted in `.depforge/state.json`
//! - [`fsutil`]: idempotent removal and permission helpers
//! - [`process`]: the subprocess seam used by every external command

// Core modules
pub mod config;
pub mod error;
pub mod fsutil;
pub mod key;
pub mod layout;
pub mod lock;
pub mod platform;
pub mod process;
pub mod state;

// Re-export commonly used types
pub use config::{Catalog, Config, LibraryDescriptor, ToolDescriptor};
pub use error::{CoreError, Result};
pub use key::{Flavor, PackageKey};
pub use layout::Layout;
pub use platform::Platform;
pub use process::{CommandRunner, SystemRunner};
