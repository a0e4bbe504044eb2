//! Build orchestration for depforge.
//!
//! - [`compiler`]: compiler discovery, ranking and build environments
//! - [`tools`]: provisioning of the tools needed before any build
//! - [`recipe`]: per-library build procedures and the context they run in
//! - [`orchestrator`]: cache lookup, source builds and packaging
//! - [`env`]: environment snapshots handed to build commands

pub mod compiler;
pub mod env;
pub mod error;
pub mod orchestrator;
pub mod recipe;
pub mod tools;

pub use compiler::{CompilerCandidate, CompilerKind, CompilerRegistry};
pub use env::BuildEnv;
pub use error::{ForgeError, Result};
pub use orchestrator::{
    BatchReport, BuildContext, Orchestrator, OrchestratorBuilder, Outcome, Resolution,
    ResolveOptions,
};
pub use recipe::{Recipe, RecipeContext, RecipeRegistry};
pub use tools::{ToolHandle, ToolProvisioner};
