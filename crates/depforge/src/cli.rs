//! CLI command structure using clap

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "depforge")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (defaults to depforge.toml in the root dir)
    #[arg(long, global = true, env = "DEPFORGE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Root directory holding libraries, tools and build dirs
    #[arg(long, global = true, env = "DEPFORGE_DIR")]
    pub root: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Install libraries, building them when no package is cached
    Libs(LibsArgs),

    /// Provision tools (all declared tools when no name is given)
    Tools {
        names: Vec<String>,
    },

    /// List discovered compilers, best first
    Compilers {
        /// Rank for this compiler kind instead of the platform default
        #[arg(long)]
        compiler: Option<String>,
    },

    /// Show recorded builds, most recent first
    History {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
}

#[derive(Args)]
pub struct LibsArgs {
    /// Comma-separated library names, or `all`
    #[arg(value_delimiter = ',', required = true)]
    pub names: Vec<String>,

    /// Remove the installed tree and cached package, then build from source
    #[arg(long)]
    pub rebuild: bool,

    /// Build into an already installed tree
    #[arg(long)]
    pub append: bool,

    /// Keep the build directory
    #[arg(long)]
    pub keep_build: bool,

    /// Reuse existing source directories
    #[arg(long)]
    pub use_existing_src: bool,

    /// Only download and extract the sources
    #[arg(long)]
    pub preview: bool,

    /// Compiler kind to build with
    #[arg(long)]
    pub compiler: Option<String>,
}
