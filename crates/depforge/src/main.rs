mod cli;
mod commands;
mod context;
mod output;

use clap::Parser;
use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let config = cli.config.as_deref();
    let root = cli.root.as_deref();

    let result = match cli.command {
        Commands::Libs(args) => commands::libs::run(config, root, args),
        Commands::Tools { names } => commands::tools::run(config, root, names),
        Commands::Compilers { compiler } => {
            commands::compilers::run(config, root, compiler, cli.verbose)
        }
        Commands::History { limit } => commands::history::run(config, root, limit),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
