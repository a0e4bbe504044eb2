//! Tools command - provision declared tools

use crate::context::Context;
use anyhow::{Result, bail};
use colored::Colorize;
use std::path::Path;

pub fn run(config: Option<&Path>, root: Option<&Path>, names: Vec<String>) -> Result<()> {
    let ctx = Context::new(config, root, None)?;
    let names = if names.is_empty() {
        ctx.orchestrator
            .tools()
            .descriptors()
            .iter()
            .map(|d| d.name.clone())
            .collect()
    } else {
        names
    };

    if names.is_empty() {
        println!("No tools declared for {}", ctx.orchestrator.platform());
        return Ok(());
    }

    let mut failed = 0;
    for name in &names {
        match ctx.orchestrator.tool(name) {
            Ok(handle) => println!(
                "  {} {} {} {}",
                "✓".green(),
                name.bold(),
                handle.version.as_deref().unwrap_or("-"),
                handle.path.display().to_string().dimmed()
            ),
            Err(e) => {
                failed += 1;
                println!("  {} {} {}", "✗".red(), name.bold(), e);
            }
        }
    }

    if failed > 0 {
        bail!("{} of {} tools could not be provisioned", failed, names.len());
    }
    Ok(())
}
