//! History command - show recorded builds

use crate::context::Context;
use anyhow::Result;
use colored::Colorize;
use indicatif::HumanDuration;
use std::path::Path;
use std::time::Duration;

pub fn run(config: Option<&Path>, root: Option<&Path>, limit: usize) -> Result<()> {
    let ctx = Context::new(config, root, None)?;
    let state = ctx.orchestrator.history();

    if state.builds.is_empty() {
        println!("No builds recorded in {}", ctx.root.display());
        return Ok(());
    }

    for record in state.builds.iter().rev().take(limit) {
        println!(
            "{} {} {} {}{}",
            record.started_at.format("%Y-%m-%d %H:%M:%S").to_string().dimmed(),
            record.key.bold(),
            record.flavor,
            HumanDuration(Duration::from_millis(record.duration_ms)),
            if record.packaged { "" } else { " (not packaged)" }
        );
    }
    Ok(())
}
