//! Compilers command - list discovered compilers

use crate::context::Context;
use anyhow::Result;
use colored::Colorize;
use depforge_build::{CompilerCandidate, CompilerKind};
use std::path::Path;

/// List candidates best first. Always exits 0, availability is reported
/// in the output.
pub fn run(
    config: Option<&Path>,
    root: Option<&Path>,
    compiler: Option<String>,
    verbose: bool,
) -> Result<()> {
    let ctx = Context::new(config, root, compiler.as_deref())?;
    let requested = Some(ctx.orchestrator.compiler_kind());
    let ranked = ctx.orchestrator.compilers().ranked(requested);

    if ranked.is_empty() {
        println!("No compilers found");
        return Ok(());
    }

    for candidate in ranked {
        render_candidate(candidate, requested, verbose);
    }
    Ok(())
}

fn render_candidate(candidate: &CompilerCandidate, requested: Option<CompilerKind>, verbose: bool) {
    let icon = if candidate.is_available() {
        "✓".green()
    } else {
        "✗".red()
    };
    println!(
        "{} {} {}",
        icon,
        candidate.name().bold(),
        candidate.root_dir.display().to_string().dimmed()
    );
    if verbose {
        println!(
            "    state: {:?}, origin: {:?}, score: {}",
            candidate.state,
            candidate.origin,
            candidate.score(requested)
        );
    }
}
