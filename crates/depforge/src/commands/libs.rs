//! Libs command - install libraries from cache or source

use crate::cli::LibsArgs;
use crate::context::Context;
use anyhow::{Result, bail};
use colored::Colorize;
use depforge_build::{BatchReport, Outcome, Resolution, ResolveOptions};
use std::path::Path;

pub fn run(config: Option<&Path>, root: Option<&Path>, args: LibsArgs) -> Result<()> {
    let ctx = Context::new(config, root, args.compiler.as_deref())?;
    let opts = ResolveOptions {
        rebuild: args.rebuild,
        append: args.append,
        keep_build: args.keep_build,
        use_existing_src: args.use_existing_src,
        preview: args.preview,
    };

    println!(
        "{} Resolving {} for {}",
        "→".cyan(),
        args.names.join(", "),
        ctx.orchestrator.flavor()
    );
    let report = ctx.orchestrator.resolve_all(&args.names, &opts)?;
    render_report(&report);

    let failed = report.failed().count();
    if failed > 0 {
        bail!("{} of {} dependencies failed", failed, report.results.len());
    }
    Ok(())
}

fn render_report(report: &BatchReport) {
    println!();
    for (name, result) in &report.results {
        match result {
            Ok(outcome) => {
                println!("  {} {} {}", "✓".green(), name.bold(), describe(outcome).dimmed());
                if let Some(warning) = &outcome.packaging_warning {
                    println!("    {} {}", "⚠".yellow(), warning);
                }
            }
            Err(e) => println!("  {} {} {}", "✗".red(), name.bold(), e),
        }
    }
}

fn describe(outcome: &Outcome) -> String {
    match &outcome.resolution {
        Resolution::AlreadyInstalled => format!("already installed in {}", outcome.install_dir.display()),
        Resolution::ExtractedFromCache { from_mirror, .. } => {
            let origin = if *from_mirror { "mirror" } else { "local cache" };
            format!("extracted from {} into {}", origin, outcome.install_dir.display())
        }
        Resolution::Built { duration, packaged } => format!(
            "built in {:.1}s{}",
            duration.as_secs_f64(),
            if *packaged { ", packaged" } else { "" }
        ),
        Resolution::Previewed { source_dir } => {
            format!("sources ready in {}", source_dir.display())
        }
    }
}
