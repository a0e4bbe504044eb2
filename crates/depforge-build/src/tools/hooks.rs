//! Post-install hooks, keyed by tool name and platform.

use crate::error::{ForgeError, Result};
use depforge_core::process::describe;
use depforge_core::{CommandRunner, Platform, ToolDescriptor};
use log::info;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::process::Command;

pub struct HookContext<'a> {
    pub tool: &'a ToolDescriptor,
    pub install_dir: &'a Path,
    pub runner: &'a dyn CommandRunner,
}

pub type PostInstallHook = fn(&HookContext<'_>) -> Result<()>;

#[derive(Default)]
pub struct HookRegistry {
    hooks: HashMap<(String, Platform), PostInstallHook>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("git", Platform::Windows, git_windows);
        registry
    }

    pub fn register(&mut self, tool: &str, platform: Platform, hook: PostInstallHook) {
        self.hooks.insert((tool.to_ascii_lowercase(), platform), hook);
    }

    pub fn find(&self, tool: &str, platform: Platform) -> Option<PostInstallHook> {
        self.hooks
            .get(&(tool.to_ascii_lowercase(), platform))
            .copied()
    }
}

const GIT_POST_INSTALL: &str = "post-install.bat";

/// Portable Git ships a `post-install.bat` that deletes itself; strip that
/// line, run it through `git-cmd.exe`, then remove it.
fn git_windows(ctx: &HookContext<'_>) -> Result<()> {
    let script = ctx.install_dir.join(GIT_POST_INSTALL);
    if !script.is_file() {
        return Err(ForgeError::Toolchain(format!(
            "git post-install script {} not found",
            script.display()
        )));
    }

    let content = fs::read_to_string(&script)
        .map_err(|e| ForgeError::io(format!("read {}", script.display()), e))?;
    let kept: Vec<&str> = content
        .lines()
        .filter(|line| line.trim() != "@DEL post-install.bat")
        .collect();
    fs::write(&script, kept.join("\n"))
        .map_err(|e| ForgeError::io(format!("write {}", script.display()), e))?;

    info!("Running git post-install script...");
    let mut cmd = Command::new(ctx.install_dir.join("git-cmd.exe"));
    cmd.args([
        "--no-needs-console",
        "--hide",
        "--no-cd",
        "--command=post-install.bat",
    ])
    .current_dir(ctx.install_dir);

    let command = describe(&cmd);
    let status = ctx
        .runner
        .status(&mut cmd)
        .map_err(|e| ForgeError::io(format!("spawn `{}`", command), e))?;
    if !status.success() {
        return Err(ForgeError::Build {
            command,
            code: status.code(),
        });
    }

    fs::remove_file(&script)
        .map_err(|e| ForgeError::io(format!("remove {}", script.display()), e))
}
