use crate::env::BuildEnv;
use crate::error::{ForgeError, Result};
use depforge_core::CommandRunner;
use depforge_core::process::describe;
use log::{debug, info};
use std::collections::BTreeMap;
use std::path::Path;
use std::process::Command;

const ENV_MARKER: &str = "__DEPFORGE_ENV__";

/// Run the vcvars setup script and return `base` updated with every
/// variable the script added or changed.
pub fn capture_environment(
    runner: &dyn CommandRunner,
    setup_script: &Path,
    base: &BuildEnv,
) -> Result<BuildEnv> {
    info!("Initializing MSVC compiler environment...");
    let script_line = format!(
        "\"\"{}\" amd64 && echo {} && set\"",
        setup_script.display(),
        ENV_MARKER
    );

    let mut cmd = Command::new("cmd");
    #[cfg(windows)]
    {
        use std::os::windows::process::CommandExt;
        cmd.raw_arg("/s /c").raw_arg(&script_line);
    }
    #[cfg(not(windows))]
    cmd.args(["/s", "/c", script_line.as_str()]);
    base.apply(&mut cmd);

    let output = runner
        .output(&mut cmd)
        .map_err(|e| ForgeError::io(format!("spawn `{}`", describe(&cmd)), e))?;
    if !output.status.success() {
        return Err(ForgeError::Toolchain(format!(
            "MSVC setup script {} failed with exit code {:?}",
            setup_script.display(),
            output.status.code()
        )));
    }

    let captured = parse_env_dump(&String::from_utf8_lossy(&output.stdout)).ok_or_else(|| {
        ForgeError::Toolchain(format!(
            "no environment dump found in the output of {}",
            setup_script.display()
        ))
    })?;
    Ok(apply_changes(base, &captured))
}

/// `KEY=VALUE` lines printed after the marker line.
fn parse_env_dump(stdout: &str) -> Option<BTreeMap<String, String>> {
    let mut lines = stdout.lines();
    lines.by_ref().find(|line| line.trim_end() == ENV_MARKER)?;

    Some(
        lines
            .filter_map(|line| line.split_once('='))
            .filter(|(key, _)| !key.is_empty())
            .map(|(key, value)| (key.to_string(), value.trim_end().to_string()))
            .collect(),
    )
}

fn apply_changes(base: &BuildEnv, captured: &BTreeMap<String, String>) -> BuildEnv {
    let mut env = base.clone();
    for (key, value) in captured {
        match base.get(key) {
            Some(prev) if prev == value => {}
            Some(prev) => {
                debug!("Updating variable {}: {} -> {}", key, prev, value);
                env.set(key, value.as_str());
            }
            None => env.set(key, value.as_str()),
        }
    }
    env
}
