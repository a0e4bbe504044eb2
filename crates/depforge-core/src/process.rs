//! Subprocess seam.
//!
//! Every external command depforge launches (archivers, VCS clients, build
//! generators, compilers) goes through a [`CommandRunner`], so callers can
//! substitute a recording or scripted runner in tests.

use std::io;
use std::process::{Command, ExitStatus, Output};

pub trait CommandRunner: Send + Sync {
    /// Run to completion with inherited stdio.
    fn status(&self, cmd: &mut Command) -> io::Result<ExitStatus>;

    /// Run to completion capturing stdout and stderr.
    fn output(&self, cmd: &mut Command) -> io::Result<Output>;
}

/// Runs commands on the host.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn status(&self, cmd: &mut Command) -> io::Result<ExitStatus> {
        log::debug!("Running: {}", describe(cmd));
        cmd.status()
    }

    fn output(&self, cmd: &mut Command) -> io::Result<Output> {
        log::debug!("Running: {}", describe(cmd));
        cmd.output()
    }
}

/// Program and arguments joined for log and error messages.
pub fn describe(cmd: &Command) -> String {
    let mut parts = vec![cmd.get_program().to_string_lossy().into_owned()];
    parts.extend(cmd.get_args().map(|a| a.to_string_lossy().into_owned()));
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_joins_program_and_args() {
        let mut cmd = Command::new("cmake");
        cmd.args(["-G", "Ninja", ".."]);
        assert_eq!(describe(&cmd), "cmake -G Ninja ..");
    }
}
