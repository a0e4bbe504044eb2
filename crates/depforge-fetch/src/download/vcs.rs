use crate::error::DownloadError;
use depforge_core::CommandRunner;
use depforge_core::process::describe;
use log::info;
use std::path::Path;
use std::process::Command;

/// Version-control system named by a source reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vcs {
    Git,
    Mercurial,
}

impl Vcs {
    fn program(self) -> &'static str {
        match self {
            Vcs::Git => "git",
            Vcs::Mercurial => "hg",
        }
    }
}

/// Split a VCS reference into its system and the URL the client expects.
///
/// `git+https://host/repo.git` drops the `git+` marker; `git@` and `hg@`
/// references are passed through unchanged.
pub fn parse_reference(source: &str) -> Option<(Vcs, &str)> {
    if let Some(rest) = source.strip_prefix("git+") {
        Some((Vcs::Git, rest))
    } else if source.starts_with("git@") {
        Some((Vcs::Git, source))
    } else if source.starts_with("hg@") {
        Some((Vcs::Mercurial, source))
    } else {
        None
    }
}

pub(crate) fn clone(
    runner: &dyn CommandRunner,
    vcs: Vcs,
    url: &str,
    dest: &Path,
) -> Result<(), DownloadError> {
    let mut cmd = Command::new(vcs.program());
    cmd.arg("clone").arg(url).arg(dest);
    run(runner, &mut cmd)
}

/// Update an existing working copy in place.
pub fn pull(runner: &dyn CommandRunner, vcs: Vcs, repo_dir: &Path) -> Result<(), DownloadError> {
    let mut cmd = Command::new(vcs.program());
    cmd.arg("pull").current_dir(repo_dir);
    run(runner, &mut cmd)
}

fn run(runner: &dyn CommandRunner, cmd: &mut Command) -> Result<(), DownloadError> {
    let command = describe(cmd);
    info!("Running {}", command);
    let status = runner
        .status(cmd)
        .map_err(|e| DownloadError::io(format!("spawn `{}`", command), e))?;
    if status.success() {
        Ok(())
    } else {
        Err(DownloadError::Vcs {
            command,
            code: status.code(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_reference() {
        assert_eq!(
            parse_reference("git+https://github.com/madler/zlib.git"),
            Some((Vcs::Git, "https://github.com/madler/zlib.git"))
        );
        assert_eq!(
            parse_reference("git@github.com:lz4/lz4.git"),
            Some((Vcs::Git, "git@github.com:lz4/lz4.git"))
        );
        assert_eq!(
            parse_reference("hg@hg.example.org/repo"),
            Some((Vcs::Mercurial, "hg@hg.example.org/repo"))
        );
        assert_eq!(parse_reference("https://zlib.net/zlib-1.3.tar.gz"), None);
    }
}
