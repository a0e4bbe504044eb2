use depforge_core::CommandRunner;
use log::debug;
use semver::Version;
use std::path::Path;
use std::process::Command;

/// Parse `17`, `17.0`, `v17.0.6` or `14.34.31933-pre` into a semver version.
///
/// Missing components are zero and anything after the third numeric
/// component is ignored.
pub fn parse_lenient(raw: &str) -> Option<Version> {
    let raw = raw.trim().trim_start_matches('v');
    let numeric: String = raw
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();

    let mut parts = numeric.split('.').filter(|p| !p.is_empty());
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next().and_then(|p| p.parse().ok()).unwrap_or(0);
    let patch = parts.next().and_then(|p| p.parse().ok()).unwrap_or(0);
    Some(Version::new(major, minor, patch))
}

/// Version encoded as the last `-` separated part of a root dir name, as in
/// `LLVM-17.0.6` or `clang-16.0`.
pub fn version_from_root(root: &Path) -> Option<Version> {
    let name = root.file_name()?.to_str()?;
    let (_, suffix) = name.rsplit_once('-')?;
    parse_lenient(suffix)
}

/// First version-looking token of a `--version` banner.
pub fn parse_banner(output: &str) -> Option<Version> {
    output
        .lines()
        .flat_map(str::split_whitespace)
        .find(|token| {
            token
                .trim_start_matches('v')
                .starts_with(|c: char| c.is_ascii_digit())
        })
        .and_then(parse_lenient)
}

/// Run `{exe} --version` and parse its banner.
pub fn probe(runner: &dyn CommandRunner, exe: &Path) -> Option<Version> {
    let mut cmd = Command::new(exe);
    cmd.arg("--version");
    match runner.output(&mut cmd) {
        Ok(output) if output.status.success() => {
            parse_banner(&String::from_utf8_lossy(&output.stdout))
        }
        Ok(output) => {
            debug!("{} --version exited with {}", exe.display(), output.status);
            None
        }
        Err(e) => {
            debug!("Cannot run {} --version: {}", exe.display(), e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_lenient() {
        assert_eq!(parse_lenient("17"), Some(Version::new(17, 0, 0)));
        assert_eq!(parse_lenient("v16.0"), Some(Version::new(16, 0, 0)));
        assert_eq!(parse_lenient("14.34.31933"), Some(Version::new(14, 34, 31933)));
        assert_eq!(parse_lenient("11.4.0-1ubuntu1"), Some(Version::new(11, 4, 0)));
        assert_eq!(parse_lenient("1.2.3.4"), Some(Version::new(1, 2, 3)));
        assert_eq!(parse_lenient("git"), None);
    }

    #[test]
    fn test_version_from_root() {
        assert_eq!(
            version_from_root(Path::new("/work/libraries/linux_clang/LLVM-17.0.6")),
            Some(Version::new(17, 0, 6))
        );
        assert_eq!(version_from_root(Path::new("/usr")), None);
        assert_eq!(version_from_root(Path::new("/tools/clang-git")), None);
    }

    #[test]
    fn test_parse_banner() {
        assert_eq!(
            parse_banner("Ubuntu clang version 14.0.0-1ubuntu1.1\nTarget: x86_64"),
            Some(Version::new(14, 0, 0))
        );
        assert_eq!(
            parse_banner("gcc (Ubuntu 11.4.0-1ubuntu1~22.04) 11.4.0"),
            Some(Version::new(11, 4, 0))
        );
        assert_eq!(
            parse_banner("emcc (Emscripten gcc/clang-like replacement) 3.1.35 (abc)"),
            Some(Version::new(3, 1, 35))
        );
        assert_eq!(parse_banner("no digits here"), None);
    }
}
