//! Environment snapshots handed to build subprocesses.

use depforge_core::Platform;
use std::collections::BTreeMap;
use std::path::Path;
use std::process::Command;

/// An owned set of environment variables.
///
/// Keys are upper-cased on Windows, where variable names are
/// case-insensitive. A snapshot is applied to a command in full, replacing
/// the inherited environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildEnv {
    platform: Platform,
    vars: BTreeMap<String, String>,
}

impl BuildEnv {
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            vars: BTreeMap::new(),
        }
    }

    /// Copy of the current process environment. Non UTF-8 entries are skipped.
    pub fn from_process(platform: Platform) -> Self {
        let mut env = Self::new(platform);
        for (key, value) in std::env::vars_os() {
            if let (Some(key), Some(value)) = (key.to_str(), value.to_str()) {
                env.set(key, value);
            }
        }
        env
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    fn normalize(&self, key: &str) -> String {
        if self.platform.is_windows() {
            key.to_ascii_uppercase()
        } else {
            key.to_string()
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(&self.normalize(key)).map(String::as_str)
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        let key = self.normalize(key);
        self.vars.insert(key, value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        let key = self.normalize(key);
        self.vars.remove(&key)
    }

    /// Put `dir` in front of the `PATH`-like variable `key`.
    pub fn prepend_path(&mut self, key: &str, dir: &Path) {
        let dir = dir.to_string_lossy().into_owned();
        let value = match self.get(key) {
            Some(prev) if !prev.is_empty() => {
                format!("{}{}{}", dir, self.platform.path_list_separator(), prev)
            }
            _ => dir,
        };
        self.set(key, value);
    }

    /// Append `flag` to the space separated variable `key`.
    pub fn append_flag(&mut self, key: &str, flag: &str) {
        let value = match self.get(key) {
            Some(prev) if !prev.trim().is_empty() => format!("{} {}", prev.trim_end(), flag),
            _ => flag.to_string(),
        };
        self.set(key, value);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Replace the environment of `cmd` with this snapshot.
    pub fn apply(&self, cmd: &mut Command) {
        cmd.env_clear();
        cmd.envs(&self.vars);
    }
}
