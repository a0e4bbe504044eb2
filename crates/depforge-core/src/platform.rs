use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Target platform of a build.
///
/// The platform is part of every flavor and cache artifact name, and selects
/// which branch of a recipe runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Linux,
    Windows,
}

impl Platform {
    /// Platform of the running process.
    pub fn current() -> Result<Self> {
        #[cfg(target_os = "linux")]
        return Ok(Platform::Linux);

        #[cfg(target_os = "windows")]
        return Ok(Platform::Windows);

        #[cfg(not(any(target_os = "linux", target_os = "windows")))]
        Err(CoreError::UnsupportedPlatform(format!(
            "unsupported operating system: {}",
            std::env::consts::OS
        )))
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Platform::Linux => "linux",
            Platform::Windows => "windows",
        }
    }

    pub fn is_windows(self) -> bool {
        self == Platform::Windows
    }

    pub fn is_linux(self) -> bool {
        self == Platform::Linux
    }

    /// Suffix appended to executable names.
    pub fn exe_suffix(self) -> &'static str {
        match self {
            Platform::Linux => "",
            Platform::Windows => ".exe",
        }
    }

    /// Separator used in `PATH`-like environment variables.
    pub fn path_list_separator(self) -> &'static str {
        match self {
            Platform::Linux => ":",
            Platform::Windows => ";",
        }
    }

    /// Extension of the cache packages created on this platform.
    pub fn package_extension(self) -> &'static str {
        match self {
            Platform::Linux => "tar.xz",
            Platform::Windows => "7z",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "linux" => Ok(Platform::Linux),
            "windows" => Ok(Platform::Windows),
            other => Err(CoreError::UnsupportedPlatform(other.to_string())),
        }
    }
}
