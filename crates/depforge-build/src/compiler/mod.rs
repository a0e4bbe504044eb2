//! Compiler discovery, ranking and environments.
//!
//! A [`CompilerCandidate`] moves through
//! `Unconfigured -> Discovered -> Available | Unavailable`: it is created
//! from a root directory, its executable and include/lib paths are derived,
//! then it is validated by checking that its primary executable exists.
//! Only available candidates can be selected by the [`CompilerRegistry`].

mod discover;
mod msvc;
pub mod version;

pub use discover::CompilerRegistry;

use crate::env::BuildEnv;
use crate::error::{ForgeError, Result};
use depforge_core::{CommandRunner, Platform};
use semver::Version;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Score bonus of a candidate whose kind matches the requested one.
pub const KIND_MATCH_BONUS: u64 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CompilerKind {
    Clang,
    Gcc,
    Msvc,
    Emcc,
}

impl CompilerKind {
    pub fn as_str(self) -> &'static str {
        match self {
            CompilerKind::Clang => "clang",
            CompilerKind::Gcc => "gcc",
            CompilerKind::Msvc => "msvc",
            CompilerKind::Emcc => "emcc",
        }
    }

    /// C and C++ driver names, without platform suffix.
    pub fn drivers(self) -> (&'static str, &'static str) {
        match self {
            CompilerKind::Clang => ("clang", "clang++"),
            CompilerKind::Gcc => ("gcc", "g++"),
            CompilerKind::Msvc => ("cl", "cl"),
            CompilerKind::Emcc => ("emcc", "em++"),
        }
    }
}

impl fmt::Display for CompilerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CompilerKind {
    type Err = ForgeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "clang" => Ok(CompilerKind::Clang),
            "gcc" => Ok(CompilerKind::Gcc),
            "msvc" => Ok(CompilerKind::Msvc),
            "emcc" => Ok(CompilerKind::Emcc),
            other => Err(ForgeError::Toolchain(format!(
                "unknown compiler kind '{}'",
                other
            ))),
        }
    }
}

/// Where a candidate was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Found on `PATH`.
    System,
    /// Configured root, compiler installed as a library or as a tool.
    Toolchain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateState {
    Unconfigured,
    Discovered,
    Available,
    Unavailable,
}

#[derive(Debug, Clone)]
pub struct CompilerCandidate {
    pub kind: CompilerKind,
    pub origin: Origin,
    pub root_dir: PathBuf,
    pub version: Option<Version>,
    pub state: CandidateState,
    pub cc: PathBuf,
    pub cxx: PathBuf,
    pub include_dirs: Vec<PathBuf>,
    pub lib_dirs: Vec<PathBuf>,
    /// `vcvarsall.bat` for MSVC.
    pub setup_script: Option<PathBuf>,
}

impl CompilerCandidate {
    pub fn new(kind: CompilerKind, origin: Origin, root_dir: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            origin,
            root_dir: root_dir.into(),
            version: None,
            state: CandidateState::Unconfigured,
            cc: PathBuf::new(),
            cxx: PathBuf::new(),
            include_dirs: Vec::new(),
            lib_dirs: Vec::new(),
            setup_script: None,
        }
    }

    /// MSVC candidate from its `VC/Auxiliary/Build/vcvarsall.bat` script.
    pub fn msvc(setup_script: impl Into<PathBuf>) -> Self {
        let setup_script = setup_script.into();
        // {root}/VC/Auxiliary/Build/vcvarsall.bat
        let root = setup_script
            .ancestors()
            .nth(4)
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let mut candidate = Self::new(CompilerKind::Msvc, Origin::Toolchain, root);
        candidate.setup_script = Some(setup_script);
        candidate
    }

    pub fn with_version(mut self, version: Option<Version>) -> Self {
        self.version = version;
        self
    }

    /// Derive executable and search paths from the root dir.
    pub fn discover(&mut self, platform: Platform) {
        let exe = platform.exe_suffix();
        let (cc, cxx) = self.kind.drivers();
        match self.kind {
            CompilerKind::Clang | CompilerKind::Gcc => {
                let bin = self.root_dir.join("bin");
                self.cc = bin.join(format!("{cc}{exe}"));
                self.cxx = bin.join(format!("{cxx}{exe}"));
                self.include_dirs = existing(vec![self.root_dir.join("include")]);
                self.lib_dirs = existing(vec![self.root_dir.join("lib")]);
            }
            CompilerKind::Emcc => {
                let script = if platform.is_windows() { ".bat" } else { "" };
                self.cc = self.root_dir.join(format!("{cc}{script}"));
                self.cxx = self.root_dir.join(format!("{cxx}{script}"));
                self.lib_dirs = existing(vec![self.root_dir.join("lib")]);
            }
            CompilerKind::Msvc => {
                let build_dir = self
                    .setup_script
                    .as_deref()
                    .and_then(Path::parent)
                    .map(Path::to_path_buf)
                    .unwrap_or_default();
                if self.version.is_none() {
                    let version_file = build_dir.join("Microsoft.VCToolsVersion.default.txt");
                    self.version = std::fs::read_to_string(version_file)
                        .ok()
                        .and_then(|raw| version::parse_lenient(&raw));
                }
                if let Some(v) = &self.version {
                    let tools = self.root_dir.join("VC/Tools/MSVC");
                    let full = format!("{}.{}.{}", v.major, v.minor, v.patch);
                    self.cxx = tools.join(full).join("bin/Hostx64/x64/cl.exe");
                    self.cc = self.cxx.clone();
                }
            }
        }
        self.state = CandidateState::Discovered;
    }

    /// Executable whose presence makes the candidate usable.
    pub fn primary_executable(&self) -> &Path {
        match (&self.kind, &self.setup_script) {
            (CompilerKind::Msvc, Some(script)) => script.as_path(),
            _ => self.cxx.as_path(),
        }
    }

    pub fn validate(&mut self) {
        self.state = if self.primary_executable().is_file() {
            CandidateState::Available
        } else {
            CandidateState::Unavailable
        };
    }

    pub fn is_available(&self) -> bool {
        self.state == CandidateState::Available
    }

    /// `major * 100 + minor`, plus [`KIND_MATCH_BONUS`] when the kind is the
    /// requested one. Unavailable candidates score zero.
    pub fn score(&self, requested: Option<CompilerKind>) -> u64 {
        if !self.is_available() {
            return 0;
        }
        let base = self
            .version
            .as_ref()
            .map(|v| v.major * 100 + v.minor)
            .unwrap_or(0);
        if requested == Some(self.kind) {
            base + KIND_MATCH_BONUS
        } else {
            base
        }
    }

    pub fn name(&self) -> String {
        match &self.version {
            Some(v) => format!("{}-{}", self.kind, v),
            None => self.kind.to_string(),
        }
    }

    pub fn bin_dir(&self) -> Option<&Path> {
        self.cxx.parent()
    }

    /// `base` with this compiler configured: `PATH` prefixed by the compiler
    /// binary dir, `CC`/`CXX` set, include and lib dirs turned into flags.
    /// MSVC runs its setup script and keeps what the script changed.
    pub fn environment(&self, base: &BuildEnv, runner: &dyn CommandRunner) -> Result<BuildEnv> {
        if self.kind == CompilerKind::Msvc {
            let script = self.setup_script.as_deref().ok_or_else(|| {
                ForgeError::Toolchain("MSVC candidate without setup script".to_string())
            })?;
            return msvc::capture_environment(runner, script, base);
        }

        let mut env = base.clone();
        if let Some(bin) = self.bin_dir() {
            env.prepend_path("PATH", bin);
        }
        env.set("CC", self.cc.to_string_lossy());
        env.set("CXX", self.cxx.to_string_lossy());

        for dir in &self.include_dirs {
            let flag = format!("-I{}", dir.display());
            env.append_flag("CFLAGS", &flag);
            env.append_flag("CXXFLAGS", &flag);
        }
        let lib_var = if base.platform().is_windows() {
            "LIB"
        } else {
            "LD_LIBRARY_PATH"
        };
        for dir in &self.lib_dirs {
            env.prepend_path(lib_var, dir);
            env.append_flag("LDFLAGS", &format!("-L{}", dir.display()));
        }
        Ok(env)
    }
}

fn existing(dirs: Vec<PathBuf>) -> Vec<PathBuf> {
    dirs.into_iter().filter(|d| d.is_dir()).collect()
}
