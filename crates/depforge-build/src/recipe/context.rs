use crate::compiler::{CompilerCandidate, CompilerKind};
use crate::env::BuildEnv;
use crate::error::{ForgeError, Result};
use crate::orchestrator::Orchestrator;
use depforge_core::Platform;
use depforge_core::process::describe;
use log::{error, info, warn};
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Tools whose directory is put on `PATH` for every recipe.
pub const DEFAULT_TOOL_ENVS: &[&str] = &["ninja"];

/// Everything a recipe may use while building one library: the compiler
/// environment, tool lookup, other libraries' install dirs and helpers that
/// run the usual configure/build/install commands.
///
/// Each build gets its own context; flag changes made by one recipe never
/// leak into the next build.
pub struct RecipeContext<'a> {
    orchestrator: &'a Orchestrator,
    compiler: &'a CompilerCandidate,
    env: BuildEnv,
}

impl<'a> RecipeContext<'a> {
    pub(crate) fn new(
        orchestrator: &'a Orchestrator,
        compiler: &'a CompilerCandidate,
        tool_envs: &[&str],
    ) -> Result<Self> {
        let platform = orchestrator.platform();
        let base = BuildEnv::from_process(platform);
        let mut env = compiler.environment(&base, orchestrator.runner())?;

        for name in tool_envs {
            match orchestrator.tool(name) {
                Ok(handle) => env.prepend_path("PATH", handle.dir()),
                Err(e) => warn!("Not adding {} to PATH: {}", name, e),
            }
        }

        if platform.is_linux() {
            env.append_flag("CFLAGS", "-fPIC");
            env.append_flag("CXXFLAGS", "-fPIC");
        }

        Ok(Self {
            orchestrator,
            compiler,
            env,
        })
    }

    pub fn platform(&self) -> Platform {
        self.orchestrator.platform()
    }

    pub fn compiler(&self) -> &CompilerCandidate {
        self.compiler
    }

    pub fn is_msvc(&self) -> bool {
        self.compiler.kind == CompilerKind::Msvc
    }

    pub fn env(&self) -> &BuildEnv {
        &self.env
    }

    pub fn env_mut(&mut self) -> &mut BuildEnv {
        &mut self.env
    }

    pub fn tool_path(&self, name: &str) -> Result<PathBuf> {
        Ok(self.orchestrator.tool(name)?.path)
    }

    /// Install dir of another library, building it first if needed.
    /// Accepts `name` or `name==version`.
    pub fn library_dir(&self, name: &str) -> Result<PathBuf> {
        self.orchestrator.library_dir(name)
    }

    pub fn append_cxxflag(&mut self, flag: &str) {
        self.env.append_flag("CXXFLAGS", flag);
    }

    pub fn append_cflag(&mut self, flag: &str) {
        self.env.append_flag("CFLAGS", flag);
    }

    pub fn append_ldflag(&mut self, flag: &str) {
        self.env.append_flag("LDFLAGS", flag);
    }

    /// Append to both `CFLAGS` and `CXXFLAGS`.
    pub fn append_compileflag(&mut self, flag: &str) {
        self.append_cxxflag(flag);
        self.append_cflag(flag);
    }

    pub fn append_linkflag(&mut self, flag: &str) {
        self.append_ldflag(flag);
    }

    pub fn write_text_file(&self, path: &Path, content: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| ForgeError::io(format!("create {}", parent.display()), e))?;
        }
        fs::write(path, content).map_err(|e| ForgeError::io(format!("write {}", path.display()), e))
    }

    /// Run `program` in `cwd` with this context's environment; a non-zero
    /// exit is a build error.
    pub fn check_execute<I, S>(&self, program: &Path, args: I, cwd: &Path) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        fs::create_dir_all(cwd).map_err(|e| ForgeError::io(format!("create {}", cwd.display()), e))?;

        let mut cmd = Command::new(program);
        cmd.args(args).current_dir(cwd);
        self.env.apply(&mut cmd);

        let command = describe(&cmd);
        info!("Executing command: {}", command);
        let status = self
            .orchestrator
            .runner()
            .status(&mut cmd)
            .map_err(|e| ForgeError::io(format!("spawn `{}`", command), e))?;

        if status.success() {
            return Ok(());
        }
        error!(
            "Command `{}` failed in {} with return code {:?}",
            command,
            cwd.display(),
            status.code()
        );
        Err(ForgeError::Build {
            command,
            code: status.code(),
        })
    }

    pub fn exec_ninja(&self, build_dir: &Path, args: &[&str]) -> Result<()> {
        let ninja = self.tool_path("ninja")?;
        self.check_execute(&ninja, args, build_dir)
    }

    /// `ninja` then `ninja install`.
    pub fn run_ninja(&self, build_dir: &Path) -> Result<()> {
        self.exec_ninja(build_dir, &[])?;
        self.exec_ninja(build_dir, &["install"])
    }

    /// `make` then `make install`.
    pub fn run_make(&self, build_dir: &Path) -> Result<()> {
        let make = self.tool_path("make")?;
        self.check_execute(&make, std::iter::empty::<&str>(), build_dir)?;
        self.check_execute(&make, ["install"], build_dir)
    }

    /// Configure with the Ninja generator in Release mode.
    pub fn run_cmake(
        &self,
        build_dir: &Path,
        prefix: &Path,
        src_dir: Option<&str>,
        flags: &[String],
    ) -> Result<()> {
        self.run_cmake_with(build_dir, prefix, src_dir, flags, "Ninja", "Release")
    }

    pub fn run_cmake_with(
        &self,
        build_dir: &Path,
        prefix: &Path,
        src_dir: Option<&str>,
        flags: &[String],
        generator: &str,
        build_type: &str,
    ) -> Result<()> {
        let cmake = self.tool_path("cmake")?;
        let mut args = vec![
            "-G".to_string(),
            generator.to_string(),
            format!("-DCMAKE_BUILD_TYPE={}", build_type),
            format!("-DCMAKE_INSTALL_PREFIX={}", cmake_path(prefix)),
        ];
        args.extend(flags.iter().cloned());
        if let Some(src) = src_dir {
            args.push(src.to_string());
        }
        self.check_execute(&cmake, &args, build_dir)
    }

    /// `sh {src_dir}/configure --prefix={prefix} {flags}`, `src_dir`
    /// defaulting to `build_dir`.
    pub fn run_configure(
        &self,
        build_dir: &Path,
        prefix: &Path,
        flags: &[String],
        src_dir: Option<&Path>,
    ) -> Result<()> {
        let sh = self.tool_path("sh")?;
        let configure = src_dir.unwrap_or(build_dir).join("configure");
        let mut args = vec![
            configure.to_string_lossy().into_owned(),
            format!("--prefix={}", prefix.display()),
        ];
        args.extend(flags.iter().cloned());
        self.check_execute(&sh, &args, build_dir)
    }
}

/// `path` with forward slashes, as CMake expects on every platform.
pub fn cmake_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cmake_path_uses_forward_slashes() {
        assert_eq!(
            cmake_path(Path::new("C:\\work\\libraries\\windows_msvc\\zlib-1.3")),
            "C:/work/libraries/windows_msvc/zlib-1.3"
        );
        assert_eq!(cmake_path(Path::new("/opt/zlib")), "/opt/zlib");
    }
}
