use crate::config::LayoutConfig;
use crate::key::{Flavor, PackageKey};
use crate::platform::Platform;
use std::path::{Path, PathBuf};

/// On-disk directory layout rooted at the depforge workspace.
///
/// ```text
/// {root}/
/// ├── libraries/{platform}_{compiler}/{name}-{version}/   installed trees
/// ├── libraries/{platform}_{compiler}/*.tar.xz|*.7z       cache packages (default)
/// ├── build/libraries/                                   source and build dirs
/// ├── tools/{platform}/{name}-{version}/                  provisioned tools
/// └── .depforge/{state.json, locks/}
/// ```
#[derive(Debug, Clone)]
pub struct Layout {
    root: PathBuf,
    platform: Platform,
    package_dir: Option<PathBuf>,
}

impl Layout {
    pub fn new(root: impl Into<PathBuf>, platform: Platform) -> Self {
        Self {
            root: root.into(),
            platform,
            package_dir: None,
        }
    }

    pub fn with_config(mut self, config: &LayoutConfig) -> Self {
        self.package_dir = config.package_dir.as_ref().map(|dir| {
            if dir.is_absolute() {
                dir.clone()
            } else {
                self.root.join(dir)
            }
        });
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn libraries_root(&self) -> PathBuf {
        self.root.join("libraries")
    }

    /// Install root of one flavor.
    pub fn install_dir(&self, flavor: &Flavor) -> PathBuf {
        self.libraries_root().join(flavor.to_string())
    }

    /// Installed tree of one package.
    pub fn install_path(&self, flavor: &Flavor, key: &PackageKey) -> PathBuf {
        self.install_dir(flavor).join(key.dir_name())
    }

    pub fn package_dir(&self, flavor: &Flavor) -> PathBuf {
        match &self.package_dir {
            Some(dir) => dir.clone(),
            None => self.install_dir(flavor),
        }
    }

    /// Cache artifact of one package for this platform's package format.
    pub fn package_path(&self, flavor: &Flavor, key: &PackageKey) -> PathBuf {
        self.package_dir(flavor)
            .join(key.artifact_name(flavor, self.platform.package_extension()))
    }

    pub fn build_dir(&self) -> PathBuf {
        self.root.join("build").join("libraries")
    }

    pub fn tools_dir(&self) -> PathBuf {
        self.root.join("tools").join(self.platform.as_str())
    }

    pub fn state_dir(&self) -> PathBuf {
        self.root.join(".depforge")
    }

    pub fn state_file(&self) -> PathBuf {
        self.state_dir().join("state.json")
    }

    /// Advisory lock guarding purge/build/package of one key.
    pub fn lock_path(&self, flavor: &Flavor, key: &PackageKey) -> PathBuf {
        self.state_dir()
            .join("locks")
            .join(format!("{}.lock", key.qualified(flavor)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_follow_flavor() {
        let layout = Layout::new("/work", Platform::Linux);
        let flavor = Flavor::new(Platform::Linux, "clang");
        let key = PackageKey::new("zlib", "1.3");

        assert_eq!(
            layout.install_path(&flavor, &key),
            PathBuf::from("/work/libraries/linux_clang/zlib-1.3")
        );
        assert_eq!(
            layout.package_path(&flavor, &key),
            PathBuf::from("/work/libraries/linux_clang/zlib-1.3-linux-clang.tar.xz")
        );
        assert_eq!(layout.tools_dir(), PathBuf::from("/work/tools/linux"));
    }

    #[test]
    fn test_package_dir_override() {
        let config = LayoutConfig {
            package_dir: Some(PathBuf::from("packages")),
        };
        let layout = Layout::new("/work", Platform::Windows).with_config(&config);
        let flavor = Flavor::new(Platform::Windows, "msvc");
        let key = PackageKey::new("zlib", "1.3");
        assert_eq!(
            layout.package_path(&flavor, &key),
            PathBuf::from("/work/packages/zlib-1.3-windows-msvc.7z")
        );
    }
}
