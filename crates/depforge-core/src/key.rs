//! Canonical package naming.
//!
//! A [`PackageKey`] is `{name}-{version}`. Qualified with a [`Flavor`]
//! (`{platform}_{compiler}`) it names exactly one install directory and one
//! cache artifact:
//!
//! ```text
//! {install_root}/{platform}_{compiler}/{name}-{version}/
//! {package_dir}/{name}-{version}-{platform}-{compiler}.{ext}
//! ```

use crate::platform::Platform;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackageKey {
    name: String,
    version: String,
}

impl PackageKey {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// `{name}-{version}`, the install directory name.
    pub fn dir_name(&self) -> String {
        format!("{}-{}", self.name, self.version)
    }

    /// `{name}-{version}-{platform}-{compiler}.{ext}`
    pub fn artifact_name(&self, flavor: &Flavor, ext: &str) -> String {
        format!(
            "{}-{}-{}.{}",
            self.dir_name(),
            flavor.platform(),
            flavor.compiler(),
            ext.trim_start_matches('.')
        )
    }

    /// `{name}-{version}-{platform}_{compiler}`, unique across flavors.
    pub fn qualified(&self, flavor: &Flavor) -> String {
        format!("{}-{}", self.dir_name(), flavor)
    }
}

impl fmt::Display for PackageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.name, self.version)
    }
}

/// `{platform}_{compiler}` qualifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Flavor {
    platform: Platform,
    compiler: String,
}

impl Flavor {
    pub fn new(platform: Platform, compiler: impl Into<String>) -> Self {
        Self {
            platform,
            compiler: compiler.into(),
        }
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn compiler(&self) -> &str {
        &self.compiler
    }
}

impl fmt::Display for Flavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.platform, self.compiler)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_artifact_name() {
        let key = PackageKey::new("zlib", "1.3");
        let flavor = Flavor::new(Platform::Linux, "clang");
        assert_eq!(key.dir_name(), "zlib-1.3");
        assert_eq!(flavor.to_string(), "linux_clang");
        assert_eq!(
            key.artifact_name(&flavor, "tar.xz"),
            "zlib-1.3-linux-clang.tar.xz"
        );
        assert_eq!(key.artifact_name(&flavor, ".7z"), "zlib-1.3-linux-clang.7z");
    }

    #[test]
    fn test_distinct_tuples_give_distinct_keys() {
        let tuples = [
            ("zlib", "1.3", Platform::Linux, "clang"),
            ("zlib", "1.3", Platform::Linux, "gcc"),
            ("zlib", "1.3", Platform::Windows, "clang"),
            ("zlib", "1.3.1", Platform::Linux, "clang"),
            ("lz4", "1.3", Platform::Linux, "clang"),
        ];

        let names: HashSet<String> = tuples
            .iter()
            .map(|(n, v, p, c)| PackageKey::new(*n, *v).artifact_name(&Flavor::new(*p, *c), "7z"))
            .collect();
        assert_eq!(names.len(), tuples.len());

        let qualified: HashSet<String> = tuples
            .iter()
            .map(|(n, v, p, c)| PackageKey::new(*n, *v).qualified(&Flavor::new(*p, *c)))
            .collect();
        assert_eq!(qualified.len(), tuples.len());
    }

    #[test]
    fn test_equal_tuples_give_equal_keys() {
        let flavor = Flavor::new(Platform::Windows, "msvc");
        let a = PackageKey::new("libpng", "1.6.40").artifact_name(&flavor, "7z");
        let _unrelated = PackageKey::new("zlib", "1.3").artifact_name(&flavor, "7z");
        let b = PackageKey::new("libpng", "1.6.40").artifact_name(&flavor, "7z");
        assert_eq!(a, b);
    }
}
