//! Configuration document and library catalog.

mod catalog;
mod load;
mod model;

pub use catalog::Catalog;
pub use load::{merge_values, CONFIG_FILE_NAME};
pub use model::{
    is_vcs_url, CompilerCandidateConfig, CompilerConfig, Config, DownloadConfig, LayoutConfig,
    LibraryDescriptor, SourceRef, ToolDescriptor,
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::Platform;

    fn zlib() -> LibraryDescriptor {
        LibraryDescriptor {
            url: Some("https://zlib.net/zlib-1.3.tar.gz".to_string()),
            windows_url: Some("https://zlib.net/zlib13.zip".to_string()),
            linux_version: Some("1.3.1".to_string()),
            ..LibraryDescriptor::named("zlib", "1.3")
        }
    }

    #[test]
    fn test_platform_version_override() {
        let lib = zlib();
        assert_eq!(lib.version_for(Platform::Linux), "1.3.1");
        assert_eq!(lib.version_for(Platform::Windows), "1.3");
    }

    #[test]
    fn test_platform_url_takes_precedence() {
        let lib = zlib();
        assert_eq!(
            lib.source_for(Platform::Windows).unwrap().url,
            "https://zlib.net/zlib13.zip"
        );
        assert_eq!(
            lib.source_for(Platform::Linux).unwrap().url,
            "https://zlib.net/zlib-1.3.tar.gz"
        );
    }

    #[test]
    fn test_git_source_fallback() {
        let lib = LibraryDescriptor {
            git: Some("git@github.com:madler/zlib.git".to_string()),
            ..LibraryDescriptor::named("zlib", "git")
        };
        let source = lib.source_for(Platform::Linux).unwrap();
        assert!(source.from_vcs);
        assert!(LibraryDescriptor::named("x", "1").source_for(Platform::Linux).is_none());
    }

    #[test]
    fn test_vcs_url_detection() {
        assert!(is_vcs_url("git@github.com:org/repo.git"));
        assert!(is_vcs_url("hg@https://hg.example/repo"));
        assert!(!is_vcs_url("https://github.com/org/repo/archive/v1.tar.gz"));
    }
}
