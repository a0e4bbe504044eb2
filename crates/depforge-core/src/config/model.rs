use crate::key::PackageKey;
use crate::platform::Platform;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// depforge.toml schema
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub libraries: Vec<LibraryDescriptor>,
    #[serde(default)]
    pub linux_tools: Vec<ToolDescriptor>,
    #[serde(default)]
    pub windows_tools: Vec<ToolDescriptor>,
    /// Base URLs of package mirrors, each ending with a `/`.
    #[serde(default)]
    pub package_urls: Vec<String>,
    #[serde(default)]
    pub prioritize_package_urls: bool,
    /// Additional override files merged after the user config.
    #[serde(default)]
    pub user_config_paths: Vec<String>,
    #[serde(default)]
    pub compilers: CompilerConfig,
    #[serde(default)]
    pub download: DownloadConfig,
    #[serde(default)]
    pub layout: LayoutConfig,
}

impl Config {
    /// Tool descriptors declared for `platform`.
    pub fn tools_for(&self, platform: Platform) -> &[ToolDescriptor] {
        match platform {
            Platform::Linux => &self.linux_tools,
            Platform::Windows => &self.windows_tools,
        }
    }
}

/// Catalog entry describing one buildable library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryDescriptor {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub linux_url: Option<String>,
    #[serde(default)]
    pub windows_url: Option<String>,
    #[serde(default)]
    pub git: Option<String>,
    /// Top-level directory name inside the source archive when it differs
    /// from the archive file stem.
    #[serde(default)]
    pub extracted_dir: Option<String>,
    #[serde(default)]
    pub linux_version: Option<String>,
    #[serde(default)]
    pub windows_version: Option<String>,
}

/// Where the sources of a library come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRef {
    pub url: String,
    pub from_vcs: bool,
}

impl LibraryDescriptor {
    /// Minimal descriptor carrying only a name and a version.
    pub fn named(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            url: None,
            linux_url: None,
            windows_url: None,
            git: None,
            extracted_dir: None,
            linux_version: None,
            windows_version: None,
        }
    }

    /// Version to use on `platform`, honoring the per-platform override.
    pub fn version_for(&self, platform: Platform) -> &str {
        let over = match platform {
            Platform::Linux => self.linux_version.as_deref(),
            Platform::Windows => self.windows_version.as_deref(),
        };
        over.unwrap_or(&self.version)
    }

    /// `{name}-{version}` key for `platform`.
    pub fn key(&self, platform: Platform) -> PackageKey {
        PackageKey::new(&self.name, self.version_for(platform))
    }

    /// Source location on `platform`: the per-platform URL, then the generic
    /// URL, then the git repository.
    pub fn source_for(&self, platform: Platform) -> Option<SourceRef> {
        let url = match platform {
            Platform::Linux => self.linux_url.as_ref(),
            Platform::Windows => self.windows_url.as_ref(),
        }
        .or(self.url.as_ref());

        match (url, &self.git) {
            (Some(url), _) => Some(SourceRef {
                url: url.clone(),
                from_vcs: is_vcs_url(url),
            }),
            (None, Some(git)) => Some(SourceRef {
                url: git.clone(),
                from_vcs: true,
            }),
            (None, None) => None,
        }
    }
}

/// Whether `url` names a version-control repository rather than a file.
pub fn is_vcs_url(url: &str) -> bool {
    url.starts_with("git@") || url.starts_with("hg@") || url.starts_with("git+")
}

/// Tool entry of `[[linux_tools]]` / `[[windows_tools]]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
    /// Executable path relative to the tool install dir.
    #[serde(default)]
    pub sub_path: Option<String>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub urls: Vec<String>,
    /// Absolute path of a tool provided by the system.
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub root_dir: Option<String>,
    #[serde(default)]
    pub git: Option<String>,
    #[serde(default)]
    pub extracted_dir: Option<String>,
    #[serde(default)]
    pub sub_tools: BTreeMap<String, String>,
}

impl ToolDescriptor {
    /// Canonical `{name}-{version}` directory name.
    pub fn full_name(&self) -> String {
        match &self.version {
            Some(version) => format!("{}-{}", self.name, version),
            None => self.name.clone(),
        }
    }
}

fn one_or_many<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(url) => vec![url],
        OneOrMany::Many(urls) => urls,
    })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompilerConfig {
    #[serde(default = "default_linux_supported")]
    pub linux_supported: Vec<String>,
    #[serde(default = "default_windows_supported")]
    pub windows_supported: Vec<String>,
    #[serde(default = "default_linux_compiler")]
    pub linux_default: String,
    #[serde(default = "default_windows_compiler")]
    pub windows_default: String,
    /// Visual Studio install roots searched for `VC/Auxiliary/Build/vcvarsall.bat`.
    #[serde(default)]
    pub msvc_install_paths: Vec<String>,
    /// Also look for compilers on `PATH`.
    #[serde(default)]
    pub detect_system: bool,
    #[serde(default)]
    pub candidates: Vec<CompilerCandidateConfig>,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            linux_supported: default_linux_supported(),
            windows_supported: default_windows_supported(),
            linux_default: default_linux_compiler(),
            windows_default: default_windows_compiler(),
            msvc_install_paths: Vec::new(),
            detect_system: false,
            candidates: Vec::new(),
        }
    }
}

impl CompilerConfig {
    pub fn supported(&self, platform: Platform) -> &[String] {
        match platform {
            Platform::Linux => &self.linux_supported,
            Platform::Windows => &self.windows_supported,
        }
    }

    pub fn default_kind(&self, platform: Platform) -> &str {
        match platform {
            Platform::Linux => &self.linux_default,
            Platform::Windows => &self.windows_default,
        }
    }
}

fn default_linux_supported() -> Vec<String> {
    vec!["clang".to_string()]
}

fn default_windows_supported() -> Vec<String> {
    vec!["clang".to_string(), "msvc".to_string()]
}

fn default_linux_compiler() -> String {
    "clang".to_string()
}

fn default_windows_compiler() -> String {
    "msvc".to_string()
}

/// Explicitly configured compiler root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilerCandidateConfig {
    pub kind: String,
    pub root_dir: PathBuf,
    #[serde(default)]
    pub version: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// 0 disables throttling.
    #[serde(default)]
    pub max_bytes_per_second: u64,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
            max_bytes_per_second: 0,
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

fn default_max_retries() -> u32 {
    20
}

fn default_timeout_secs() -> u64 {
    6
}

fn default_retry_delay_ms() -> u64 {
    1000
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Where cache packages live; defaults to the flavor's install dir.
    #[serde(default)]
    pub package_dir: Option<PathBuf>,
}
