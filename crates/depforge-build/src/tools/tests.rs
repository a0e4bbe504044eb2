use super::*;
use depforge_core::SystemRunner;
use depforge_fetch::DownloadOptions;
use depforge_testkit::{temp_dir_in_workspace, write_fake_executable, write_source_tar_gz};
use std::collections::BTreeMap;

fn tool(name: &str, version: &str) -> ToolDescriptor {
    ToolDescriptor {
        name: name.to_string(),
        version: Some(version.to_string()),
        sub_path: None,
        urls: Vec::new(),
        path: None,
        root_dir: None,
        git: None,
        extracted_dir: None,
        sub_tools: BTreeMap::new(),
    }
}

struct Fixture {
    downloader: Downloader,
    archive: ArchiveService,
}

impl Fixture {
    fn new() -> Self {
        Self {
            downloader: Downloader::new(DownloadOptions::default()).unwrap(),
            archive: ArchiveService::default(),
        }
    }

    fn services(&self) -> Services<'_> {
        Services {
            downloader: &self.downloader,
            archive: &self.archive,
            runner: &SystemRunner,
        }
    }
}

#[test]
fn test_system_tool_is_used_as_is() {
    let temp = temp_dir_in_workspace();
    let exe = temp.path().join("bin/cmake");
    write_fake_executable(&exe, "exit 0");

    let mut desc = tool("cmake", "3.27.0");
    desc.path = Some(exe.to_string_lossy().into_owned());
    let provisioner =
        ToolProvisioner::new(Platform::Linux, temp.path().join("tools"), vec![desc], vec![], false);

    let fx = Fixture::new();
    let handle = provisioner.resolve("CMake", &fx.services()).unwrap();
    assert_eq!(handle.path, exe);
    assert_eq!(handle.dir(), temp.path().join("bin"));
    assert_eq!(provisioner.cached("cmake"), Some(handle));
    assert!(!temp.path().join("tools").exists());
}

#[test]
fn test_system_tool_rejects_sub_tools() {
    let temp = temp_dir_in_workspace();
    let exe = temp.path().join("cmake");
    write_fake_executable(&exe, "exit 0");

    let mut desc = tool("cmake", "3.27.0");
    desc.path = Some(exe.to_string_lossy().into_owned());
    desc.sub_tools.insert("ctest".to_string(), "ctest".to_string());
    let provisioner = ToolProvisioner::new(Platform::Linux, temp.path(), vec![desc], vec![], false);

    let err = provisioner.resolve("cmake", &Fixture::new().services()).unwrap_err();
    assert!(matches!(err, ForgeError::Configuration(_)));
}

#[test]
#[cfg(unix)]
fn test_package_install_is_idempotent() {
    use std::os::unix::fs::PermissionsExt;

    let temp = temp_dir_in_workspace();
    let package = temp.path().join("ninja-1.11.1-linux.tar.gz");
    write_source_tar_gz(&package, "ninja-linux", &[("ninja", "#!/bin/sh\n")]);

    let tools_dir = temp.path().join("tools/linux");
    let mut desc = tool("ninja", "1.11.1");
    desc.urls = vec![
        temp.path().join("missing.tar.gz").to_string_lossy().into_owned(),
        package.to_string_lossy().into_owned(),
    ];

    let fx = Fixture::new();
    let provisioner =
        ToolProvisioner::new(Platform::Linux, &tools_dir, vec![desc.clone()], vec![], false);
    let handle = provisioner.resolve("ninja", &fx.services()).unwrap();

    assert_eq!(handle.path, tools_dir.join("ninja-1.11.1/ninja"));
    assert_eq!(handle.version.as_deref(), Some("1.11.1"));
    let mode = fs::metadata(&handle.path).unwrap().permissions().mode();
    assert_eq!(mode & 0o111, 0o111);
    assert!(tools_dir.join("ninja-1.11.1-linux.tar.gz").is_file());

    // A fresh process finds the executable and never touches the package again.
    fs::remove_file(&package).unwrap();
    fs::remove_file(tools_dir.join("ninja-1.11.1-linux.tar.gz")).unwrap();
    let again = ToolProvisioner::new(Platform::Linux, &tools_dir, vec![desc], vec![], false);
    assert_eq!(again.resolve("ninja", &fx.services()).unwrap().path, handle.path);
}

#[test]
fn test_loose_file_package_lands_in_install_dir() {
    let temp = temp_dir_in_workspace();
    let package = temp.path().join("premake.tar.gz");
    write_source_tar_gz(&package, ".", &[("premake5", "#!/bin/sh\n"), ("LICENSE", "bsd")]);

    let tools_dir = temp.path().join("tools");
    let mut desc = tool("premake", "5.0");
    desc.sub_path = Some("premake5".to_string());
    desc.urls = vec![package.to_string_lossy().into_owned()];

    let provisioner = ToolProvisioner::new(Platform::Linux, &tools_dir, vec![desc], vec![], false);
    let handle = provisioner.resolve("premake", &Fixture::new().services()).unwrap();

    assert_eq!(handle.path, tools_dir.join("premake-5.0/premake5"));
    assert!(tools_dir.join("premake-5.0/LICENSE").is_file());
    assert!(!tools_dir.join("LICENSE").exists());
    assert!(!tools_dir.join(".premake-5.0.staging").exists());
}

#[test]
fn test_unreachable_tool_is_a_toolchain_error() {
    let temp = temp_dir_in_workspace();
    let mut desc = tool("ninja", "1.11.1");
    desc.urls = vec![temp.path().join("nope.tar.gz").to_string_lossy().into_owned()];

    let provisioner = ToolProvisioner::new(Platform::Linux, temp.path(), vec![desc], vec![], false);
    let err = provisioner.resolve("ninja", &Fixture::new().services()).unwrap_err();
    assert!(matches!(err, ForgeError::Toolchain(ref m) if m.contains("ninja-1.11.1")));
}

#[test]
fn test_candidate_urls_order() {
    let mut desc = tool("cmake", "3.27.0");
    desc.urls = vec!["https://github.com/cmake.tar.gz".to_string()];
    let mirrors = vec!["https://mirror.example/".to_string()];

    let plain = ToolProvisioner::new(Platform::Linux, "/t", vec![], mirrors.clone(), false);
    assert_eq!(
        plain.candidate_urls(&desc),
        vec![
            "https://github.com/cmake.tar.gz",
            "https://mirror.example/tools/cmake-3.27.0-linux.7z",
            "https://mirror.example/tools/cmake-3.27.0-linux.tar.xz",
        ]
    );

    let prioritized = ToolProvisioner::new(Platform::Windows, "/t", vec![], mirrors, true);
    let urls = prioritized.candidate_urls(&desc);
    assert_eq!(urls[0], "https://mirror.example/tools/cmake-3.27.0-windows.7z");
    assert_eq!(urls[2], "https://github.com/cmake.tar.gz");
}

#[test]
fn test_sub_tool_resolves_through_parent() {
    let temp = temp_dir_in_workspace();
    let package = temp.path().join("cmake.tar.gz");
    write_source_tar_gz(
        &package,
        "cmake-3.27.0-linux-x86_64",
        &[("bin/cmake", "#!/bin/sh\n"), ("bin/ctest", "#!/bin/sh\n")],
    );

    let tools_dir = temp.path().join("tools");
    let mut desc = tool("cmake", "3.27.0");
    desc.sub_path = Some("bin/cmake".to_string());
    desc.urls = vec![package.to_string_lossy().into_owned()];
    desc.sub_tools.insert("ctest".to_string(), "bin/ctest".to_string());

    let provisioner = ToolProvisioner::new(Platform::Linux, &tools_dir, vec![desc], vec![], false);
    let ctest = provisioner.resolve("ctest", &Fixture::new().services()).unwrap();
    assert_eq!(ctest.path, tools_dir.join("cmake-3.27.0/bin/ctest"));
    assert_eq!(
        provisioner.cached("cmake").unwrap().path,
        tools_dir.join("cmake-3.27.0/bin/cmake")
    );
}

fn marker_hook(ctx: &HookContext<'_>) -> Result<()> {
    fs::write(ctx.install_dir.join("hooked"), &ctx.tool.name)
        .map_err(|e| ForgeError::io("write marker", e))
}

#[test]
fn test_post_install_hook_runs_after_extraction() {
    let temp = temp_dir_in_workspace();
    let package = temp.path().join("ninja.tar.gz");
    write_source_tar_gz(&package, "ninja", &[("ninja", "#!/bin/sh\n")]);

    let tools_dir = temp.path().join("tools");
    let mut desc = tool("ninja", "1.11.1");
    desc.urls = vec![package.to_string_lossy().into_owned()];

    let mut hooks = HookRegistry::new();
    hooks.register("ninja", Platform::Linux, marker_hook);
    let provisioner = ToolProvisioner::new(Platform::Linux, &tools_dir, vec![desc], vec![], false)
        .with_hooks(hooks);
    provisioner.resolve("ninja", &Fixture::new().services()).unwrap();

    assert_eq!(
        fs::read_to_string(tools_dir.join("ninja-1.11.1/hooked")).unwrap(),
        "ninja"
    );
}

#[test]
#[cfg(unix)]
fn test_unconfigured_tool_falls_back_to_path() {
    let temp = temp_dir_in_workspace();
    let provisioner = ToolProvisioner::new(Platform::Linux, temp.path(), vec![], vec![], false);
    let fx = Fixture::new();

    let sh = provisioner.resolve("sh", &fx.services()).unwrap();
    assert!(sh.path.is_file());
    assert!(sh.version.is_none());

    let err = provisioner
        .resolve("definitely-not-a-real-tool-xyz", &fx.services())
        .unwrap_err();
    assert!(matches!(err, ForgeError::Toolchain(_)));
}
