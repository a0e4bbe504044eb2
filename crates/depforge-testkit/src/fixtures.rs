//! On-disk fixtures: source archives, fake compilers and fake tools.
//!
//! Archives are built in memory from `(relative path, contents)` pairs and
//! nested under a single top-level directory, the way upstream source
//! tarballs are laid out.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

fn append_entries<W: Write>(builder: &mut tar::Builder<W>, top_dir: &str, files: &[(&str, &str)]) {
    for (rel, contents) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(contents.len() as u64);
        header.set_mode(0o644);
        header.set_mtime(0);
        header.set_cksum();
        builder
            .append_data(&mut header, format!("{}/{}", top_dir, rel), contents.as_bytes())
            .expect("Failed to append tar entry");
    }
}

fn create_fixture_file(dest: &Path) -> File {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).expect("Failed to create fixture parent");
    }
    File::create(dest).expect("Failed to create archive fixture")
}

/// Write a `.tar.gz` with every file nested under `top_dir/`.
pub fn write_source_tar_gz(dest: &Path, top_dir: &str, files: &[(&str, &str)]) {
    let file = create_fixture_file(dest);
    let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
    let mut builder = tar::Builder::new(encoder);
    append_entries(&mut builder, top_dir, files);
    builder
        .into_inner()
        .and_then(|enc| enc.finish())
        .expect("Failed to finish tar.gz fixture");
}

/// Write a `.tar.xz` with every file nested under `top_dir/`.
pub fn write_source_tar_xz(dest: &Path, top_dir: &str, files: &[(&str, &str)]) {
    let file = create_fixture_file(dest);
    let encoder = xz2::write::XzEncoder::new(file, 6);
    let mut builder = tar::Builder::new(encoder);
    append_entries(&mut builder, top_dir, files);
    builder
        .into_inner()
        .and_then(|enc| enc.finish())
        .expect("Failed to finish tar.xz fixture");
}

/// Write a `.zip` with every file nested under `top_dir/`.
pub fn write_source_zip(dest: &Path, top_dir: &str, files: &[(&str, &str)]) {
    let file = create_fixture_file(dest);
    let mut writer = zip::ZipWriter::new(file);
    let options = zip::write::FileOptions::default();
    for (rel, contents) in files {
        writer
            .start_file(format!("{}/{}", top_dir, rel), options)
            .expect("Failed to start zip entry");
        writer
            .write_all(contents.as_bytes())
            .expect("Failed to write zip entry");
    }
    writer.finish().expect("Failed to finish zip fixture");
}

/// Write an executable shell script at `path`.
pub fn write_fake_executable(path: &Path, script: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("Failed to create executable parent");
    }
    fs::write(path, format!("#!/bin/sh\n{}\n", script)).expect("Failed to write executable");

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o755))
            .expect("Failed to set permissions");
    }
}

/// A compiler root whose `bin/` holds scripts answering `--version`.
#[derive(Debug, Clone)]
pub struct FakeToolchain {
    pub root: PathBuf,
    pub version: String,
}

impl FakeToolchain {
    /// `{root}/bin/clang` and `{root}/bin/clang++` reporting `version`.
    pub fn clang(root: &Path, version: &str) -> Self {
        let answer = format!("echo \"clang version {}\"", version);
        write_fake_executable(&root.join("bin").join("clang"), &answer);
        write_fake_executable(&root.join("bin").join("clang++"), &answer);
        Self {
            root: root.to_path_buf(),
            version: version.to_string(),
        }
    }

    /// `{root}/bin/gcc` and `{root}/bin/g++` reporting `version`.
    pub fn gcc(root: &Path, version: &str) -> Self {
        let answer = format!("echo \"gcc (GCC) {}\"", version);
        write_fake_executable(&root.join("bin").join("gcc"), &answer);
        write_fake_executable(&root.join("bin").join("g++"), &answer);
        Self {
            root: root.to_path_buf(),
            version: version.to_string(),
        }
    }

    pub fn bin_dir(&self) -> PathBuf {
        self.root.join("bin")
    }
}
