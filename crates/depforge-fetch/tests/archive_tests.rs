use depforge_fetch::{ArchiveError, ArchiveService};
use depforge_testkit::{temp_dir_in_workspace, write_source_tar_gz, write_source_tar_xz, write_source_zip};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

fn relative_files(root: &Path) -> BTreeSet<PathBuf> {
    WalkDir::new(root)
        .into_iter()
        .map(|e| e.unwrap())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.path().strip_prefix(root).unwrap().to_path_buf())
        .collect()
}

fn zlib_install_tree(root: &Path) -> PathBuf {
    let prefix = root.join("zlib-1.3");
    fs::create_dir_all(prefix.join("include")).unwrap();
    fs::create_dir_all(prefix.join("lib/pkgconfig")).unwrap();
    fs::write(prefix.join("include/zlib.h"), "/* zlib */").unwrap();
    fs::write(prefix.join("include/zconf.h"), "/* zconf */").unwrap();
    fs::write(prefix.join("lib/libz.a"), "!<arch>\n").unwrap();
    fs::write(prefix.join("lib/pkgconfig/zlib.pc"), "Name: zlib\n").unwrap();
    prefix
}

#[test]
fn test_extract_tar_gz_renames_to_expected() {
    let temp = temp_dir_in_workspace();
    let archive = temp.path().join("libpng-1.6.40.tar.gz");
    write_source_tar_gz(&archive, "lpng1640", &[("png.h", "/* png */")]);

    let dest = temp.path().join("build");
    let out = ArchiveService::default()
        .extract(&archive, &dest, Some("libpng-1.6.40-src"))
        .unwrap();

    assert_eq!(out, dest.join("libpng-1.6.40-src"));
    assert!(out.join("png.h").is_file());
    assert!(!dest.join("lpng1640").exists());
}

#[test]
fn test_extract_defaults_to_stripped_file_name() {
    let temp = temp_dir_in_workspace();
    let archive = temp.path().join("lz4-1.9.4.tar.xz");
    write_source_tar_xz(&archive, "lz4-1.9.4", &[("lib/lz4.h", "/* lz4 */")]);

    let dest = temp.path().join("build");
    let out = ArchiveService::default()
        .extract(&archive, &dest, None)
        .unwrap();
    assert_eq!(out, dest.join("lz4-1.9.4"));
    assert!(out.join("lib/lz4.h").is_file());
}

#[test]
fn test_extract_zip() {
    let temp = temp_dir_in_workspace();
    let archive = temp.path().join("ninja-linux.zip");
    write_source_zip(&archive, "ninja-1.11.1", &[("ninja", "#!/bin/sh\n")]);

    let dest = temp.path().join("tools");
    let out = ArchiveService::default()
        .extract(&archive, &dest, Some("ninja-1.11.1"))
        .unwrap();
    assert!(out.join("ninja").is_file());
}

#[test]
fn test_extract_collision_keeps_existing_directory() {
    let temp = temp_dir_in_workspace();
    let archive = temp.path().join("zlib-1.3.tar.gz");
    write_source_tar_gz(&archive, "zlib-1.3", &[("zlib.h", "new")]);

    let dest = temp.path().join("build");
    let existing = dest.join("zlib-1.3");
    fs::create_dir_all(&existing).unwrap();
    fs::write(existing.join("marker"), "keep me").unwrap();

    let err = ArchiveService::default()
        .extract(&archive, &dest, None)
        .unwrap_err();

    assert!(matches!(err, ArchiveError::Collision(ref p) if p == &existing));
    assert_eq!(fs::read_to_string(existing.join("marker")).unwrap(), "keep me");
    assert!(!existing.join("zlib.h").exists());
}

#[test]
fn test_extract_collision_on_native_name() {
    let temp = temp_dir_in_workspace();
    let archive = temp.path().join("zlib-1.3.tar.gz");
    write_source_tar_gz(&archive, "zlib-1.3", &[("zlib.h", "new")]);

    let dest = temp.path().join("build");
    fs::create_dir_all(dest.join("zlib-1.3")).unwrap();

    let err = ArchiveService::default()
        .extract(&archive, &dest, Some("zlib-src"))
        .unwrap_err();
    assert!(matches!(err, ArchiveError::Collision(_)));
    assert!(!dest.join("zlib-src").exists());
}

#[test]
fn test_loose_files_land_in_destination() {
    let temp = temp_dir_in_workspace();
    let archive = temp.path().join("loose.tar.gz");
    {
        let file = fs::File::create(&archive).unwrap();
        let enc = flate2::write::GzEncoder::new(file, flate2::Compression::default());
        let mut builder = tar::Builder::new(enc);
        for name in ["a.txt", "b.txt"] {
            let mut header = tar::Header::new_gnu();
            header.set_size(1);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, name, &b"x"[..]).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap();
    }

    let dest = temp.path().join("out");
    let out = ArchiveService::default()
        .extract(&archive, &dest, None)
        .unwrap();
    assert_eq!(out, dest);
    assert!(dest.join("a.txt").is_file());
    assert!(dest.join("b.txt").is_file());
}

#[test]
fn test_package_missing_source_is_noop() {
    let temp = temp_dir_in_workspace();
    let written = ArchiveService::default()
        .package(
            &temp.path().join("does-not-exist"),
            temp.path(),
            "zlib-1.3-linux-clang.tar.xz",
        )
        .unwrap();
    assert!(!written);
    assert!(!temp.path().join("zlib-1.3-linux-clang.tar.xz").exists());
}

#[test]
fn test_package_then_extract_round_trip() {
    for name in [
        "zlib-1.3-linux-clang.tar.xz",
        "zlib-1.3-linux-clang.tar.gz",
        "zlib-1.3-windows-clang.zip",
    ] {
        let temp = temp_dir_in_workspace();
        let prefix = zlib_install_tree(&temp.path().join("install"));
        let packages = temp.path().join("packages");
        let service = ArchiveService::default();

        assert!(service.package(&prefix, &packages, name).unwrap());
        let artifact = packages.join(name);
        assert!(artifact.is_file(), "{} missing", name);

        let restored_root = temp.path().join("restored");
        let restored = service
            .extract(&artifact, &restored_root, Some("zlib-1.3"))
            .unwrap();
        assert_eq!(relative_files(&prefix), relative_files(&restored), "{}", name);
        assert_eq!(
            fs::read_to_string(restored.join("include/zlib.h")).unwrap(),
            "/* zlib */"
        );
    }
}

#[test]
fn test_packaging_twice_gives_identical_tar_entries() {
    let temp = temp_dir_in_workspace();
    let prefix = zlib_install_tree(&temp.path().join("install"));
    let service = ArchiveService::default();

    service.package(&prefix, &temp.path().join("a"), "z.tar.gz").unwrap();
    service.package(&prefix, &temp.path().join("b"), "z.tar.gz").unwrap();

    let entries = |path: PathBuf| -> Vec<(String, u64)> {
        let file = fs::File::open(path).unwrap();
        let mut archive = tar::Archive::new(flate2::read::GzDecoder::new(file));
        archive
            .entries()
            .unwrap()
            .map(|e| {
                let e = e.unwrap();
                (
                    e.path().unwrap().to_string_lossy().into_owned(),
                    e.header().mtime().unwrap(),
                )
            })
            .collect()
    };

    let first = entries(temp.path().join("a/z.tar.gz"));
    assert_eq!(first, entries(temp.path().join("b/z.tar.gz")));
    assert_eq!(first[0].0.trim_end_matches('/'), "zlib-1.3");
    assert!(first.iter().all(|(_, mtime)| *mtime == 0));
}

#[test]
fn test_seven_zip_without_archiver_fails() {
    let temp = temp_dir_in_workspace();
    let prefix = zlib_install_tree(&temp.path().join("install"));
    let err = ArchiveService::default()
        .package(&prefix, temp.path(), "zlib-1.3-windows-msvc.7z")
        .unwrap_err();
    assert!(matches!(err, ArchiveError::ArchiverMissing(_)));
}
