use std::fs;
use std::path::PathBuf;

use batchcrop::fs_utils::{build_filter, collect_images, split_name, unique_destination};
use tempfile::tempdir;

#[test]
fn collect_images_filters_by_extension() {
    let tmp = tempdir().unwrap();
    fs::write(tmp.path().join("one.jpg"), b"x").unwrap();
    fs::write(tmp.path().join("two.PNG"), b"x").unwrap();
    fs::write(tmp.path().join("notes.txt"), b"x").unwrap();
    fs::write(tmp.path().join("noext"), b"x").unwrap();

    let mut files = collect_images(tmp.path(), false, None).unwrap();
    files.sort();
    let names: Vec<_> = files
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
        .collect();
    assert_eq!(names, vec!["one.jpg", "two.PNG"]);
}

#[test]
fn collect_images_recurses_only_when_asked() {
    let tmp = tempdir().unwrap();
    let sub = tmp.path().join("nested");
    fs::create_dir(&sub).unwrap();
    fs::write(tmp.path().join("top.jpg"), b"x").unwrap();
    fs::write(sub.join("deep.jpg"), b"x").unwrap();

    let flat = collect_images(tmp.path(), false, None).unwrap();
    assert_eq!(flat.len(), 1);

    let deep = collect_images(tmp.path(), true, None).unwrap();
    assert_eq!(deep.len(), 2);
}

#[test]
fn collect_images_applies_glob_filter() {
    let tmp = tempdir().unwrap();
    fs::write(tmp.path().join("IMG_0001.jpg"), b"x").unwrap();
    fs::write(tmp.path().join("IMG_0002.png"), b"x").unwrap();
    fs::write(tmp.path().join("DSC_0001.jpg"), b"x").unwrap();

    let filter = build_filter("IMG_*").unwrap();
    let mut files = collect_images(tmp.path(), false, Some(&filter)).unwrap();
    files.sort();
    assert_eq!(files.len(), 2);
    assert!(files.iter().all(|p| {
        p.file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("IMG_")
    }));
}

#[test]
fn build_filter_rejects_invalid_patterns() {
    assert!(build_filter("[").is_err());
    assert!(build_filter("IMG_*, DSC_*.jpg").is_ok());
}

#[test]
fn collect_images_rejects_missing_or_non_directories() {
    assert!(collect_images(&PathBuf::from("/definitely/not/here"), false, None).is_err());
    let tmp = tempdir().unwrap();
    let file = tmp.path().join("file.jpg");
    fs::write(&file, b"x").unwrap();
    assert!(collect_images(&file, false, None).is_err());
}

#[test]
fn unique_destination_suffixes_collisions() {
    let tmp = tempdir().unwrap();
    let name = std::ffi::OsString::from("photo.jpg");
    let first = unique_destination(tmp.path(), &name);
    assert_eq!(first, tmp.path().join("photo.jpg"));
    fs::write(&first, b"x").unwrap();

    let second = unique_destination(tmp.path(), &name);
    assert_eq!(second, tmp.path().join("photo-1.jpg"));
    fs::write(&second, b"x").unwrap();

    let third = unique_destination(tmp.path(), &name);
    assert_eq!(third, tmp.path().join("photo-2.jpg"));
}

#[test]
fn split_name_separates_stem_and_extension() {
    let (stem, ext) = split_name(std::ffi::OsStr::new("archive.tar.gz"));
    assert_eq!(stem, "archive.tar");
    assert_eq!(ext.as_deref(), Some("gz"));
    let (stem, ext) = split_name(std::ffi::OsStr::new("noext"));
    assert_eq!(stem, "noext");
    assert!(ext.is_none());
}
