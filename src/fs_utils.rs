use std::{
    ffi::OsStr,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use walkdir::WalkDir;

pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "bmp", "gif", "webp", "tiff", "tif", "ico", "avif",
];

/// Compile a comma-separated list of glob patterns matched against file
/// names, e.g. `"IMG_*,DSC_*.jpg"`.
pub fn build_filter(patterns: &str) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        builder.add(Glob::new(pattern).with_context(|| format!("invalid pattern {pattern}"))?);
    }
    builder.build().context("unable to build filter")
}

pub fn collect_images(
    root: &Path,
    recursive: bool,
    filter: Option<&GlobSet>,
) -> Result<Vec<PathBuf>> {
    if !root.exists() {
        return Err(anyhow!("{} does not exist", root.display()));
    }
    if !root.is_dir() {
        return Err(anyhow!("{} is not a directory", root.display()));
    }

    let accepted = |path: &Path| {
        is_supported_image(path)
            && filter.is_none_or(|set| {
                path.file_name()
                    .map(|name| set.is_match(Path::new(name)))
                    .unwrap_or(false)
            })
    };

    let mut files = Vec::new();
    if recursive {
        for entry in WalkDir::new(root)
            .follow_links(false)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            if entry.file_type().is_file() && accepted(entry.path()) {
                files.push(entry.path().to_path_buf());
            }
        }
    } else {
        for entry in fs::read_dir(root)
            .with_context(|| format!("unable to read directory {}", root.display()))?
        {
            let entry =
                entry.with_context(|| format!("unable to read entry in {}", root.display()))?;
            let path = entry.path();
            if path.is_file() && accepted(&path) {
                files.push(path);
            }
        }
    }
    Ok(files)
}

fn is_supported_image(path: &Path) -> bool {
    matches!(
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|s| s.to_ascii_lowercase()),
        Some(ref ext) if SUPPORTED_EXTENSIONS.contains(&ext.as_str())
    )
}

/// First path under `dir` that does not collide with an existing file,
/// suffixing `-1`, `-2`, ... when needed. Keeps exports of same-named
/// sources from different folders apart.
pub fn unique_destination(dir: &Path, file_name: &OsStr) -> PathBuf {
    let mut candidate = dir.join(file_name);
    if !candidate.exists() {
        return candidate;
    }
    let (stem, ext) = split_name(file_name);
    for idx in 1.. {
        let new_name = if let Some(ext) = &ext {
            format!("{stem}-{idx}.{ext}")
        } else {
            format!("{stem}-{idx}")
        };
        candidate = dir.join(new_name);
        if !candidate.exists() {
            break;
        }
    }
    candidate
}

pub fn split_name(file_name: &OsStr) -> (String, Option<String>) {
    let name = file_name.to_string_lossy();
    if let Some((stem, ext)) = name.rsplit_once('.') {
        (stem.to_string(), Some(ext.to_string()))
    } else {
        (name.to_string(), None)
    }
}
