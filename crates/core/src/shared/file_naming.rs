//! Numbered-file helpers for append-only directories.
//!
//! Files are named `<n>.<ext>` where `n` is a decimal stem. The next free
//! stem is always derived from what is on disk, never from a counter, so
//! allocation survives process restarts.

use std::io;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// Parses a stem made only of ASCII digits. Anything else, including an
/// empty stem or a value that overflows `u64`, is not numeric.
pub fn numeric_stem(stem: &str) -> Option<u64> {
    if stem.is_empty() || !stem.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    stem.parse().ok()
}

/// `max(numeric stems) + 1`, or `0` when there are none.
pub fn next_file_stem<'a>(stems: impl IntoIterator<Item = &'a str>) -> u64 {
    stems
        .into_iter()
        .filter_map(numeric_stem)
        .max()
        .map_or(0, |max| max.saturating_add(1))
}

pub fn file_stem(path: &Path) -> Option<&str> {
    path.file_stem().and_then(|s| s.to_str())
}

/// Lists regular files directly inside `dir` whose extension is `ext`.
///
/// A missing directory yields an empty list. Results are ordered by
/// numeric stem first, then non-numeric stems by name.
pub fn list_files_with_extension(dir: &Path, ext: &str) -> io::Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(io::Error::from)?;
        let path = entry.path();
        if entry.file_type().is_file() && path.extension().is_some_and(|e| e == ext) {
            files.push(path.to_path_buf());
        }
    }
    sort_by_numeric_stem(&mut files);
    Ok(files)
}

pub fn sort_by_numeric_stem(paths: &mut [PathBuf]) {
    paths.sort_by(|a, b| {
        let ka = file_stem(a).map(|s| (numeric_stem(s).is_none(), numeric_stem(s), s.to_string()));
        let kb = file_stem(b).map(|s| (numeric_stem(s).is_none(), numeric_stem(s), s.to_string()));
        ka.cmp(&kb)
    });
}

/// Path of the next free `<n>.<ext>` file in `dir`.
pub fn next_file_path(dir: &Path, ext: &str) -> io::Result<PathBuf> {
    let existing = list_files_with_extension(dir, ext)?;
    let next = next_file_stem(existing.iter().filter_map(|p| file_stem(p)));
    Ok(dir.join(format!("{next}.{ext}")))
}
