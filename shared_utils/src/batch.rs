//! Batch Processing Module
//!
//! Directory and file enumeration. Listing order is always lexical by file
//! name so every tie-break downstream is reproducible across platforms.

use crate::file_copier::STAGING_PREFIX;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// `root` itself, plus every subdirectory when `nested`
pub fn collect_directories(root: &Path, nested: bool) -> Vec<PathBuf> {
    if !nested {
        return vec![root.to_path_buf()];
    }

    WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e.path()))
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_dir())
        .map(|e| e.path().to_path_buf())
        .collect()
}

/// Immediate regular files of `dir` sorted by name, leftover staging files excluded
pub fn list_files(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && !is_staging(p))
        .collect();
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// Lower-cased extension without the dot ("" when none)
pub fn extension_lowercase(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default()
}

pub fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    let ext = extension_lowercase(path);
    extensions.contains(&ext.as_str())
}

fn is_staging(path: &Path) -> bool {
    path.file_name()
        .map(|n| n.to_string_lossy().starts_with(STAGING_PREFIX))
        .unwrap_or(false)
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with('.'))
        .unwrap_or(false)
}

#[derive(Debug, Clone, Default)]
pub struct BatchResult {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub errors: Vec<(PathBuf, String)>,
}

impl BatchResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn success(&mut self) {
        self.total += 1;
        self.succeeded += 1;
    }

    pub fn fail(&mut self, path: PathBuf, error: String) {
        self.total += 1;
        self.failed += 1;
        self.errors.push((path, error));
    }

    pub fn skip(&mut self) {
        self.total += 1;
        self.skipped += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_list_files_sorted_and_filtered() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("b.jpg"), "").unwrap();
        fs::write(temp.path().join("a.jpg.json"), "").unwrap();
        fs::write(temp.path().join(".hidden.jpg"), "").unwrap();
        fs::write(temp.path().join(".staging-b.jpg"), "").unwrap();
        fs::create_dir(temp.path().join("sub")).unwrap();

        let files = list_files(temp.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec![".hidden.jpg", "a.jpg.json", "b.jpg"]);
    }

    #[test]
    fn test_collect_directories_nested() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("2020/trip")).unwrap();
        fs::create_dir_all(temp.path().join("2019")).unwrap();
        fs::create_dir_all(temp.path().join(".hidden")).unwrap();

        let flat = collect_directories(temp.path(), false);
        assert_eq!(flat, vec![temp.path().to_path_buf()]);

        let nested = collect_directories(temp.path(), true);
        assert_eq!(nested.len(), 4);
        assert_eq!(nested[0], temp.path());
        assert!(nested.contains(&temp.path().join("2020/trip")));
    }

    #[test]
    fn test_extension_helpers() {
        assert_eq!(extension_lowercase(Path::new("a/IMG_1.HEIC")), "heic");
        assert_eq!(extension_lowercase(Path::new("noext")), "");
        assert!(has_extension(Path::new("x.MP4"), &["mp4", "mov"]));
    }

    #[test]
    fn test_batch_result() {
        let mut r = BatchResult::new();
        r.success();
        r.fail(PathBuf::from("x"), "boom".into());
        r.skip();
        assert_eq!(r.total, 3);
        assert_eq!((r.succeeded, r.failed, r.skipped), (1, 1, 1));
        assert_eq!(r.errors, vec![(PathBuf::from("x"), "boom".to_string())]);
    }
}
