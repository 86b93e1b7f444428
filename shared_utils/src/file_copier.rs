//! File Copier Module
//!
//! Guarantees a destination-side artifact for every input: whatever happens
//! to the metadata write, the original bytes end up under the destination
//! directory. Timestamps of the source are carried over to the copy.

use crate::app_error::AppError;
use std::io;
use std::path::{Path, PathBuf};

/// Prefix of in-progress replacement files next to a destination
pub const STAGING_PREFIX: &str = ".staging-";

/// What `ensure_destination` did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CopyOutcome {
    Copied(PathBuf),
    AlreadyPresent(PathBuf),
}

impl CopyOutcome {
    pub fn path(&self) -> &Path {
        match self {
            CopyOutcome::Copied(p) | CopyOutcome::AlreadyPresent(p) => p,
        }
    }
}

/// `dest_dir/<file name of source>`
pub fn destination_path(source: &Path, dest_dir: &Path) -> PathBuf {
    match source.file_name() {
        Some(name) => dest_dir.join(name),
        None => dest_dir.to_path_buf(),
    }
}

/// Map `dir` (somewhere under `source_root`) onto the same relative place under `dest_root`
pub fn mirror_directory(source_root: &Path, dest_root: &Path, dir: &Path) -> PathBuf {
    match dir.strip_prefix(source_root) {
        Ok(rel) if rel.as_os_str().is_empty() => dest_root.to_path_buf(),
        Ok(rel) => dest_root.join(rel),
        Err(_) => dest_root.to_path_buf(),
    }
}

/// Create `dir` and its parents
pub fn create_destination_dir(dir: &Path) -> Result<(), AppError> {
    if dir.is_dir() {
        return Ok(());
    }
    std::fs::create_dir_all(dir).map_err(|source| AppError::DirectoryCreate {
        path: dir.to_path_buf(),
        source,
    })
}

/// Copy `source` into `dest_dir` unless a file with the same name is already there
pub fn ensure_destination(source: &Path, dest_dir: &Path) -> io::Result<CopyOutcome> {
    let dest = destination_path(source, dest_dir);
    if dest.is_file() {
        return Ok(CopyOutcome::AlreadyPresent(dest));
    }
    copy_preserving_times(source, &dest)?;
    Ok(CopyOutcome::Copied(dest))
}

/// Plain copy (overwrites) followed by atime/mtime preservation
pub fn copy_preserving_times(source: &Path, dest: &Path) -> io::Result<()> {
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::copy(source, dest)?;
    apply_file_timestamps(source, dest);
    Ok(())
}

/// Byte-for-byte comparison; a missing file compares unequal
pub fn same_contents(a: &Path, b: &Path) -> bool {
    match (std::fs::metadata(a), std::fs::metadata(b)) {
        (Ok(ma), Ok(mb)) if ma.len() == mb.len() => {}
        _ => return false,
    }
    match (std::fs::read(a), std::fs::read(b)) {
        (Ok(x), Ok(y)) => x == y,
        _ => false,
    }
}

/// Move a fully written staging file over `dest`
pub fn replace_with(staging: &Path, dest: &Path) -> io::Result<()> {
    std::fs::rename(staging, dest)
}

/// Hidden staging path next to `dest`, same extension so the tool keeps the format
pub fn staging_path(dest: &Path) -> PathBuf {
    let name = dest
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    dest.with_file_name(format!("{}{}", STAGING_PREFIX, name))
}

fn apply_file_timestamps(src: &Path, dst: &Path) {
    let Ok(m) = std::fs::metadata(src) else {
        return;
    };
    let atime = filetime::FileTime::from_last_access_time(&m);
    let mtime = filetime::FileTime::from_last_modification_time(&m);
    if let Err(e) = filetime::set_file_times(dst, atime, mtime) {
        tracing::warn!(path = %dst.display(), error = %e, "Failed to set file times");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_mirror_directory() {
        let src = Path::new("/photos/src");
        let dst = Path::new("/photos/out");
        assert_eq!(mirror_directory(src, dst, src), dst);
        assert_eq!(
            mirror_directory(src, dst, Path::new("/photos/src/2020/trip")),
            Path::new("/photos/out/2020/trip")
        );
    }

    #[test]
    fn test_ensure_destination_copies_once() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("a.jpg");
        let out = temp.path().join("out");
        fs::create_dir(&out).unwrap();
        fs::write(&src, b"original").unwrap();

        let first = ensure_destination(&src, &out).unwrap();
        assert_eq!(first, CopyOutcome::Copied(out.join("a.jpg")));

        fs::write(out.join("a.jpg"), b"with metadata").unwrap();
        let second = ensure_destination(&src, &out).unwrap();
        assert_eq!(second, CopyOutcome::AlreadyPresent(out.join("a.jpg")));
        assert_eq!(fs::read(out.join("a.jpg")).unwrap(), b"with metadata");
    }

    #[test]
    fn test_copy_preserves_mtime() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("a.mov");
        let dst = temp.path().join("nested/a.mov");
        fs::write(&src, b"clip").unwrap();
        let old = filetime::FileTime::from_unix_time(1_600_000_000, 0);
        filetime::set_file_mtime(&src, old).unwrap();

        copy_preserving_times(&src, &dst).unwrap();
        let meta = fs::metadata(&dst).unwrap();
        assert_eq!(filetime::FileTime::from_last_modification_time(&meta), old);
    }

    #[test]
    fn test_same_contents() {
        let temp = TempDir::new().unwrap();
        let a = temp.path().join("a.heic");
        let b = temp.path().join("a.jpeg");
        let c = temp.path().join("c.jpeg");
        fs::write(&a, b"photo A").unwrap();
        fs::write(&b, b"photo A").unwrap();
        fs::write(&c, b"photo B").unwrap();

        assert!(same_contents(&a, &b));
        assert!(!same_contents(&a, &c));
        assert!(!same_contents(&a, &temp.path().join("missing")));
    }

    #[test]
    fn test_staging_path_keeps_extension() {
        let staging = staging_path(Path::new("/out/IMG_1.HEIC"));
        assert_eq!(staging, Path::new("/out/.staging-IMG_1.HEIC"));
    }

    #[test]
    fn test_create_destination_dir_error() {
        let temp = TempDir::new().unwrap();
        let blocker = temp.path().join("file");
        fs::write(&blocker, b"x").unwrap();
        let err = create_destination_dir(&blocker.join("sub")).unwrap_err();
        assert!(matches!(err, AppError::DirectoryCreate { .. }));
    }

    proptest! {
        #[test]
        fn prop_mirror_keeps_relative_path(parts in proptest::collection::vec("[a-z0-9]{1,8}", 0..4)) {
            let src = Path::new("/photos/src");
            let dst = Path::new("/photos/out");
            let rel: PathBuf = parts.iter().collect();
            let mirrored = mirror_directory(src, dst, &src.join(&rel));
            prop_assert_eq!(mirrored.strip_prefix(dst).unwrap(), rel.as_path());
        }
    }
}
