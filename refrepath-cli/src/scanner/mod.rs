mod filters;

pub use filters::{detect_scene_format, is_scene_file, SceneFormat};

use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::core::{RefRepathError, Result};

/// Recursive scene discovery under one root directory.
pub struct SceneScanner {
    root: PathBuf,
}

impl SceneScanner {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// All scene files below the root, sorted by full path.
    ///
    /// Symbolic links are never followed, so the walk terminates even
    /// when the tree links back onto itself. Unreadable entries are
    /// skipped with a warning.
    pub fn scan(&self) -> Result<Vec<PathBuf>> {
        if !self.root.exists() {
            return Err(RefRepathError::RootNotFound(self.root.clone()));
        }
        if !self.root.is_dir() {
            return Err(RefRepathError::RootNotDirectory(self.root.clone()));
        }

        let mut files = Vec::new();

        for entry in WalkDir::new(&self.root).follow_links(false) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable entry under {}: {}", self.root.display(), e);
                    continue;
                }
            };
            if entry.file_type().is_file() && is_scene_file(entry.path()) {
                files.push(entry.into_path());
            }
        }

        files.sort();
        debug!("Found {} scene files under {}", files.len(), self.root.display());
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_scan_empty_directory() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let files = SceneScanner::new(temp.path()).scan()?;
        assert!(files.is_empty());
        Ok(())
    }

    #[test]
    fn test_scan_nested_is_sorted_and_filtered() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let root = temp.path();
        fs::create_dir_all(root.join("shots/sh020"))?;
        fs::create_dir_all(root.join("assets/chars"))?;
        fs::write(root.join("shots/sh020/anim.ma"), "")?;
        fs::write(root.join("shots/layout.mb"), "")?;
        fs::write(root.join("assets/chars/hero.ma"), "")?;
        fs::write(root.join("assets/chars/hero.ma.refrepathbackup"), "")?;
        fs::write(root.join("assets/notes.txt"), "")?;

        let scanner = SceneScanner::new(root);
        let files = scanner.scan()?;
        let relative: Vec<_> = files
            .iter()
            .map(|f| f.strip_prefix(root).unwrap().to_path_buf())
            .collect();

        assert_eq!(
            relative,
            vec![
                PathBuf::from("assets/chars/hero.ma"),
                PathBuf::from("shots/layout.mb"),
                PathBuf::from("shots/sh020/anim.ma"),
            ]
        );
        assert_eq!(scanner.scan()?, files);
        Ok(())
    }

    #[test]
    fn test_scan_missing_root() {
        let err = SceneScanner::new("/definitely/not/here").scan().unwrap_err();
        assert!(matches!(err, RefRepathError::RootNotFound(_)));
    }

    #[test]
    fn test_scan_file_root() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let file = temp.path().join("a.ma");
        fs::write(&file, "")?;
        let err = SceneScanner::new(&file).scan().unwrap_err();
        assert!(matches!(err, RefRepathError::RootNotDirectory(_)));
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn test_scan_does_not_follow_symlink_cycles() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let root = temp.path();
        fs::create_dir_all(root.join("a"))?;
        fs::write(root.join("a/scene.ma"), "")?;
        std::os::unix::fs::symlink(root, root.join("a/loop"))?;

        let files = SceneScanner::new(root).scan()?;
        assert_eq!(files, vec![root.join("a/scene.ma")]);
        Ok(())
    }
}
