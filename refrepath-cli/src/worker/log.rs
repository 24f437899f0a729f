use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::{FileCause, FileStatus, ReferenceRecord, ReferenceStatus, Result};

/// Per-file log a worker leaves next to its scene.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileLog {
    pub scene: PathBuf,
    pub status: FileStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<FileCause>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Set when the scene was written, possibly to an increment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_to: Option<PathBuf>,
    #[serde(default)]
    pub dry_run: bool,
    pub references: Vec<ReferenceRecord>,
}

impl FileLog {
    pub fn succeeded(scene: &Path, references: Vec<ReferenceRecord>) -> Self {
        Self {
            scene: scene.to_path_buf(),
            status: FileStatus::Succeeded,
            cause: None,
            error: None,
            saved_to: None,
            dry_run: false,
            references,
        }
    }

    pub fn failed(
        scene: &Path,
        cause: FileCause,
        error: impl Into<String>,
        references: Vec<ReferenceRecord>,
    ) -> Self {
        Self {
            scene: scene.to_path_buf(),
            status: FileStatus::Failed,
            cause: Some(cause),
            error: Some(error.into()),
            saved_to: None,
            dry_run: false,
            references,
        }
    }

    pub fn failed_references(&self) -> usize {
        self.references
            .iter()
            .filter(|r| r.status() == ReferenceStatus::Failed)
            .count()
    }

    /// Structural checks applied before the orchestrator trusts a log.
    pub fn is_consistent(&self) -> bool {
        let cause_matches = match self.status {
            FileStatus::Succeeded => self.cause.is_none(),
            FileStatus::Failed => self.cause.is_some(),
        };
        cause_matches
            && self
                .references
                .iter()
                .all(|r| r.is_consistent() && r.status() != ReferenceStatus::Pending)
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn read(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// `<dir>/shot.ma` -> `<dir>/refrepath.batch-shot.ma.json`
pub fn log_path_for(scene: &Path) -> PathBuf {
    let name = scene
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    scene.with_file_name(format!("refrepath.batch-{}.json", name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_log_path_is_next_to_scene() {
        assert_eq!(
            log_path_for(Path::new("/proj/shots/sh010.ma")),
            PathBuf::from("/proj/shots/refrepath.batch-sh010.ma.json")
        );
    }

    #[test]
    fn test_write_then_read() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let scene = temp.path().join("shot.ma");

        let mut resolved = ReferenceRecord::new("chairRN", "Z:/a/chair.ma");
        resolved.mark_resolved("X:/a/chair.ma");
        let mut failed = ReferenceRecord::new("lampRN", "Z:/a/lamp.ma");
        failed.mark_failed("missing-target: X:/a/lamp.ma");

        let log = FileLog::succeeded(&scene, vec![resolved, failed]);
        let log_path = log_path_for(&scene);
        log.write(&log_path)?;

        let read = FileLog::read(&log_path)?;
        assert_eq!(read, log);
        assert!(read.is_consistent());
        assert_eq!(read.failed_references(), 1);
        Ok(())
    }

    #[test]
    fn test_malformed_log_is_rejected() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let log_path = temp.path().join("log.json");
        fs::write(&log_path, "{ not json")?;
        assert!(FileLog::read(&log_path).is_err());
        assert!(FileLog::read(&temp.path().join("absent.json")).is_err());
        Ok(())
    }

    #[test]
    fn test_inconsistent_status_and_cause() {
        let mut log = FileLog::succeeded(Path::new("a.ma"), Vec::new());
        log.cause = Some(FileCause::LoadError);
        assert!(!log.is_consistent());

        let pending = FileLog::succeeded(
            Path::new("a.ma"),
            vec![ReferenceRecord::new("aRN", "Z:/a.ma")],
        );
        assert!(!pending.is_consistent());
    }
}
