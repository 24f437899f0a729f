use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of one reference inside one scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceStatus {
    Pending,
    Resolved,
    Unchanged,
    Failed,
}

/// One external reference of a loaded scene.
///
/// `resolved_path` is only ever set together with `Resolved`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceRecord {
    pub node_identifier: String,
    pub original_path: String,
    resolved_path: Option<String>,
    status: ReferenceStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl ReferenceRecord {
    pub fn new(node_identifier: impl Into<String>, original_path: impl Into<String>) -> Self {
        Self {
            node_identifier: node_identifier.into(),
            original_path: original_path.into(),
            resolved_path: None,
            status: ReferenceStatus::Pending,
            error: None,
        }
    }

    pub fn mark_resolved(&mut self, path: impl Into<String>) {
        self.resolved_path = Some(path.into());
        self.status = ReferenceStatus::Resolved;
        self.error = None;
    }

    pub fn mark_unchanged(&mut self) {
        self.resolved_path = None;
        self.status = ReferenceStatus::Unchanged;
        self.error = None;
    }

    pub fn mark_failed(&mut self, error: impl Into<String>) {
        self.resolved_path = None;
        self.status = ReferenceStatus::Failed;
        self.error = Some(error.into());
    }

    pub fn status(&self) -> ReferenceStatus {
        self.status
    }

    pub fn resolved_path(&self) -> Option<&str> {
        self.resolved_path.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Resolved path, or the literal `unchanged`.
    pub fn outcome_label(&self) -> &str {
        self.resolved_path.as_deref().unwrap_or("unchanged")
    }

    /// Guards the `resolved_path` iff `Resolved` invariant on data read
    /// back from a log.
    pub fn is_consistent(&self) -> bool {
        (self.status == ReferenceStatus::Resolved) == self.resolved_path.is_some()
            && (self.status == ReferenceStatus::Failed || self.error.is_none())
    }
}

/// File-level outcome reported by a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Succeeded,
    Failed,
}

/// Why a file failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FileCause {
    LoadError,
    SaveError,
    Timeout,
    WorkerError,
}

impl fmt::Display for FileCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FileCause::LoadError => "load-error",
            FileCause::SaveError => "save-error",
            FileCause::Timeout => "timeout",
            FileCause::WorkerError => "worker-error",
        };
        f.write_str(label)
    }
}
