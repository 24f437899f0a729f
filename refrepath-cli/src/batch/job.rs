use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::{FileCause, FileStatus, ReferenceRecord};
use crate::rules::RewriteRule;
use crate::worker::{log_path_for, FileLog};

/// Lifecycle of one file inside a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Queued,
    Spawning,
    Running,
    Completed,
    TimedOut,
    Crashed,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::TimedOut | Self::Crashed)
    }

    fn can_advance_to(self, next: JobState) -> bool {
        matches!(
            (self, next),
            (Self::Queued, Self::Spawning)
                | (Self::Spawning, Self::Running)
                | (Self::Spawning, Self::Crashed)
                | (Self::Running, Self::Completed)
                | (Self::Running, Self::TimedOut)
                | (Self::Running, Self::Crashed)
        )
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            JobState::Queued => "queued",
            JobState::Spawning => "spawning",
            JobState::Running => "running",
            JobState::Completed => "completed",
            JobState::TimedOut => "timed_out",
            JobState::Crashed => "crashed",
        };
        f.write_str(label)
    }
}

/// How a worker process ended, as seen by its launcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalState {
    /// Exit status 0
    Completed,
    /// Wall-clock budget exceeded; the process was killed
    TimedOut,
    /// Spawn failure, non-zero exit or death by signal
    Crashed {
        exit_code: Option<i32>,
        message: String,
    },
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum JobError {
    #[error("Invalid job transition for {file}: {from} -> {to}")]
    InvalidTransition {
        file: PathBuf,
        from: JobState,
        to: JobState,
    },
}

/// One scene file queued for a worker.
#[derive(Debug, Clone)]
pub struct FileJob {
    file_path: PathBuf,
    rule: RewriteRule,
    log_path: PathBuf,
    state: JobState,
    exit_code: Option<i32>,
    cause: Option<FileCause>,
    error: Option<String>,
    saved_to: Option<PathBuf>,
    reference_records: Vec<ReferenceRecord>,
}

impl FileJob {
    pub fn new(file_path: impl Into<PathBuf>, rule: RewriteRule) -> Self {
        let file_path = file_path.into();
        let log_path = log_path_for(&file_path);
        Self::with_log_path(file_path, rule, log_path)
    }

    /// Job whose worker writes its log to `log_path` instead of next to
    /// the scene.
    pub fn with_log_path(
        file_path: impl Into<PathBuf>,
        rule: RewriteRule,
        log_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            file_path: file_path.into(),
            rule,
            log_path: log_path.into(),
            state: JobState::Queued,
            exit_code: None,
            cause: None,
            error: None,
            saved_to: None,
            reference_records: Vec::new(),
        }
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    pub fn rule(&self) -> &RewriteRule {
        &self.rule
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }

    pub fn cause(&self) -> Option<FileCause> {
        self.cause
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn saved_to(&self) -> Option<&Path> {
        self.saved_to.as_deref()
    }

    pub fn reference_records(&self) -> &[ReferenceRecord] {
        &self.reference_records
    }

    /// File-level outcome; only meaningful once terminal.
    pub fn status(&self) -> FileStatus {
        if self.state == JobState::Completed && self.cause.is_none() {
            FileStatus::Succeeded
        } else {
            FileStatus::Failed
        }
    }

    /// Move to a non-terminal state.
    pub fn advance(&mut self, next: JobState) -> Result<(), JobError> {
        if next.is_terminal() || !self.state.can_advance_to(next) {
            return Err(self.invalid(next));
        }
        self.state = next;
        Ok(())
    }

    /// Record how the worker ended and fold its log into the job.
    ///
    /// The exit code is set here and nowhere else, so a second call is an
    /// error.
    pub fn finish(&mut self, terminal: TerminalState) -> Result<(), JobError> {
        let next = match &terminal {
            TerminalState::Completed => JobState::Completed,
            TerminalState::TimedOut => JobState::TimedOut,
            TerminalState::Crashed { .. } => JobState::Crashed,
        };
        if !self.state.can_advance_to(next) {
            return Err(self.invalid(next));
        }

        match terminal {
            TerminalState::Completed => {
                self.exit_code = Some(0);
                match self.read_log() {
                    Ok(log) => self.adopt_log(log),
                    Err(message) => {
                        self.state = JobState::Crashed;
                        self.fail(FileCause::WorkerError, message);
                        return Ok(());
                    }
                }
            }
            TerminalState::TimedOut => {
                self.fail(FileCause::Timeout, "worker exceeded its time budget".to_string());
            }
            TerminalState::Crashed { exit_code, message } => {
                self.exit_code = exit_code;
                match self.read_log() {
                    Ok(log) if log.cause.is_some() => self.adopt_log(log),
                    _ => self.fail(FileCause::WorkerError, message),
                }
            }
        }

        self.state = next;
        Ok(())
    }

    fn read_log(&self) -> Result<FileLog, String> {
        let log = FileLog::read(&self.log_path)
            .map_err(|e| format!("unreadable log {}: {}", self.log_path.display(), e))?;
        if !log.is_consistent() {
            return Err(format!("inconsistent log {}", self.log_path.display()));
        }
        if log.scene != self.file_path {
            return Err(format!(
                "log {} describes {} instead",
                self.log_path.display(),
                log.scene.display()
            ));
        }
        Ok(log)
    }

    fn adopt_log(&mut self, log: FileLog) {
        self.cause = log.cause;
        self.error = log.error;
        self.saved_to = log.saved_to;
        self.reference_records = log.references;
    }

    fn fail(&mut self, cause: FileCause, message: String) {
        self.cause = Some(cause);
        self.error = Some(message);
    }

    fn invalid(&self, to: JobState) -> JobError {
        JobError::InvalidTransition {
            file: self.file_path.clone(),
            from: self.state,
            to,
        }
    }
}
