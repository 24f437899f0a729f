use chrono::{DateTime, Local};
use serde::Serialize;
use std::fmt::Write as _;
use std::fs::{File, OpenOptions};
use std::io::{self, Write as _};
use std::path::{Path, PathBuf};

use super::job::{FileJob, JobState};
use crate::core::{FileCause, FileStatus, ReferenceRecord, ReferenceStatus, Result};
use crate::rules::RewriteRule;

/// Outcome of one file, as folded into the run report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileSummary {
    pub file_path: PathBuf,
    pub state: JobState,
    pub status: FileStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<FileCause>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub exit_code: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saved_to: Option<PathBuf>,
    pub references: Vec<ReferenceRecord>,
}

impl FileSummary {
    pub fn from_job(job: &FileJob) -> Self {
        Self {
            file_path: job.file_path().to_path_buf(),
            state: job.state(),
            status: job.status(),
            cause: job.cause(),
            error: job.error().map(str::to_string),
            exit_code: job.exit_code(),
            saved_to: job.saved_to().map(Path::to_path_buf),
            references: job.reference_records().to_vec(),
        }
    }

    pub fn count(&self, status: ReferenceStatus) -> usize {
        self.references.iter().filter(|r| r.status() == status).count()
    }
}

/// Results of one batch run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub scan_root: PathBuf,
    pub rule: RewriteRule,
    pub dry_run: bool,
    pub started_at: DateTime<Local>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Local>>,
    pub total_files: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub failed_references: usize,
    pub per_file_summaries: Vec<FileSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggregate_log: Option<PathBuf>,
}

impl RunReport {
    pub fn new(scan_root: &Path, rule: &RewriteRule, total_files: usize, dry_run: bool) -> Self {
        Self {
            scan_root: scan_root.to_path_buf(),
            rule: rule.clone(),
            dry_run,
            started_at: Local::now(),
            finished_at: None,
            total_files,
            succeeded: 0,
            failed: 0,
            failed_references: 0,
            per_file_summaries: Vec::new(),
            aggregate_log: None,
        }
    }

    pub fn record(&mut self, summary: FileSummary) {
        match summary.status {
            FileStatus::Succeeded => self.succeeded += 1,
            FileStatus::Failed => self.failed += 1,
        }
        self.failed_references += summary.count(ReferenceStatus::Failed);
        self.per_file_summaries.push(summary);
    }

    pub fn finalize(&mut self) {
        self.finished_at = Some(Local::now());
    }

    pub fn is_finalized(&self) -> bool {
        self.finished_at.is_some()
    }

    /// Every job completed and no reference failed.
    pub fn is_success(&self) -> bool {
        self.per_file_summaries.len() == self.total_files
            && self.failed == 0
            && self.failed_references == 0
            && self
                .per_file_summaries
                .iter()
                .all(|s| s.state == JobState::Completed)
    }

    pub fn exit_code(&self) -> i32 {
        if self.is_success() {
            0
        } else {
            1
        }
    }

    fn display_path<'a>(&self, path: &'a Path) -> std::borrow::Cow<'a, str> {
        match pathdiff::diff_paths(path, &self.scan_root) {
            Some(relative) if !relative.as_os_str().is_empty() => {
                relative.to_string_lossy().into_owned().into()
            }
            _ => path.to_string_lossy(),
        }
    }

    /// One line per file followed by the totals.
    pub fn format_summary(&self, with_references: bool) -> String {
        let mut out = String::new();

        for summary in &self.per_file_summaries {
            let path = self.display_path(&summary.file_path);
            match summary.status {
                FileStatus::Succeeded => {
                    let _ = writeln!(
                        out,
                        "[ok]     {} ({} resolved, {} unchanged, {} failed){}",
                        path,
                        summary.count(ReferenceStatus::Resolved),
                        summary.count(ReferenceStatus::Unchanged),
                        summary.count(ReferenceStatus::Failed),
                        match &summary.saved_to {
                            Some(saved) if *saved != summary.file_path => {
                                format!(" -> {}", self.display_path(saved))
                            }
                            _ => String::new(),
                        }
                    );
                }
                FileStatus::Failed => {
                    let cause = summary
                        .cause
                        .map(|c| c.to_string())
                        .unwrap_or_else(|| "worker-error".to_string());
                    let _ = writeln!(
                        out,
                        "[failed] {} [{}] {}",
                        path,
                        cause,
                        summary.error.as_deref().unwrap_or("")
                    );
                }
            }

            if with_references {
                for record in &summary.references {
                    let _ = write!(
                        out,
                        "         {}: {} -> {}",
                        record.node_identifier,
                        record.original_path,
                        record.outcome_label()
                    );
                    match record.error() {
                        Some(error) => {
                            let _ = writeln!(out, " (failed: {})", error);
                        }
                        None => out.push('\n'),
                    }
                }
            }
        }

        let _ = writeln!(
            out,
            "{} files: {} succeeded, {} failed, {} failed references{}",
            self.total_files,
            self.succeeded,
            self.failed,
            self.failed_references,
            if self.dry_run { " (dry run)" } else { "" }
        );
        out
    }

    /// Write `refrepath-<YYYYmmdd-HHMMSS>.log` into `dir`, with a `-N`
    /// suffix when a log of the same second already exists.
    pub fn write_aggregate_log(&mut self, dir: &Path) -> Result<PathBuf> {
        let stamp = self
            .finished_at
            .unwrap_or(self.started_at)
            .format("%Y%m%d-%H%M%S")
            .to_string();

        let mut content = String::new();
        let _ = writeln!(content, "refrepath batch run");
        let _ = writeln!(content, "scan root: {}", self.scan_root.display());
        let _ = writeln!(content, "rule: {}", self.rule);
        let _ = writeln!(content, "started: {}", self.started_at.to_rfc3339());
        if let Some(finished) = self.finished_at {
            let _ = writeln!(content, "finished: {}", finished.to_rfc3339());
        }
        content.push('\n');
        content.push_str(&self.format_summary(true));

        let (path, mut file) = create_unique_log(dir, &stamp)?;
        file.write_all(content.as_bytes())?;
        self.aggregate_log = Some(path.clone());
        Ok(path)
    }
}

fn create_unique_log(dir: &Path, stamp: &str) -> io::Result<(PathBuf, File)> {
    let mut attempt = 0u32;
    loop {
        let name = match attempt {
            0 => format!("refrepath-{}.log", stamp),
            n => format!("refrepath-{}-{}.log", stamp, n),
        };
        let path = dir.join(name);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => return Ok((path, file)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => attempt += 1,
            Err(e) => return Err(e),
        }
    }
}
