//! Process-per-file batch driver.
//!
//! Files are discovered up front, then handed one at a time to a
//! [`WorkerLauncher`]. Each job's outcome is folded into a [`RunReport`];
//! no per-file failure ever stops the queue.

pub mod job;
pub mod launcher;
pub mod license;
pub mod report;

pub use job::{FileJob, JobState, TerminalState};
pub use launcher::{SubprocessLauncher, WorkerLauncher};
pub use license::HostLicense;
pub use report::{FileSummary, RunReport};

use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::core::{FileStatus, Result};
use crate::rules::{PathResolver, RewriteRule};
use crate::scanner::SceneScanner;
use crate::worker::log_path_for;

pub struct BatchOrchestrator<L: WorkerLauncher> {
    scan_root: PathBuf,
    rule: RewriteRule,
    launcher: L,
    license: HostLicense,
    dry_run: bool,
    show_progress: bool,
}

impl<L: WorkerLauncher> BatchOrchestrator<L> {
    /// Validate `rule` and bind its scan-root sentinel to `scan_root`.
    ///
    /// Nothing on disk is touched when this fails.
    pub fn new(scan_root: impl Into<PathBuf>, rule: &RewriteRule, launcher: L) -> Result<Self> {
        let scan_root = scan_root.into();
        let rule = rule.bind_scan_root(&scan_root);
        PathResolver::new(&rule)?;

        Ok(Self {
            scan_root,
            rule,
            launcher,
            license: HostLicense::new(),
            dry_run: false,
            show_progress: false,
        })
    }

    /// Mark the run as a dry run: worker logs go to a scratch directory
    /// and the aggregate log is not written.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn rule(&self) -> &RewriteRule {
        &self.rule
    }

    pub fn license(&self) -> &HostLicense {
        &self.license
    }

    pub async fn run(&self) -> Result<RunReport> {
        let files = SceneScanner::new(&self.scan_root).scan()?;
        info!(
            "Found {} scene files under {}",
            files.len(),
            self.scan_root.display()
        );

        // Dry-run workers log to a scratch directory, never next to scenes
        let scratch = if self.dry_run {
            let dir = tempfile::Builder::new()
                .prefix("refrepath-dry-run-")
                .tempdir()?;
            debug!("Dry-run logs go to {}", dir.path().display());
            Some(dir)
        } else {
            None
        };

        let mut report = RunReport::new(&self.scan_root, &self.rule, files.len(), self.dry_run);
        let progress = self.progress_bar(files.len() as u64);

        for (idx, file) in files.into_iter().enumerate() {
            progress.set_message(display_name(&file));
            let job = match &scratch {
                Some(dir) => {
                    let log_name = format!("{:05}-{}", idx, display_name(&log_path_for(&file)));
                    let log_path = dir.path().join(log_name);
                    self.run_job(FileJob::with_log_path(&file, self.rule.clone(), log_path))
                        .await
                }
                None => {
                    let job = FileJob::new(&file, self.rule.clone());
                    remove_stale_log(job.log_path());
                    self.run_job(job).await
                }
            };
            let summary = FileSummary::from_job(&job);

            match summary.status {
                FileStatus::Succeeded => info!(
                    file = %file.display(),
                    state = %summary.state,
                    "File done"
                ),
                FileStatus::Failed => warn!(
                    file = %file.display(),
                    state = %summary.state,
                    cause = ?summary.cause,
                    "File failed: {}",
                    summary.error.as_deref().unwrap_or("")
                ),
            }

            report.record(summary);
            progress.inc(1);
        }

        progress.finish_and_clear();
        report.finalize();

        if !self.dry_run {
            let path = report.write_aggregate_log(&self.scan_root)?;
            info!("Aggregate log written to {}", path.display());
        }

        Ok(report)
    }

    async fn run_job(&self, mut job: FileJob) -> FileJob {
        if let Err(e) = job.advance(JobState::Spawning) {
            warn!("{}", e);
        }

        let terminal = match self.license.acquire().await {
            Ok(_permit) => self.launcher.run(&mut job).await,
            Err(e) => TerminalState::Crashed {
                exit_code: None,
                message: format!("host license unavailable: {}", e),
            },
        };

        if let Err(e) = job.finish(terminal) {
            warn!("{}", e);
        }
        job
    }

    fn progress_bar(&self, len: u64) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let bar = ProgressBar::new(len);
        if let Ok(style) =
            ProgressStyle::default_bar().template("{spinner:.green} [{bar:30}] {pos}/{len} {msg}")
        {
            bar.set_style(style.progress_chars("=> "));
        }
        bar
    }
}

/// A log left by an earlier run must never be mistaken for this one.
fn remove_stale_log(log_path: &Path) {
    match fs::remove_file(log_path) {
        Ok(()) => debug!("Removed stale log {}", log_path.display()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!("Cannot remove stale log {}: {}", log_path.display(), e),
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{FileCause, ReferenceRecord};
    use crate::rules::Replacement;
    use crate::worker::FileLog;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Pretends to be a worker: writes a log according to the file name.
    struct FakeLauncher {
        license: Mutex<Option<HostLicense>>,
        max_in_flight: AtomicUsize,
        seen: Mutex<Vec<PathBuf>>,
    }

    impl FakeLauncher {
        fn new() -> Self {
            Self {
                license: Mutex::new(None),
                max_in_flight: AtomicUsize::new(0),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl WorkerLauncher for FakeLauncher {
        async fn run(&self, job: &mut FileJob) -> TerminalState {
            if let Some(license) = self.license.lock().unwrap().as_ref() {
                self.max_in_flight
                    .fetch_max(license.in_flight(), Ordering::SeqCst);
            }
            self.seen.lock().unwrap().push(job.file_path().to_path_buf());
            job.advance(JobState::Running).unwrap();

            let name = display_name(job.file_path());
            let scene = job.file_path();
            if name.starts_with("broken") {
                FileLog::failed(scene, FileCause::LoadError, "missing header", Vec::new())
                    .write(job.log_path())
                    .unwrap();
                return TerminalState::Crashed {
                    exit_code: Some(1),
                    message: "worker exited with status 1".to_string(),
                };
            }
            if name.starts_with("slow") {
                return TerminalState::TimedOut;
            }
            if name.starts_with("silent") {
                return TerminalState::Completed;
            }

            let mut record = ReferenceRecord::new("chairRN", "Z:/projects/demo/chair.ma");
            record.mark_resolved("X:/work/pro/demo/chair.ma");
            FileLog::succeeded(scene, vec![record])
                .write(job.log_path())
                .unwrap();
            TerminalState::Completed
        }
    }

    fn touch(root: &Path, name: &str) -> PathBuf {
        let path = root.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, "//Maya ASCII 2023 scene\n").unwrap();
        path
    }

    fn rule() -> RewriteRule {
        RewriteRule::common_denominator("demo", "X:/work/pro")
    }

    #[tokio::test]
    async fn test_one_corrupted_file_of_three() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "a.ma");
        touch(temp.path(), "broken.ma");
        touch(temp.path(), "c.mb");

        let orchestrator = BatchOrchestrator::new(temp.path(), &rule(), FakeLauncher::new()).unwrap();
        let report = orchestrator.run().await.unwrap();

        assert_eq!(report.total_files, 3);
        assert_eq!(report.succeeded, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.exit_code(), 1);

        let broken = &report.per_file_summaries[1];
        assert_eq!(broken.state, JobState::Crashed);
        assert_eq!(broken.cause, Some(FileCause::LoadError));
        assert_eq!(broken.exit_code, Some(1));

        // The queue went on past the failure
        assert_eq!(report.per_file_summaries[2].status, FileStatus::Succeeded);
        assert!(report.aggregate_log.as_deref().is_some_and(Path::exists));
    }

    #[tokio::test]
    async fn test_timeout_and_missing_log_do_not_stop_queue() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "a/silent.ma");
        touch(temp.path(), "b/slow.ma");
        touch(temp.path(), "c/ok.ma");

        let orchestrator = BatchOrchestrator::new(temp.path(), &rule(), FakeLauncher::new()).unwrap();
        let report = orchestrator.run().await.unwrap();

        let states: Vec<_> = report.per_file_summaries.iter().map(|s| s.state).collect();
        assert_eq!(
            states,
            vec![JobState::Crashed, JobState::TimedOut, JobState::Completed]
        );
        assert_eq!(
            report.per_file_summaries[0].cause,
            Some(FileCause::WorkerError)
        );
        assert_eq!(report.per_file_summaries[1].cause, Some(FileCause::Timeout));
        assert!(!report.is_success());
    }

    #[tokio::test]
    async fn test_stale_log_is_never_read() {
        let temp = TempDir::new().unwrap();
        let scene = touch(temp.path(), "silent.ma");
        FileLog::succeeded(&scene, Vec::new())
            .write(&crate::worker::log_path_for(&scene))
            .unwrap();

        let orchestrator = BatchOrchestrator::new(temp.path(), &rule(), FakeLauncher::new()).unwrap();
        let report = orchestrator.run().await.unwrap();
        assert_eq!(report.per_file_summaries[0].state, JobState::Crashed);
    }

    #[tokio::test]
    async fn test_jobs_run_one_at_a_time_in_order() {
        let temp = TempDir::new().unwrap();
        let expected = vec![
            touch(temp.path(), "a/x.ma"),
            touch(temp.path(), "a/y.ma"),
            touch(temp.path(), "b.ma"),
        ];

        let orchestrator = BatchOrchestrator::new(temp.path(), &rule(), FakeLauncher::new()).unwrap();
        *orchestrator.launcher.license.lock().unwrap() = Some(orchestrator.license().clone());

        let report = orchestrator.run().await.unwrap();
        assert!(report.is_success());
        assert_eq!(*orchestrator.launcher.seen.lock().unwrap(), expected);
        assert_eq!(orchestrator.launcher.max_in_flight.load(Ordering::SeqCst), 1);
        assert_eq!(orchestrator.license().in_flight(), 0);
    }

    #[tokio::test]
    async fn test_dry_run_skips_aggregate_log() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "a.ma");

        let orchestrator = BatchOrchestrator::new(temp.path(), &rule(), FakeLauncher::new())
            .unwrap()
            .with_dry_run(true);
        let report = orchestrator.run().await.unwrap();
        assert_eq!(report.aggregate_log, None);
        assert!(report.dry_run);
    }

    #[tokio::test]
    async fn test_dry_run_writes_nothing_next_to_scenes() {
        let temp = TempDir::new().unwrap();
        let scene = touch(temp.path(), "a.ma");
        let broken = touch(temp.path(), "broken.ma");
        let stale = crate::worker::log_path_for(&broken);
        FileLog::succeeded(&broken, Vec::new()).write(&stale).unwrap();

        let orchestrator = BatchOrchestrator::new(temp.path(), &rule(), FakeLauncher::new())
            .unwrap()
            .with_dry_run(true);
        let report = orchestrator.run().await.unwrap();

        assert_eq!(report.succeeded, 1);
        assert_eq!(report.per_file_summaries[0].references.len(), 1);
        assert_eq!(report.per_file_summaries[1].cause, Some(FileCause::LoadError));

        assert!(!crate::worker::log_path_for(&scene).exists());
        assert!(stale.exists(), "a dry run must not delete existing logs");
        assert_eq!(FileLog::read(&stale).unwrap().status, FileStatus::Succeeded);
    }

    #[tokio::test]
    async fn test_empty_root_succeeds() {
        let temp = TempDir::new().unwrap();
        let orchestrator = BatchOrchestrator::new(temp.path(), &rule(), FakeLauncher::new()).unwrap();
        let report = orchestrator.run().await.unwrap();
        assert_eq!(report.total_files, 0);
        assert!(report.is_success());
    }

    #[test]
    fn test_invalid_rule_rejected_up_front() {
        let temp = TempDir::new().unwrap();
        let bad = RewriteRule::common_denominator("", "X:/work/pro");
        assert!(BatchOrchestrator::new(temp.path(), &bad, FakeLauncher::new()).is_err());
    }

    #[test]
    fn test_sentinel_bound_to_scan_root() {
        let temp = TempDir::new().unwrap();
        let rule = RewriteRule::search_replace("*projects", Replacement::UseScanRoot);
        let orchestrator = BatchOrchestrator::new(temp.path(), &rule, FakeLauncher::new()).unwrap();

        assert_eq!(
            orchestrator.rule(),
            &RewriteRule::search_replace(
                "*projects",
                Replacement::Path(temp.path().to_string_lossy().into_owned())
            )
        );
    }
}
