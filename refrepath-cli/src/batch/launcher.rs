use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

use super::job::{FileJob, JobState, TerminalState};
use crate::worker::{WorkerInvocation, WorkerOptions};

/// Runs the worker for one job and reports how it ended.
///
/// Implementations move the job from `spawning` to `running` once the
/// worker actually started.
#[async_trait]
pub trait WorkerLauncher: Send + Sync {
    async fn run(&self, job: &mut FileJob) -> TerminalState;
}

/// Launches `<host> worker` as a child process per job.
#[derive(Debug, Clone)]
pub struct SubprocessLauncher {
    host: PathBuf,
    args: Vec<String>,
    budget: Duration,
    options: WorkerOptions,
}

impl SubprocessLauncher {
    pub fn new(host: impl Into<PathBuf>, budget: Duration, options: WorkerOptions) -> Self {
        Self {
            host: host.into(),
            args: vec!["worker".to_string()],
            budget,
            options,
        }
    }

    pub fn host(&self) -> &std::path::Path {
        &self.host
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    fn command(&self, job: &FileJob) -> Result<Command, String> {
        let invocation = WorkerInvocation {
            scene: job.file_path().to_path_buf(),
            rule: job.rule().clone(),
            log: job.log_path().to_path_buf(),
            options: self.options.clone(),
        };
        let env = invocation
            .to_env()
            .map_err(|e| format!("cannot encode worker arguments: {}", e))?;

        let mut cmd = Command::new(&self.host);
        cmd.args(&self.args)
            .envs(env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = job.file_path().parent() {
            cmd.current_dir(dir);
        }
        Ok(cmd)
    }
}

#[async_trait]
impl WorkerLauncher for SubprocessLauncher {
    async fn run(&self, job: &mut FileJob) -> TerminalState {
        let crashed = |message: String| TerminalState::Crashed {
            exit_code: None,
            message,
        };

        let mut cmd = match self.command(job) {
            Ok(cmd) => cmd,
            Err(message) => return crashed(message),
        };

        let child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                warn!("Cannot spawn {}: {}", self.host.display(), e);
                return crashed(format!("cannot spawn {}: {}", self.host.display(), e));
            }
        };
        if let Err(e) = job.advance(JobState::Running) {
            warn!("{}", e);
        }
        debug!(pid = ?child.id(), "Worker started for {}", job.file_path().display());

        // Dropping the child on timeout kills it
        let output = match timeout(self.budget, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return crashed(format!("lost track of worker: {}", e)),
            Err(_) => {
                warn!(
                    "Worker for {} exceeded {}s, killed",
                    job.file_path().display(),
                    self.budget.as_secs()
                );
                return TerminalState::TimedOut;
            }
        };

        for line in String::from_utf8_lossy(&output.stderr).lines() {
            debug!(target: "refrepath::worker", "{}", line);
        }
        for line in String::from_utf8_lossy(&output.stdout).lines() {
            debug!(target: "refrepath::worker", "{}", line);
        }

        if output.status.success() {
            TerminalState::Completed
        } else {
            let message = match output.status.code() {
                Some(code) => format!("worker exited with status {}", code),
                None => "worker terminated by a signal".to_string(),
            };
            TerminalState::Crashed {
                exit_code: output.status.code(),
                message,
            }
        }
    }
}
