use tracing::{error, info};

use crate::core::FileStatus;
use crate::scene::MayaAsciiHost;
use crate::worker::{self, WorkerInvocation};

pub const EXIT_SUCCEEDED: i32 = 0;
pub const EXIT_FILE_FAILED: i32 = 1;
pub const EXIT_INVOCATION_ERROR: i32 = 2;

/// Process the scene named in the `REFREPATH_ARG_*` environment and
/// return the worker exit code.
pub fn run() -> i32 {
    let invocation = match WorkerInvocation::from_env() {
        Ok(invocation) => invocation,
        Err(e) => {
            error!("Invalid worker invocation: {}", e);
            return EXIT_INVOCATION_ERROR;
        }
    };

    match worker::execute(&MayaAsciiHost, &invocation) {
        Ok(log) => {
            info!(
                "{}: {:?}, log at {}",
                invocation.scene.display(),
                log.status,
                invocation.log.display()
            );
            match log.status {
                FileStatus::Succeeded => EXIT_SUCCEEDED,
                FileStatus::Failed => EXIT_FILE_FAILED,
            }
        }
        Err(e) => {
            error!("Worker for {} failed: {}", invocation.scene.display(), e);
            EXIT_INVOCATION_ERROR
        }
    }
}
