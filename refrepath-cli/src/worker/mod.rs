//! Repathing of a single scene.
//!
//! [`run_worker`] is what a worker process executes: open the scene in a
//! fresh session, resolve every enumerable reference, write the changes
//! back and report the outcome as a [`FileLog`]. [`repath_document`] is the
//! part that works on a document somebody else already opened.

pub mod invocation;
pub mod log;

pub use invocation::WorkerInvocation;
pub use log::{log_path_for, FileLog};

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::core::{FileCause, ReferenceRecord, Result};
use crate::rules::{strip_copy_number, PathResolver, Resolution, RewriteRule};
use crate::scene::save::{backup_path, save_target};
use crate::scene::{SaveMode, SceneDocument, SceneHost};

/// Cause recorded on a reference whose resolved target is not on disk.
pub const MISSING_TARGET: &str = "missing-target";

/// Knobs of a single worker run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerOptions {
    #[serde(default)]
    pub save_mode: SaveMode,

    /// Copy the scene to `<name>.refrepathbackup` before an in-place save
    #[serde(default = "default_backup")]
    pub backup: bool,

    /// Refuse resolved paths that do not exist
    #[serde(default)]
    pub check_exists: bool,

    /// Resolve and report without saving
    #[serde(default)]
    pub dry_run: bool,
}

fn default_backup() -> bool {
    true
}

impl Default for WorkerOptions {
    fn default() -> Self {
        Self {
            save_mode: SaveMode::default(),
            backup: default_backup(),
            check_exists: false,
            dry_run: false,
        }
    }
}

/// Resolve and write back every enumerable reference of `document`.
///
/// Per-reference problems end up on the returned records; nothing here
/// fails the document as a whole.
pub fn repath_document(
    document: &mut dyn SceneDocument,
    resolver: &PathResolver,
    options: &WorkerOptions,
) -> Vec<ReferenceRecord> {
    let references = document.references();
    let mut records = Vec::with_capacity(references.len());

    for reference in references {
        let mut record = ReferenceRecord::new(&reference.node, &reference.path);

        match resolver.resolve(&reference.path) {
            Resolution::Unchanged(reason) => {
                debug!(node = %reference.node, ?reason, "Reference unchanged");
                record.mark_unchanged();
            }
            Resolution::Resolved(new_path) => {
                if options.check_exists && !Path::new(strip_copy_number(&new_path)).exists() {
                    warn!(node = %reference.node, target = %new_path, "Resolved target does not exist");
                    record.mark_failed(format!("{}: {}", MISSING_TARGET, new_path));
                } else {
                    match document.set_reference_path(&reference.node, &new_path) {
                        Ok(()) => {
                            debug!(
                                node = %reference.node,
                                from = %reference.path,
                                to = %new_path,
                                "Reference repathed"
                            );
                            record.mark_resolved(new_path);
                        }
                        Err(e) => {
                            warn!(node = %reference.node, "Write-back failed: {}", e);
                            record.mark_failed(e.to_string());
                        }
                    }
                }
            }
        }

        records.push(record);
    }

    records
}

/// Process one scene end to end. Never fails: every problem is folded
/// into the returned log.
pub fn run_worker(
    host: &dyn SceneHost,
    scene: &Path,
    resolver: &PathResolver,
    options: &WorkerOptions,
) -> FileLog {
    info!("Opening {}", scene.display());

    let mut document = match host.open(scene) {
        Ok(document) => document,
        Err(e) => {
            warn!("Cannot open {}: {}", scene.display(), e);
            let mut log = FileLog::failed(scene, FileCause::LoadError, e.to_string(), Vec::new());
            log.dry_run = options.dry_run;
            return log;
        }
    };

    let references = repath_document(document.as_mut(), resolver, options);

    let mut log = FileLog::succeeded(scene, references);
    log.dry_run = options.dry_run;

    if options.dry_run || !document.is_modified() {
        debug!("Nothing to save for {}", scene.display());
        return log;
    }

    match save(document.as_mut(), scene, options) {
        Ok(target) => {
            info!("Saved {}", target.display());
            log.saved_to = Some(target);
        }
        Err(message) => {
            warn!("Cannot save {}: {}", scene.display(), message);
            log = FileLog::failed(scene, FileCause::SaveError, message, log.references);
        }
    }

    log
}

fn save(
    document: &mut dyn SceneDocument,
    scene: &Path,
    options: &WorkerOptions,
) -> std::result::Result<std::path::PathBuf, String> {
    let target = save_target(scene, options.save_mode);

    if options.save_mode == SaveMode::InPlace && options.backup {
        let backup = backup_path(scene);
        fs::copy(scene, &backup)
            .map_err(|e| format!("cannot write backup {}: {}", backup.display(), e))?;
        debug!("Backup written to {}", backup.display());
    }

    document.save_as(&target).map_err(|e| e.to_string())?;
    Ok(target)
}

/// Run the invocation against `host` and persist its log.
///
/// Errors are reserved for problems that leave no log behind.
pub fn execute(host: &dyn SceneHost, invocation: &WorkerInvocation) -> Result<FileLog> {
    let resolver = PathResolver::new(&invocation.rule)?;
    let log = run_worker(host, &invocation.scene, &resolver, &invocation.options);
    log.write(&invocation.log)?;
    Ok(log)
}

/// Shorthand for a one-off rule, mostly used by tests and the library API.
pub fn run_with_rule(
    host: &dyn SceneHost,
    scene: &Path,
    rule: &RewriteRule,
    options: &WorkerOptions,
) -> Result<FileLog> {
    let resolver = PathResolver::new(rule)?;
    Ok(run_worker(host, scene, &resolver, options))
}
