use anyhow::{Context, Result};
use clap::Args;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use super::RuleArgs;
use crate::batch::{BatchOrchestrator, SubprocessLauncher};
use crate::config::{resolve_host, Config, HOST_ENV};
use crate::core::output::{OutputFormat, OutputWriter};
use crate::core::RefRepathError;
use crate::scene::SaveMode;

#[derive(Args, Debug, Clone)]
pub struct BatchArgs {
    /// Directory searched recursively for .ma/.mb scenes
    pub root: PathBuf,

    #[command(flatten)]
    pub rule: RuleArgs,

    /// Host executable invoked as `<host> worker` (defaults to this binary)
    #[arg(long, env = HOST_ENV)]
    pub host: Option<PathBuf>,

    /// Config file to use instead of the usual lookup
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Per-file wall-clock budget in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Where edited scenes are written
    #[arg(long, value_enum)]
    pub save_mode: Option<SaveMode>,

    /// Do not write `.refrepathbackup` copies before saving in place
    #[arg(long)]
    pub no_backup: bool,

    /// Fail references whose new target does not exist
    #[arg(long)]
    pub check_exists: bool,

    /// Resolve and report without saving anything
    #[arg(long)]
    pub dry_run: bool,
}

/// Absolute scan root without the `\\?\` verbatim prefix, so the
/// `use-scan-root` sentinel and the aggregate log see ordinary paths.
fn scan_root_path(root: &Path) -> Result<PathBuf, RefRepathError> {
    let canonical = dunce::canonicalize(root).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            RefRepathError::RootNotFound(root.to_path_buf())
        } else {
            RefRepathError::IoError(e)
        }
    })?;
    if !canonical.is_dir() {
        return Err(RefRepathError::RootNotDirectory(canonical));
    }
    Ok(canonical)
}

/// Run the batch and return the process exit code.
pub async fn run(args: BatchArgs, format: OutputFormat, verbose: bool) -> Result<i32> {
    let root = scan_root_path(&args.root)?;

    let mut config = match &args.config {
        Some(path) => Config::load_from_file(path)?,
        None => Config::load(Some(&root))?,
    };
    if let Some(timeout) = args.timeout {
        anyhow::ensure!(timeout > 0, "--timeout must be greater than zero");
        config.batch.timeout_secs = timeout;
    }
    if let Some(save_mode) = args.save_mode {
        config.batch.save_mode = save_mode;
    }
    if args.no_backup {
        config.batch.backup = false;
    }
    if args.check_exists {
        config.batch.check_exists = true;
    }

    let rule = args.rule.to_rule(Some(&root))?;
    let host = resolve_host(args.host.as_deref(), &config.host)?;
    info!("Rule: {}", rule);
    info!("Host: {}", host.display());

    let launcher = SubprocessLauncher::new(
        host,
        Duration::from_secs(config.batch.timeout_secs),
        config.batch.worker_options(args.dry_run),
    );
    let orchestrator = BatchOrchestrator::new(&root, &rule, launcher)?
        .with_dry_run(args.dry_run)
        .with_progress(format == OutputFormat::Text);

    let report = orchestrator
        .run()
        .await
        .with_context(|| format!("Batch over {} failed", root.display()))?;

    OutputWriter::new(format).write_report(&report, verbose)?;
    Ok(report.exit_code())
}
