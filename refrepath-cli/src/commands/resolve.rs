use anyhow::Result;
use std::path::PathBuf;

use super::RuleArgs;
use crate::core::output::{OutputFormat, OutputWriter, ResolutionEntry};
use crate::rules::PathResolver;

/// Apply a rule to literal paths without touching any scene.
pub async fn run(
    paths: Vec<String>,
    rule_args: RuleArgs,
    scan_root: Option<PathBuf>,
    format: OutputFormat,
) -> Result<()> {
    let rule = rule_args.to_rule(scan_root.as_deref())?;
    let resolver = PathResolver::new(&rule)?;
    tracing::debug!("Resolving {} paths with {}", paths.len(), rule);

    let entries: Vec<ResolutionEntry> = paths
        .iter()
        .map(|path| ResolutionEntry::new(path.as_str(), &resolver.resolve(path)))
        .collect();

    OutputWriter::new(format).write_resolutions(&entries)
}
