pub mod batch;
pub mod resolve;
pub mod scan;
pub mod worker;

use anyhow::{bail, Result};
use clap::Args;
use std::path::Path;

use crate::rules::{Replacement, RewriteRule};

/// Rule selection shared by `batch` and `resolve`.
///
/// With neither `--anchor` nor `--search`, the rule is common-denominator
/// anchored on the last segment of the new root (or the scan root) and
/// rooted at its parent.
#[derive(Args, Debug, Clone, Default)]
pub struct RuleArgs {
    /// Segment at which paths are cut (common-denominator rule)
    #[arg(long, conflicts_with = "search")]
    pub anchor: Option<String>,

    /// Root prepended to the anchored suffix
    #[arg(long, conflicts_with = "search")]
    pub new_root: Option<String>,

    /// Glob matched against path prefixes (search/replace rule)
    #[arg(long)]
    pub search: Option<String>,

    /// Replacement for the matched prefix
    #[arg(long, requires = "search", conflicts_with = "replace_with_scan_root")]
    pub replace: Option<String>,

    /// Replace the matched prefix with the scan root
    #[arg(long, requires = "search")]
    pub replace_with_scan_root: bool,
}

impl RuleArgs {
    /// Build the rule. `scan_root` supplies defaults and is bound into the
    /// scan-root sentinel.
    pub fn to_rule(&self, scan_root: Option<&Path>) -> Result<RewriteRule> {
        let scan_root_text = scan_root.map(|p| p.to_string_lossy().into_owned());

        let rule = if let Some(search) = &self.search {
            let replacement = match (&self.replace, self.replace_with_scan_root) {
                (Some(path), false) => Replacement::Path(path.clone()),
                (None, true) => Replacement::UseScanRoot,
                (None, false) => bail!("--search needs --replace or --replace-with-scan-root"),
                (Some(_), true) => {
                    bail!("--replace and --replace-with-scan-root are mutually exclusive")
                }
            };
            RewriteRule::search_replace(search.clone(), replacement)
        } else {
            let Some(new_root) = self.new_root.clone().or(scan_root_text) else {
                bail!("--new-root is required when no scan root is given");
            };
            match &self.anchor {
                Some(anchor) => RewriteRule::common_denominator(anchor.clone(), new_root),
                None => RewriteRule::from_new_root(&new_root)?,
            }
        };

        let rule = match scan_root {
            Some(root) => rule.bind_scan_root(root),
            None => rule,
        };
        if !rule.is_bound() {
            bail!("--replace-with-scan-root needs a scan root");
        }
        rule.validate()?;
        Ok(rule)
    }
}
