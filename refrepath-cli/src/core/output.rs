use anyhow::Result;
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::batch::RunReport;
use crate::core::{FileStatus, ReferenceStatus};
use crate::rules::{Resolution, UnchangedReason};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Markdown,
}

/// One resolved literal path, as printed by `resolve`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolutionEntry {
    pub original: String,
    pub resolved: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<UnchangedReason>,
}

impl ResolutionEntry {
    pub fn new(original: impl Into<String>, resolution: &Resolution) -> Self {
        let (resolved, reason) = match resolution {
            Resolution::Resolved(path) => (Some(path.clone()), None),
            Resolution::Unchanged(reason) => (None, Some(*reason)),
        };
        Self {
            original: original.into(),
            resolved,
            reason,
        }
    }

    fn outcome(&self) -> &str {
        self.resolved.as_deref().unwrap_or("unchanged")
    }
}

#[derive(Serialize)]
struct ScanListing<'a> {
    root: &'a Path,
    total: usize,
    files: &'a [PathBuf],
}

pub struct OutputWriter {
    format: OutputFormat,
}

impl OutputWriter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn write_scan(&self, root: &Path, files: &[PathBuf]) -> Result<()> {
        match self.format {
            OutputFormat::Json => {
                let listing = ScanListing {
                    root,
                    total: files.len(),
                    files,
                };
                println!("{}", serde_json::to_string_pretty(&listing)?);
            }
            OutputFormat::Text => {
                for file in files {
                    println!("{}", file.display());
                }
                eprintln!("{} scene files under {}", files.len(), root.display());
            }
            OutputFormat::Markdown => {
                println!("# Scene files under `{}`\n", root.display());
                for file in files {
                    println!("- `{}`", file.display());
                }
                println!("\n**Total:** {}", files.len());
            }
        }
        Ok(())
    }

    pub fn write_resolutions(&self, entries: &[ResolutionEntry]) -> Result<()> {
        match self.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(entries)?);
            }
            OutputFormat::Text => {
                for entry in entries {
                    println!("{} -> {}", entry.original, entry.outcome());
                }
            }
            OutputFormat::Markdown => {
                println!("| Original | Resolved |");
                println!("|---|---|");
                for entry in entries {
                    println!("| `{}` | `{}` |", entry.original, entry.outcome());
                }
            }
        }
        Ok(())
    }

    pub fn write_report(&self, report: &RunReport, verbose: bool) -> Result<()> {
        match self.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(report)?);
            }
            OutputFormat::Text => {
                print!("{}", report.format_summary(verbose));
                if let Some(log) = &report.aggregate_log {
                    println!("Log: {}", log.display());
                }
            }
            OutputFormat::Markdown => {
                println!("# Repath report for `{}`\n", report.scan_root.display());
                println!("Rule: `{}`\n", report.rule);
                println!("| File | Status | Resolved | Unchanged | Failed | Cause |");
                println!("|---|---|---|---|---|---|");
                for summary in &report.per_file_summaries {
                    let status = match summary.status {
                        FileStatus::Succeeded => "succeeded",
                        FileStatus::Failed => "failed",
                    };
                    println!(
                        "| `{}` | {} | {} | {} | {} | {} |",
                        summary.file_path.display(),
                        status,
                        summary.count(ReferenceStatus::Resolved),
                        summary.count(ReferenceStatus::Unchanged),
                        summary.count(ReferenceStatus::Failed),
                        summary.cause.map(|c| c.to_string()).unwrap_or_default()
                    );
                }
                println!(
                    "\n**Total:** {} files, {} succeeded, {} failed, {} failed references",
                    report.total_files, report.succeeded, report.failed, report.failed_references
                );
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_entry() {
        let resolved = ResolutionEntry::new("Z:/a", &Resolution::Resolved("X:/a".to_string()));
        assert_eq!(resolved.outcome(), "X:/a");
        assert_eq!(resolved.reason, None);

        let unchanged =
            ResolutionEntry::new("Z:/a", &Resolution::Unchanged(UnchangedReason::NoMatch));
        assert_eq!(unchanged.outcome(), "unchanged");
        assert_eq!(
            serde_json::to_value(&unchanged).unwrap(),
            serde_json::json!({"original": "Z:/a", "resolved": null, "reason": "no-match"})
        );
    }
}
