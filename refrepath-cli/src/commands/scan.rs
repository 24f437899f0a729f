use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::core::output::{OutputFormat, OutputWriter};
use crate::scanner::SceneScanner;

pub async fn run(root: PathBuf, format: OutputFormat) -> Result<()> {
    let scanner = SceneScanner::new(root);
    let files = scanner
        .scan()
        .with_context(|| format!("Cannot scan {}", scanner.root().display()))?;

    OutputWriter::new(format).write_scan(scanner.root(), &files)
}
