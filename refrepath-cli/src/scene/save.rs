use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Suffix appended to a scene's file name for its pre-edit copy.
pub const BACKUP_SUFFIX: &str = ".refrepathbackup";

/// Zero padding of saved increments (`scene.0003.ma`).
pub const INCREMENT_PADDING: usize = 4;

/// Where an edited scene is written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum SaveMode {
    /// Overwrite the scene itself
    #[default]
    InPlace,
    /// Save next to it as the first free `<stem>.NNNN.<ext>`
    Increment,
}

/// `scene.ma` -> `scene.ma.refrepathbackup`
pub fn backup_path(scene: &Path) -> PathBuf {
    let mut name = scene.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(BACKUP_SUFFIX);
    scene.with_file_name(name)
}

fn increment_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(r"\.\d{{{}}}$", INCREMENT_PADDING)).expect("static regex is valid")
    })
}

/// First non-existing increment of `current`.
///
/// An existing increment on the stem is replaced rather than stacked, and
/// numbering always starts from 1:
/// `shot.ma` -> `shot.0001.ma`, `shot.0001.ma` -> `shot.0002.ma` once
/// `shot.0001.ma` exists.
pub fn increment_path(current: &Path) -> PathBuf {
    let stem = current
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let base = increment_regex().replace(&stem, "").into_owned();
    let extension = current
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let mut increment = 1usize;
    loop {
        let name = format!(
            "{}.{:0width$}{}",
            base,
            increment,
            extension,
            width = INCREMENT_PADDING
        );
        let candidate = current.with_file_name(name);
        if !candidate.exists() {
            return candidate;
        }
        increment += 1;
    }
}

/// Target path of a save under `mode`.
pub fn save_target(scene: &Path, mode: SaveMode) -> PathBuf {
    match mode {
        SaveMode::InPlace => scene.to_path_buf(),
        SaveMode::Increment => increment_path(scene),
    }
}
