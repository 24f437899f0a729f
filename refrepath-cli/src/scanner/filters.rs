use serde::{Deserialize, Serialize};
use std::path::Path;

/// On-disk encoding of a scene document.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Hash, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum SceneFormat {
    /// `.ma`
    Ascii,
    /// `.mb`
    Binary,
}

impl SceneFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "ma" => Some(SceneFormat::Ascii),
            "mb" => Some(SceneFormat::Binary),
            _ => None,
        }
    }
}

/// Detect the scene format from a file path
pub fn detect_scene_format(path: &Path) -> Option<SceneFormat> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .and_then(SceneFormat::from_extension)
}

/// Check if a file is a scene the batch should process
pub fn is_scene_file(path: &Path) -> bool {
    detect_scene_format(path).is_some()
}
