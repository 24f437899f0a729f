//! Document-editing sessions.
//!
//! A [`SceneHost`] opens exactly one scene per call and hands back a
//! [`SceneDocument`] that lives only as long as the worker needs it;
//! sessions are never reused across files.

mod ascii;
pub mod save;

pub use ascii::{MayaAsciiDocument, MayaAsciiHost};
pub use save::SaveMode;

use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SceneError {
    #[error("Cannot load {path}: {message}")]
    Load { path: PathBuf, message: String },

    #[error("Unsupported scene format for {path}: {message}")]
    UnsupportedFormat { path: PathBuf, message: String },

    #[error("Reference node not found: {0}")]
    UnknownNode(String),

    #[error("Path rejected for {node}: {reason}")]
    RejectedPath { node: String, reason: String },

    #[error("Cannot save {path}: {source}")]
    Save {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A reference as the host enumerates it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneReference {
    pub node: String,
    pub path: String,
}

/// Reference nodes the host reports but that cannot be repathed.
pub fn is_enumerable_node(node: &str) -> bool {
    !node.contains("sharedReferenceNode") && !node.contains("_UNKNOWN_REF_NODE_")
}

/// A loaded scene open for editing.
pub trait SceneDocument {
    /// Where the document was loaded from
    fn path(&self) -> &Path;

    /// Enumerable references, in document order, one per node
    fn references(&self) -> Vec<SceneReference>;

    /// Point `node` at `path`. Applied in memory until [`save_as`].
    ///
    /// [`save_as`]: SceneDocument::save_as
    fn set_reference_path(&mut self, node: &str, path: &str) -> Result<(), SceneError>;

    /// Whether any reference path was changed since loading
    fn is_modified(&self) -> bool;

    /// Write the document, edits included, to `target`.
    fn save_as(&mut self, target: &Path) -> Result<(), SceneError>;
}

/// Something able to open scene documents.
pub trait SceneHost {
    fn open(&self, path: &Path) -> Result<Box<dyn SceneDocument>, SceneError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_enumerable_node() {
        assert!(is_enumerable_node("chairRN"));
        assert!(!is_enumerable_node("sharedReferenceNode"));
        assert!(!is_enumerable_node("_UNKNOWN_REF_NODE_"));
        assert!(!is_enumerable_node("ns:_UNKNOWN_REF_NODE_1"));
    }
}
