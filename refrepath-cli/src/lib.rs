// refrepath/src/lib.rs
pub mod batch;
pub mod commands;
pub mod config;
pub mod core;
pub mod rules;
pub mod scanner;
pub mod scene;
pub mod worker;

// Re-export key types
pub use batch::{BatchOrchestrator, RunReport};
pub use crate::core::{RefRepathError, ReferenceRecord, Result};
pub use rules::{PathResolver, Resolution, RewriteRule};
pub use scanner::SceneScanner;
