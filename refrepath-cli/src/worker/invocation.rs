//! Parameters handed from the orchestrator to a worker subprocess.
//!
//! Everything travels through environment variables so that any host
//! executable (this binary's `worker` subcommand or a wrapper around the
//! editor's batch mode) can pick them up without argument quoting issues.

use std::path::PathBuf;

use super::WorkerOptions;
use crate::core::{RefRepathError, Result};
use crate::rules::RewriteRule;

pub const ENV_SCENE: &str = "REFREPATH_ARG_SCENE";
pub const ENV_RULE: &str = "REFREPATH_ARG_RULE";
pub const ENV_LOG: &str = "REFREPATH_ARG_LOG";
pub const ENV_OPTIONS: &str = "REFREPATH_ARG_OPTIONS";

/// Disable the editor's network features in worker sessions.
pub const HOST_ENV_OVERRIDES: [(&str, &str); 4] = [
    ("MAYA_DISABLE_CLIC_IPM", "1"),
    ("MAYA_DISABLE_CIP", "1"),
    ("MAYA_DISABLE_CER", "1"),
    ("MAYA_DISABLE_ADP", "1"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerInvocation {
    pub scene: PathBuf,
    pub rule: RewriteRule,
    pub log: PathBuf,
    pub options: WorkerOptions,
}

impl WorkerInvocation {
    pub fn to_env(&self) -> Result<Vec<(String, String)>> {
        let mut env = vec![
            (ENV_SCENE.to_string(), self.scene.to_string_lossy().into_owned()),
            (ENV_RULE.to_string(), serde_json::to_string(&self.rule)?),
            (ENV_LOG.to_string(), self.log.to_string_lossy().into_owned()),
            (ENV_OPTIONS.to_string(), serde_json::to_string(&self.options)?),
        ];
        env.extend(
            HOST_ENV_OVERRIDES
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string())),
        );
        Ok(env)
    }

    /// Read an invocation through `lookup` (normally `std::env::var`).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let require = |name: &'static str| {
            lookup(name)
                .filter(|v| !v.is_empty())
                .ok_or(RefRepathError::MissingWorkerArgument(name))
        };

        let scene = PathBuf::from(require(ENV_SCENE)?);
        let rule: RewriteRule = serde_json::from_str(&require(ENV_RULE)?)?;
        let log = PathBuf::from(require(ENV_LOG)?);
        let options = match lookup(ENV_OPTIONS).filter(|v| !v.is_empty()) {
            Some(json) => serde_json::from_str(&json)?,
            None => WorkerOptions::default(),
        };

        Ok(Self {
            scene,
            rule,
            log,
            options,
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }
}
