mod resolver;
pub mod segments;

pub use resolver::{strip_copy_number, PathResolver, Resolution, UnchangedReason};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::core::{RefRepathError, Result};

/// Replacement side of a search/replace rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Replacement {
    /// A literal path
    Path(String),

    /// Stands for the batch's scan root until [`RewriteRule::bind_scan_root`]
    UseScanRoot,
}

/// How reference paths are rewritten. Exactly one rule is active per run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum RewriteRule {
    /// Keep everything from the first segment named `anchor_name` and
    /// replace what precedes it with `new_root`.
    CommonDenominator { anchor_name: String, new_root: String },

    /// Replace the shortest glob-matching prefix with `replacement`.
    SearchReplace {
        search_pattern: String,
        replacement: Replacement,
    },
}

impl RewriteRule {
    pub fn common_denominator(anchor_name: impl Into<String>, new_root: impl Into<String>) -> Self {
        Self::CommonDenominator {
            anchor_name: anchor_name.into(),
            new_root: new_root.into(),
        }
    }

    pub fn search_replace(search_pattern: impl Into<String>, replacement: Replacement) -> Self {
        Self::SearchReplace {
            search_pattern: search_pattern.into(),
            replacement,
        }
    }

    /// Rule used when only a new root is known: the root's last segment
    /// is the anchor and its parent the new root, so paths land at
    /// `new_root/<rest after the anchor>`.
    pub fn from_new_root(new_root: &str) -> Result<Self> {
        let last = segments::split(new_root).last().copied().ok_or_else(|| {
            RefRepathError::invalid_rule("new_root", "cannot derive an anchor from an empty root")
        })?;
        let anchor = last.text(new_root);

        let head = &new_root[..last.start];
        let parent = match head.trim_end_matches(segments::is_separator) {
            "" => head,
            trimmed => trimmed,
        };
        if parent.is_empty() {
            return Err(RefRepathError::invalid_rule(
                "new_root",
                format!("`{}` has no parent directory to keep `{}` under", new_root, anchor),
            ));
        }
        Ok(Self::common_denominator(anchor, parent))
    }

    /// Check every parameter without touching the filesystem.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::CommonDenominator {
                anchor_name,
                new_root,
            } => {
                if anchor_name.is_empty() {
                    return Err(RefRepathError::invalid_rule("anchor", "must not be empty"));
                }
                if anchor_name.chars().any(segments::is_separator) {
                    return Err(RefRepathError::invalid_rule(
                        "anchor",
                        format!("`{}` must be a single path segment", anchor_name),
                    ));
                }
                check_path("new_root", new_root)
            }
            Self::SearchReplace {
                search_pattern,
                replacement,
            } => {
                if search_pattern.is_empty() {
                    return Err(RefRepathError::invalid_rule("search", "must not be empty"));
                }
                glob::Pattern::new(search_pattern).map_err(|e| RefRepathError::InvalidPattern {
                    pattern: search_pattern.clone(),
                    message: e.msg.to_string(),
                })?;
                match replacement {
                    Replacement::Path(path) => check_path("replace", path),
                    Replacement::UseScanRoot => Ok(()),
                }
            }
        }
    }

    /// Substitute the scan-root sentinel. Evaluated once per batch, with
    /// the top-level scan root.
    pub fn bind_scan_root(&self, scan_root: &Path) -> Self {
        match self {
            Self::SearchReplace {
                search_pattern,
                replacement: Replacement::UseScanRoot,
            } => Self::SearchReplace {
                search_pattern: search_pattern.clone(),
                replacement: Replacement::Path(scan_root.to_string_lossy().into_owned()),
            },
            other => other.clone(),
        }
    }

    pub fn is_bound(&self) -> bool {
        !matches!(
            self,
            Self::SearchReplace {
                replacement: Replacement::UseScanRoot,
                ..
            }
        )
    }
}

fn check_path(parameter: &'static str, path: &str) -> Result<()> {
    if path.trim().is_empty() {
        return Err(RefRepathError::invalid_rule(parameter, "must not be empty"));
    }
    if path.contains('\0') {
        return Err(RefRepathError::invalid_rule(
            parameter,
            "must not contain NUL characters",
        ));
    }
    Ok(())
}

impl fmt::Display for Replacement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Replacement::Path(path) => write!(f, "{}", path),
            Replacement::UseScanRoot => write!(f, "<scan root>"),
        }
    }
}

impl fmt::Display for RewriteRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RewriteRule::CommonDenominator {
                anchor_name,
                new_root,
            } => write!(f, "common-denominator anchor={} new_root={}", anchor_name, new_root),
            RewriteRule::SearchReplace {
                search_pattern,
                replacement,
            } => write!(f, "search-replace pattern={} replacement={}", search_pattern, replacement),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_validate_common_denominator() {
        assert!(RewriteRule::common_denominator("demo", "X:/work/pro").validate().is_ok());
        assert!(RewriteRule::common_denominator("", "X:/work/pro").validate().is_err());
        assert!(RewriteRule::common_denominator("demo", "  ").validate().is_err());
        assert!(RewriteRule::common_denominator("a/b", "X:/work").validate().is_err());
    }

    #[test]
    fn test_validate_search_replace() {
        let ok = RewriteRule::search_replace("*projects", Replacement::Path("X:/pro".into()));
        assert!(ok.validate().is_ok());

        let sentinel = RewriteRule::search_replace("*projects", Replacement::UseScanRoot);
        assert!(sentinel.validate().is_ok());

        let empty = RewriteRule::search_replace("", Replacement::UseScanRoot);
        assert!(empty.validate().is_err());

        let broken = RewriteRule::search_replace("[abc", Replacement::UseScanRoot);
        match broken.validate() {
            Err(RefRepathError::InvalidPattern { pattern, .. }) => assert_eq!(pattern, "[abc"),
            other => panic!("expected InvalidPattern, got {:?}", other),
        }
    }

    #[test]
    fn test_bind_scan_root() {
        let rule = RewriteRule::search_replace("*projects", Replacement::UseScanRoot);
        assert!(!rule.is_bound());

        let bound = rule.bind_scan_root(&PathBuf::from("/mnt/work"));
        assert!(bound.is_bound());
        assert_eq!(
            bound,
            RewriteRule::search_replace("*projects", Replacement::Path("/mnt/work".into()))
        );

        let cd = RewriteRule::common_denominator("demo", "/x");
        assert_eq!(cd.bind_scan_root(&PathBuf::from("/mnt")), cd);
    }

    #[test]
    fn test_from_new_root_anchors_on_last_segment() {
        let rule = RewriteRule::from_new_root("X:/work/pro/").unwrap();
        assert_eq!(rule, RewriteRule::common_denominator("pro", "X:/work"));

        let rule = RewriteRule::from_new_root("/pro").unwrap();
        assert_eq!(rule, RewriteRule::common_denominator("pro", "/"));

        assert!(RewriteRule::from_new_root("//").is_err());
        assert!(RewriteRule::from_new_root("pro").is_err());
    }

    #[test]
    fn test_from_new_root_places_rest_under_root() {
        let rule = RewriteRule::from_new_root("/mnt/work/pro").unwrap();
        let resolver = PathResolver::new(&rule).unwrap();

        assert_eq!(
            resolver.resolve("Z:/old/pro/assets/chair.ma"),
            Resolution::Resolved("/mnt/work/pro/assets/chair.ma".to_string())
        );
        assert_eq!(
            resolver.resolve("/mnt/work/pro/assets/chair.ma"),
            Resolution::Unchanged(UnchangedReason::AlreadyTarget)
        );
        assert_eq!(
            resolver.resolve("/pro/assets/chair.ma"),
            Resolution::Resolved("/mnt/work/pro/assets/chair.ma".to_string())
        );
    }

    #[test]
    fn test_rule_json_shape() {
        let rule = RewriteRule::search_replace("*p", Replacement::UseScanRoot);
        let json = serde_json::to_string(&rule).unwrap();
        assert_eq!(
            json,
            r#"{"kind":"search-replace","search_pattern":"*p","replacement":"use-scan-root"}"#
        );
        let back: RewriteRule = serde_json::from_str(&json).unwrap();
        assert_eq!(back, rule);
    }
}
