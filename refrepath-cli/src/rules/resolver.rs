use glob::{MatchOptions, Pattern};
use serde::Serialize;

use super::segments;
use super::{Replacement, RewriteRule};
use crate::core::{RefRepathError, Result};

/// Why a path was left alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnchangedReason {
    /// Nothing to resolve
    EmptyPath,
    /// Anchor not found / pattern did not match
    NoMatch,
    /// The rule maps the path onto itself
    AlreadyTarget,
}

/// Outcome of resolving one path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Resolved(String),
    Unchanged(UnchangedReason),
}

impl Resolution {
    pub fn resolved_path(&self) -> Option<&str> {
        match self {
            Resolution::Resolved(path) => Some(path),
            Resolution::Unchanged(_) => None,
        }
    }
}

enum Compiled {
    CommonDenominator {
        anchor_name: String,
        new_root: String,
    },
    SearchReplace {
        pattern: Pattern,
        replacement: String,
    },
}

/// Pure path rewriter. Built once per rule; resolving never fails.
pub struct PathResolver {
    compiled: Compiled,
}

impl PathResolver {
    /// Validate `rule` and prepare it for resolution.
    ///
    /// The scan-root sentinel must already be bound.
    pub fn new(rule: &RewriteRule) -> Result<Self> {
        rule.validate()?;

        let compiled = match rule {
            RewriteRule::CommonDenominator {
                anchor_name,
                new_root,
            } => Compiled::CommonDenominator {
                anchor_name: anchor_name.clone(),
                new_root: new_root.clone(),
            },
            RewriteRule::SearchReplace {
                search_pattern,
                replacement,
            } => {
                let replacement = match replacement {
                    Replacement::Path(path) => path.clone(),
                    Replacement::UseScanRoot => {
                        return Err(RefRepathError::invalid_rule(
                            "replace",
                            "scan-root sentinel was not bound to a scan root",
                        ))
                    }
                };
                let pattern =
                    Pattern::new(search_pattern).map_err(|e| RefRepathError::InvalidPattern {
                        pattern: search_pattern.clone(),
                        message: e.msg.to_string(),
                    })?;
                Compiled::SearchReplace {
                    pattern,
                    replacement,
                }
            }
        };

        Ok(Self { compiled })
    }

    /// Compute the new location of `original`.
    ///
    /// A trailing Maya copy number (`{3}`) is set aside while resolving and
    /// put back on the result.
    pub fn resolve(&self, original: &str) -> Resolution {
        if original.is_empty() {
            return Resolution::Unchanged(UnchangedReason::EmptyPath);
        }

        let (base, copy_number) = split_copy_number(original);
        if base.is_empty() {
            return Resolution::Unchanged(UnchangedReason::EmptyPath);
        }

        let resolved = match &self.compiled {
            Compiled::CommonDenominator {
                anchor_name,
                new_root,
            } => resolve_common_denominator(base, anchor_name, new_root),
            Compiled::SearchReplace {
                pattern,
                replacement,
            } => resolve_search_replace(base, pattern, replacement),
        };

        match resolved {
            Resolution::Resolved(path) => {
                let path = format!("{}{}", path, copy_number);
                if path == original {
                    Resolution::Unchanged(UnchangedReason::AlreadyTarget)
                } else {
                    Resolution::Resolved(path)
                }
            }
            unchanged => unchanged,
        }
    }
}

fn resolve_common_denominator(original: &str, anchor_name: &str, new_root: &str) -> Resolution {
    let parts = segments::split(original);
    let Some(anchor_idx) = parts.iter().position(|s| s.text(original) == anchor_name) else {
        return Resolution::Unchanged(UnchangedReason::NoMatch);
    };

    // Already rewritten: the path is new_root followed directly by the anchor.
    let root_len = segments::split(new_root).len();
    if segments::starts_with_segments(original, new_root)
        && parts
            .get(root_len)
            .is_some_and(|s| s.text(original) == anchor_name)
    {
        return Resolution::Unchanged(UnchangedReason::AlreadyTarget);
    }

    let suffix = &original[parts[anchor_idx].start..];
    let separator = segments::joining_separator(new_root, original);
    Resolution::Resolved(segments::join(new_root, suffix, separator))
}

fn resolve_search_replace(original: &str, pattern: &Pattern, replacement: &str) -> Resolution {
    // Any path under the replacement is a possible output of this rule
    if segments::starts_with_segments(original, replacement) {
        return Resolution::Unchanged(UnchangedReason::AlreadyTarget);
    }

    let options = MatchOptions {
        case_sensitive: true,
        require_literal_separator: false,
        require_literal_leading_dot: false,
    };

    // Candidate prefixes end on segment boundaries; the shortest match wins.
    let matched_end = segments::split(original)
        .iter()
        .map(|s| s.end)
        .find(|&end| pattern.matches_with(&original[..end], options));

    let Some(end) = matched_end else {
        return Resolution::Unchanged(UnchangedReason::NoMatch);
    };

    let rest = &original[end..];
    if rest.is_empty() {
        return Resolution::Resolved(replacement.to_string());
    }

    let trimmed = replacement.trim_end_matches(segments::is_separator);
    if trimmed.is_empty() {
        // Replacement is only separators: keep one of them
        return Resolution::Resolved(format!(
            "{}{}",
            replacement.chars().next().unwrap_or('/'),
            rest.trim_start_matches(segments::is_separator)
        ));
    }
    Resolution::Resolved(format!("{}{}", trimmed, rest))
}

/// Reference path without its trailing `{N}` copy number, if any.
pub fn strip_copy_number(path: &str) -> &str {
    split_copy_number(path).0
}

/// Split a trailing `{N}` copy number off a reference path.
fn split_copy_number(path: &str) -> (&str, &str) {
    if let Some(open) = path.rfind('{') {
        let tail = &path[open..];
        if let Some(digits) = tail.strip_prefix('{').and_then(|t| t.strip_suffix('}')) {
            if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
                return (&path[..open], tail);
            }
        }
    }
    (path, "")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cd(anchor: &str, root: &str) -> PathResolver {
        PathResolver::new(&RewriteRule::common_denominator(anchor, root)).unwrap()
    }

    fn sr(pattern: &str, replacement: &str) -> PathResolver {
        PathResolver::new(&RewriteRule::search_replace(
            pattern,
            Replacement::Path(replacement.to_string()),
        ))
        .unwrap()
    }

    #[test]
    fn test_common_denominator_rewrites_prefix() {
        let resolver = cd("demo", "X:/work/pro");
        assert_eq!(
            resolver.resolve("Z:/projects/demo/assetA.ma"),
            Resolution::Resolved("X:/work/pro/demo/assetA.ma".to_string())
        );
    }

    #[test]
    fn test_common_denominator_missing_anchor() {
        let resolver = cd("missing", "X:/work/pro");
        assert_eq!(
            resolver.resolve("Z:/projects/demo/assetA.ma"),
            Resolution::Unchanged(UnchangedReason::NoMatch)
        );
    }

    #[test]
    fn test_common_denominator_first_anchor_wins() {
        let resolver = cd("demo", "/srv");
        assert_eq!(
            resolver.resolve("Z:/demo/shots/demo/a.ma"),
            Resolution::Resolved("/srv/demo/shots/demo/a.ma".to_string())
        );
    }

    #[test]
    fn test_common_denominator_is_case_sensitive() {
        let resolver = cd("Demo", "/srv");
        assert_eq!(
            resolver.resolve("Z:/projects/demo/a.ma"),
            Resolution::Unchanged(UnchangedReason::NoMatch)
        );
    }

    #[test]
    fn test_common_denominator_keeps_suffix_separators() {
        let resolver = cd("demo", "X:/work/pro");
        assert_eq!(
            resolver.resolve("Z:\\projects\\demo\\sub\\a.ma"),
            Resolution::Resolved("X:/work/pro/demo\\sub\\a.ma".to_string())
        );
    }

    #[test]
    fn test_common_denominator_anchor_is_whole_segment() {
        let resolver = cd("demo", "/srv");
        assert_eq!(
            resolver.resolve("Z:/projects/demos/a.ma"),
            Resolution::Unchanged(UnchangedReason::NoMatch)
        );
    }

    #[test]
    fn test_common_denominator_idempotent_when_root_contains_anchor() {
        let resolver = cd("demo", "X:/demo/pro");
        let first = resolver.resolve("Z:/projects/demo/a.ma");
        assert_eq!(first, Resolution::Resolved("X:/demo/pro/demo/a.ma".to_string()));
        assert_eq!(
            resolver.resolve("X:/demo/pro/demo/a.ma"),
            Resolution::Unchanged(UnchangedReason::AlreadyTarget)
        );
    }

    #[test]
    fn test_search_replace_prefix() {
        let resolver = sr("*projects", "X:/work/pro");
        assert_eq!(
            resolver.resolve("Z:/projects/demo/assetA.ma"),
            Resolution::Resolved("X:/work/pro/demo/assetA.ma".to_string())
        );
    }

    #[test]
    fn test_search_replace_no_match() {
        let resolver = sr("*archive", "X:/work/pro");
        assert_eq!(
            resolver.resolve("Z:/projects/demo/assetA.ma"),
            Resolution::Unchanged(UnchangedReason::NoMatch)
        );
    }

    #[test]
    fn test_search_replace_shortest_prefix_wins() {
        let resolver = sr("*projects", "/new");
        assert_eq!(
            resolver.resolve("Z:/projects/demo/projects/a.ma"),
            Resolution::Resolved("/new/demo/projects/a.ma".to_string())
        );
    }

    #[test]
    fn test_search_replace_character_class_and_question_mark() {
        let resolver = sr("?:/[pq]rojects", "/mnt/p");
        assert_eq!(
            resolver.resolve("Z:/projects/a.ma"),
            Resolution::Resolved("/mnt/p/a.ma".to_string())
        );
    }

    #[test]
    fn test_search_replace_whole_path() {
        let resolver = sr("*.mb", "/lib/placeholder.ma");
        assert_eq!(
            resolver.resolve("Z:/x/y.mb"),
            Resolution::Resolved("/lib/placeholder.ma".to_string())
        );
    }

    #[test]
    fn test_search_replace_does_not_split_segments() {
        let resolver = sr("*proj", "/new");
        assert_eq!(
            resolver.resolve("Z:/projects/a.ma"),
            Resolution::Unchanged(UnchangedReason::NoMatch)
        );
    }

    #[test]
    fn test_search_replace_second_run_is_unchanged() {
        let resolver = sr("?:", "X:/mirror");
        let first = resolver.resolve("Z:/projects/a.ma");
        assert_eq!(first, Resolution::Resolved("X:/mirror/projects/a.ma".to_string()));
        assert_eq!(
            resolver.resolve("X:/mirror/projects/a.ma"),
            Resolution::Unchanged(UnchangedReason::AlreadyTarget)
        );

        let resolver = sr("*projects", "X:/work/pro");
        let first = resolver.resolve("Z:/projects/demo/projects/a.ma");
        let Resolution::Resolved(path) = first else {
            panic!("expected a rewrite, got {:?}", first);
        };
        assert_eq!(
            resolver.resolve(&path),
            Resolution::Unchanged(UnchangedReason::AlreadyTarget)
        );
    }

    #[test]
    fn test_search_replace_guard_ignores_separator_style() {
        let resolver = sr("?:", "X:/mirror");
        assert_eq!(
            resolver.resolve("X:\\mirror\\projects\\a.ma"),
            Resolution::Unchanged(UnchangedReason::AlreadyTarget)
        );
        assert_eq!(
            resolver.resolve("X:/mirrored/a.ma"),
            Resolution::Resolved("X:/mirror/mirrored/a.ma".to_string())
        );
    }

    #[test]
    fn test_empty_path_unchanged() {
        assert_eq!(
            cd("demo", "/srv").resolve(""),
            Resolution::Unchanged(UnchangedReason::EmptyPath)
        );
        assert_eq!(
            sr("*", "/srv").resolve(""),
            Resolution::Unchanged(UnchangedReason::EmptyPath)
        );
    }

    #[test]
    fn test_copy_number_is_preserved() {
        let resolver = cd("demo", "X:/work/pro");
        assert_eq!(
            resolver.resolve("Z:/projects/demo/a.ma{2}"),
            Resolution::Resolved("X:/work/pro/demo/a.ma{2}".to_string())
        );
        assert_eq!(split_copy_number("a.ma{x}"), ("a.ma{x}", ""));
        assert_eq!(split_copy_number("a.ma{}"), ("a.ma{}", ""));
    }

    #[test]
    fn test_identity_resolution_is_unchanged() {
        let resolver = cd("demo", "X:/work/pro");
        assert_eq!(
            resolver.resolve("X:/work/pro/demo/a.ma"),
            Resolution::Unchanged(UnchangedReason::AlreadyTarget)
        );
    }

    #[test]
    fn test_unbound_sentinel_rejected() {
        let rule = RewriteRule::search_replace("*", Replacement::UseScanRoot);
        assert!(PathResolver::new(&rule).is_err());
    }
}
