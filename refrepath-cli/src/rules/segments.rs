//! Separator-agnostic path segmentation.
//!
//! Reference paths stored inside scene files are written by whatever
//! machine last saved them, so a Linux batch may see `Z:\projects\x.ma`
//! and a Windows batch `/mnt/projects/x.ma`. `std::path` only understands
//! the host's own syntax, so segments are computed on the raw string and
//! every byte outside a rewritten range is kept as-is.

use std::ops::Range;

/// Both separators are honoured regardless of the host platform.
pub fn is_separator(c: char) -> bool {
    c == '/' || c == '\\'
}

/// Byte range of one non-empty segment inside the original string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub start: usize,
    pub end: usize,
}

impl Segment {
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    pub fn text<'a>(&self, path: &'a str) -> &'a str {
        &path[self.range()]
    }
}

/// Split `path` into its non-empty segments, left to right.
///
/// Repeated separators produce no empty segments; a drive prefix such as
/// `Z:` is an ordinary segment.
pub fn split(path: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut start = None;

    for (idx, c) in path.char_indices() {
        if is_separator(c) {
            if let Some(s) = start.take() {
                segments.push(Segment { start: s, end: idx });
            }
        } else if start.is_none() {
            start = Some(idx);
        }
    }

    if let Some(s) = start {
        segments.push(Segment {
            start: s,
            end: path.len(),
        });
    }

    segments
}

/// First separator character used in `path`, if any.
pub fn first_separator(path: &str) -> Option<char> {
    path.chars().find(|c| is_separator(*c))
}

/// Separator used to glue a new root onto a preserved suffix: the root's
/// own style wins, then the original path's, then `/`.
pub fn joining_separator(new_root: &str, original: &str) -> char {
    first_separator(new_root)
        .or_else(|| first_separator(original))
        .unwrap_or('/')
}

/// Join `root` and `suffix` with exactly one separator between them.
///
/// `suffix` must not start with a separator. A root made only of
/// separators (e.g. `/`) is kept verbatim.
pub fn join(root: &str, suffix: &str, separator: char) -> String {
    let trimmed = root.trim_end_matches(is_separator);
    if trimmed.is_empty() {
        if root.is_empty() {
            return suffix.to_string();
        }
        return format!("{}{}", root, suffix);
    }
    if suffix.is_empty() {
        return trimmed.to_string();
    }
    format!("{}{}{}", trimmed, separator, suffix)
}

/// Whether the segments of `prefix` are exactly the leading segments of
/// `path` (separator style and repetition ignored).
pub fn starts_with_segments(path: &str, prefix: &str) -> bool {
    let path_segments = split(path);
    let prefix_segments = split(prefix);

    if prefix_segments.is_empty() || prefix_segments.len() > path_segments.len() {
        return false;
    }

    prefix_segments
        .iter()
        .zip(path_segments.iter())
        .all(|(p, s)| p.text(prefix) == s.text(path))
}
