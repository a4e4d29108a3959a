//! Glob-style name patterns used by the catalog and the scanner.
//!
//! A pattern is split on `/` and each piece is matched against the same number
//! of trailing path components, so `*.log` matches any file name ending in
//! `.log` and `Logs/*.log` additionally requires the parent to be named `Logs`.
//! Segment syntax is whatever `glob::Pattern` accepts. Matching is case-sensitive.

use glob::{MatchOptions, Pattern};
use std::path::{Component, Path};

const SEGMENT_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

#[derive(Debug, Clone)]
pub struct GlobPattern {
    source: String,
    segments: Vec<Pattern>,
}

impl GlobPattern {
    pub fn new(pattern: &str) -> Result<Self, String> {
        let trimmed = pattern.trim_matches('/');
        if trimmed.is_empty() {
            return Err("Empty pattern".to_string());
        }
        let segments = trimmed
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|segment| {
                Pattern::new(segment).map_err(|e| format!("Invalid pattern '{}': {}", pattern, e))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(GlobPattern {
            source: pattern.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn matches_name(&self, name: &str) -> bool {
        self.segments.len() == 1 && self.segments[0].matches_with(name, SEGMENT_OPTIONS)
    }

    pub fn matches_path(&self, path: &Path) -> bool {
        let names: Vec<&str> = path
            .components()
            .filter_map(|c| match c {
                Component::Normal(s) => s.to_str(),
                _ => None,
            })
            .collect();
        if names.len() < self.segments.len() {
            return false;
        }
        let tail = &names[names.len() - self.segments.len()..];
        self.segments
            .iter()
            .zip(tail.iter())
            .all(|(segment, name)| segment.matches_with(name, SEGMENT_OPTIONS))
    }
}

/// True when the string carries glob metacharacters.
pub fn has_wildcard(s: &str) -> bool {
    s.contains(['*', '?', '['])
}

/// Compiles a list of patterns, skipping (and reporting) the invalid ones.
pub fn compile_all(patterns: &[String]) -> (Vec<GlobPattern>, Vec<String>) {
    let mut compiled = Vec::new();
    let mut errors = Vec::new();
    for p in patterns {
        match GlobPattern::new(p) {
            Ok(g) => compiled.push(g),
            Err(e) => errors.push(e),
        }
    }
    (compiled, errors)
}

/// The literal tail of a pattern after its last `*`; `None` when nothing is left.
///
/// `*.tmp` gives `.tmp`. A pattern ending in `*` gives `None` rather than an
/// empty suffix that would match every file.
pub fn literal_suffix(pattern: &str) -> Option<&str> {
    let suffix = pattern.rsplit('*').next().unwrap_or(pattern);
    if suffix.is_empty() {
        None
    } else {
        Some(suffix)
    }
}
