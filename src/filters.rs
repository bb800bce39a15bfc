//! Filtering System
//!
//! Filters deciding which commits fall inside the reporting window and which
//! file patches are ignored. Filters return `ControlFlow` so callers can stop
//! at the first rejection when chaining.

use chrono::NaiveDate;
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::ops::ControlFlow;

use crate::error::{AnalysisError, AnalysisResult};
use crate::git::RawCommit;
use crate::model::{Commit, Patch};

/// Filter result for early termination using ControlFlow
pub type FilterResult = ControlFlow<()>;

/// Core filter trait
pub trait ScanFilter<T> {
    /// Apply filter to input, `Break` rejects it
    fn apply(&self, input: &T) -> FilterResult;

    /// Whether the input passes the filter
    fn accepts(&self, input: &T) -> bool {
        self.apply(input).is_continue()
    }
}

/// Inclusive calendar date window on author dates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DateFilter {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateFilter {
    /// Create a filter accepting dates in `start..=end`
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    fn check(&self, date: NaiveDate) -> FilterResult {
        if self.start <= date && date <= self.end {
            ControlFlow::Continue(())
        } else {
            ControlFlow::Break(())
        }
    }
}

impl ScanFilter<Commit> for DateFilter {
    fn apply(&self, input: &Commit) -> FilterResult {
        self.check(input.date())
    }
}

impl ScanFilter<RawCommit> for DateFilter {
    fn apply(&self, input: &RawCommit) -> FilterResult {
        self.check(input.date())
    }
}

/// Ignore patterns applied to patch paths
///
/// Patterns are globs matched against the whole repository-relative path
/// (`*` also crosses directory separators). A pattern without glob syntax
/// additionally ignores everything below a directory of that name.
#[derive(Debug, Clone)]
pub struct PathFilter {
    patterns: Vec<String>,
    globs: GlobSet,
    prefixes: Vec<String>,
}

impl PathFilter {
    /// Compile ignore patterns
    pub fn new<I, S>(patterns: I) -> AnalysisResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let patterns: Vec<String> = patterns
            .into_iter()
            .map(Into::into)
            .filter(|p: &String| !p.trim().is_empty())
            .collect();

        let mut builder = GlobSetBuilder::new();
        let mut prefixes = Vec::new();
        for pattern in &patterns {
            let glob = Glob::new(pattern).map_err(|source| AnalysisError::InvalidPattern {
                pattern: pattern.clone(),
                source,
            })?;
            builder.add(glob);
            if !pattern.contains(['*', '?', '[', '{']) {
                prefixes.push(pattern.trim_end_matches('/').to_string());
            }
        }
        let globs = builder.build().map_err(|source| AnalysisError::InvalidPattern {
            pattern: patterns.join(", "),
            source,
        })?;

        Ok(Self {
            patterns,
            globs,
            prefixes,
        })
    }

    /// Filter ignoring nothing
    pub fn empty() -> Self {
        Self {
            patterns: Vec::new(),
            globs: GlobSet::empty(),
            prefixes: Vec::new(),
        }
    }

    /// Source patterns
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// Whether the path matches an ignore pattern
    pub fn is_ignored(&self, path: &str) -> bool {
        self.globs.is_match(path)
            || self.prefixes.iter().any(|prefix| {
                path.strip_prefix(prefix.as_str())
                    .is_some_and(|rest| rest.starts_with('/'))
            })
    }
}

impl Default for PathFilter {
    fn default() -> Self {
        Self::empty()
    }
}

impl ScanFilter<Patch> for PathFilter {
    fn apply(&self, input: &Patch) -> FilterResult {
        if self.is_ignored(&input.path) {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    }
}
