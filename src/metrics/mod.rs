//! Metric Engine
//!
//! Pure computations over resolved authors, in-memory commits and a
//! reporting period. Nothing here touches the repository.
//!
//! Ratios that can degenerate (division by zero, no activity) pass through
//! [`guard`], which maps `NaN` and infinities to zero. Team velocity is the one
//! exception and reports `NaN` for a day without developers.

pub mod developer;
pub mod impact;
pub mod team;

pub use developer::{build_daily_developer_stats, build_developer_stats, DailyDeveloperStats, DeveloperStats};
pub use impact::{commit_impact, ImpactAccumulator, IMPACT_SCALE, OLD_CODE_WEIGHT};
pub use team::{build_team_stats, TeamStats};

use crate::diff::{DiffLineAnalyzer, DEFAULT_COMMENT_MARKER};
use crate::filters::{PathFilter, ScanFilter};
use crate::model::Patch;

/// Round half away from zero to `decimals` places
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Round half away from zero to two places
pub fn round2(value: f64) -> f64 {
    round_to(value, 2)
}

/// Coerce `NaN` and infinities to zero
pub fn guard(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Options controlling how patch lines are counted
#[derive(Debug, Clone)]
pub struct MetricOptions {
    /// Paths excluded from every line count
    pub ignore: PathFilter,
    /// Deduct added comment lines from the added count
    pub ignore_comments: bool,
    /// Prefix identifying a comment line
    pub comment_marker: String,
}

impl Default for MetricOptions {
    fn default() -> Self {
        Self {
            ignore: PathFilter::empty(),
            ignore_comments: false,
            comment_marker: DEFAULT_COMMENT_MARKER.to_string(),
        }
    }
}

impl MetricOptions {
    /// Set the ignore filter
    pub fn with_ignore(mut self, ignore: PathFilter) -> Self {
        self.ignore = ignore;
        self
    }

    /// Enable comment stripping with the given marker
    pub fn with_comment_stripping(mut self, marker: impl Into<String>) -> Self {
        self.ignore_comments = true;
        self.comment_marker = marker.into();
        self
    }

    /// Whether the patch is excluded by an ignore pattern
    pub fn is_ignored(&self, patch: &Patch) -> bool {
        !self.ignore.accepts(patch)
    }

    /// Added lines of a patch after comment stripping
    pub fn lines_added(&self, patch: &Patch) -> usize {
        if self.ignore_comments {
            let commented = DiffLineAnalyzer::count_commented_insertions(&patch.contents, &self.comment_marker);
            patch.lines_added.saturating_sub(commented)
        } else {
            patch.lines_added
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ChangeType;

    #[test]
    fn test_round_half_away_from_zero() {
        assert_eq!(round2(1.0 / 3.0), 0.33);
        assert_eq!(round2(2.0 / 3.0), 0.67);
        assert_eq!(round2(0.125), 0.13);
        assert_eq!(round2(-0.125), -0.13);
        assert_eq!(round_to(2.5, 0), 3.0);
        assert_eq!(round_to(-2.5, 0), -3.0);
    }

    #[test]
    fn test_guard() {
        assert_eq!(guard(f64::NAN), 0.0);
        assert_eq!(guard(f64::INFINITY), 0.0);
        assert_eq!(guard(f64::NEG_INFINITY), 0.0);
        assert_eq!(guard(1.5), 1.5);
    }

    #[test]
    fn test_comment_stripping_saturates() {
        let contents = "@@ -0,0 +1,2 @@\n+// one\n+// two\n";
        // reported count lower than the commented lines found in the text
        let patch = Patch::new("a.rs", ChangeType::Added, 1, 0, contents);

        let options = MetricOptions::default().with_comment_stripping("//");
        assert_eq!(options.lines_added(&patch), 0);
        assert_eq!(MetricOptions::default().lines_added(&patch), 1);
    }

    #[test]
    fn test_ignored_patch() {
        let options = MetricOptions::default().with_ignore(PathFilter::new(["*.lock"]).unwrap());
        assert!(options.is_ignored(&Patch::new("Cargo.lock", ChangeType::Modified, 5, 5, "")));
        assert!(!options.is_ignored(&Patch::new("src/lib.rs", ChangeType::Modified, 5, 5, "")));
    }
}
