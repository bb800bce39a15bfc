//! Commit impact scoring
//!
//! Impact approximates how much a commit asks of its author: many small edits
//! spread over many files score higher than one large block of new code, and
//! edits to existing code are weighted above additions.

use crate::diff::DiffLineAnalyzer;
use crate::model::{Commit, Patch};

use super::{guard, MetricOptions};

/// Multiplier applied to the raw impact ratio
pub const IMPACT_SCALE: f64 = 100.0;

/// Weight of edits to existing code
pub const OLD_CODE_WEIGHT: f64 = 1.5;

/// Running totals for one commit's impact
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ImpactAccumulator {
    pub total_files: usize,
    pub total_edit_locations: f64,
    pub total_lines_edited: usize,
    pub total_lines_of_old_code: usize,
}

impl ImpactAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a patch into the totals, returning whether it counted
    pub fn add_patch(&mut self, patch: &Patch, options: &MetricOptions) -> bool {
        if !patch.change_type.counts_toward_impact() || options.is_ignored(patch) {
            return false;
        }

        let lines_edited = options.lines_added(patch) + patch.lines_removed;

        self.total_files += 1;
        self.total_edit_locations += DiffLineAnalyzer::analyze(&patch.contents, None).edit_locations();
        self.total_lines_edited += lines_edited;
        if patch.change_type.edits_old_code() {
            self.total_lines_of_old_code += lines_edited;
        }

        true
    }

    /// Multiplier for the share of edits that touched existing code
    pub fn old_code_factor(&self) -> f64 {
        if self.total_lines_of_old_code == 0 {
            1.0
        } else {
            OLD_CODE_WEIGHT * (self.total_lines_edited as f64 / self.total_lines_of_old_code as f64)
        }
    }

    /// Impact score, zero when nothing was edited
    pub fn score(&self) -> f64 {
        let spread = self.total_edit_locations * self.total_files as f64 / self.total_lines_edited as f64;
        guard(IMPACT_SCALE * spread * self.old_code_factor())
    }
}

/// Impact of one commit across all of its patch sets
pub fn commit_impact(commit: &Commit, options: &MetricOptions) -> f64 {
    let mut accumulator = ImpactAccumulator::new();
    for patch in commit.all_patches() {
        accumulator.add_patch(patch, options);
    }
    accumulator.score()
}
