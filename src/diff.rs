//! Diff Text Heuristics
//!
//! Parses unified diff text directly to recover the figures the metric engine
//! needs beyond plain line counts: how many separate places a file was edited
//! in, and how many added lines are only comments.

/// Default marker identifying a commented line
pub const DEFAULT_COMMENT_MARKER: &str = "//";

/// Marker surrounding each hunk header, twice per header
const HUNK_MARKER: &str = "@@";

/// Figures recovered from the diff text of a single file
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DiffSummary {
    /// Occurrences of the hunk marker
    pub hunk_markers: usize,
    /// Added lines starting with the comment marker
    pub commented_insertions: usize,
}

impl DiffSummary {
    /// Separate edit locations in the file
    pub fn edit_locations(&self) -> f64 {
        self.hunk_markers as f64 / 2.0
    }
}

/// Diff text analyzer
pub struct DiffLineAnalyzer;

impl DiffLineAnalyzer {
    /// Analyze the diff text of one file
    ///
    /// `comment_marker` is matched against the start of each added line after
    /// its leading whitespace; pass `None` to skip comment detection.
    pub fn analyze(diff_output: &str, comment_marker: Option<&str>) -> DiffSummary {
        let mut summary = DiffSummary {
            hunk_markers: Self::count_hunk_markers(diff_output),
            ..DiffSummary::default()
        };

        if let Some(marker) = comment_marker {
            summary.commented_insertions = diff_output
                .lines()
                .filter(|line| !line.starts_with("+++"))
                .filter_map(|line| line.strip_prefix('+'))
                .filter(|added| is_commented(added, marker))
                .count();
        }

        summary
    }

    /// Occurrences of the hunk marker in the diff text
    pub fn count_hunk_markers(diff_output: &str) -> usize {
        diff_output.matches(HUNK_MARKER).count()
    }

    /// Added lines that only carry a comment
    pub fn count_commented_insertions(diff_output: &str, comment_marker: &str) -> usize {
        Self::analyze(diff_output, Some(comment_marker)).commented_insertions
    }
}

fn is_commented(line: &str, marker: &str) -> bool {
    !marker.is_empty() && line.trim_start().starts_with(marker)
}
