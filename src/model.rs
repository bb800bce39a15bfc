//! Commit and Patch Model
//!
//! In-memory representation of the commits an analysis works on. Commits are
//! built once from repository data and never modified afterwards, which lets
//! the metric engine share them freely between threads.

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A developer identity for one analysis run
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Author {
    /// Display name
    pub name: String,
    /// Email addresses, case-sensitive as captured from commits
    pub emails: BTreeSet<String>,
}

impl Author {
    /// Create an author with a single email address
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        let mut emails = BTreeSet::new();
        emails.insert(email.into());
        Self {
            name: name.into(),
            emails,
        }
    }

    /// Create an author from several email addresses
    pub fn with_emails<I, S>(name: impl Into<String>, emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            emails: emails.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether this author uses the given email
    pub fn owns(&self, email: &str) -> bool {
        self.emails.contains(email)
    }

    /// Whether any of the given emails belongs to this author
    pub fn shares_any<'a, I>(&self, emails: I) -> bool
    where
        I: IntoIterator<Item = &'a String>,
    {
        emails.into_iter().any(|email| self.emails.contains(email))
    }

    /// First email in sort order, empty for an author without emails
    pub fn primary_email(&self) -> &str {
        self.emails.iter().next().map(String::as_str).unwrap_or("")
    }
}

/// Kind of change a patch applies to a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeType {
    Added,
    Modified,
    Deleted,
    Renamed,
    Copied,
    Unmodified,
    Conflicted,
    Ignored,
    Unreadable,
    Untracked,
    TypeChanged,
}

impl ChangeType {
    /// Whether a change of this kind contributes to a commit's impact score
    pub fn counts_toward_impact(self) -> bool {
        !matches!(
            self,
            ChangeType::Ignored
                | ChangeType::Unreadable
                | ChangeType::Untracked
                | ChangeType::Conflicted
                | ChangeType::Renamed
        )
    }

    /// Whether the change edits a file that existed before the commit
    pub fn edits_old_code(self) -> bool {
        matches!(self, ChangeType::Modified)
    }
}

/// Changes to a single file between two trees
#[derive(Debug, Clone, PartialEq)]
pub struct Patch {
    /// Path of the file after the change
    pub path: String,
    /// Unified diff text
    pub contents: String,
    pub lines_added: usize,
    pub lines_removed: usize,
    pub change_type: ChangeType,
}

impl Patch {
    /// Create a patch
    pub fn new(
        path: impl Into<String>,
        change_type: ChangeType,
        lines_added: usize,
        lines_removed: usize,
        contents: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            contents: contents.into(),
            lines_added,
            lines_removed,
            change_type,
        }
    }

    /// Total lines touched
    pub fn lines_changed(&self) -> usize {
        self.lines_added + self.lines_removed
    }
}

/// Patches produced by diffing one parent against the commit
#[derive(Debug, Clone, PartialEq)]
pub struct PatchSet {
    /// Parent commit id, `None` for a diff against the empty tree
    pub parent_id: Option<String>,
    pub patches: Vec<Patch>,
}

impl PatchSet {
    /// Patch set against a parent commit
    pub fn against(parent_id: impl Into<String>, patches: Vec<Patch>) -> Self {
        Self {
            parent_id: Some(parent_id.into()),
            patches,
        }
    }

    /// Patch set of a root commit against the empty tree
    pub fn initial(patches: Vec<Patch>) -> Self {
        Self {
            parent_id: None,
            patches,
        }
    }
}

/// A commit with its per-parent patches
#[derive(Debug, Clone, PartialEq)]
pub struct Commit {
    /// Hex object id
    pub id: String,
    /// Commit author with the single email recorded on the commit
    pub author: Author,
    /// Email of whoever committed the change; commits are attributed by it
    pub committer_email: String,
    /// Author timestamp
    pub when: DateTime<FixedOffset>,
    /// One patch set per parent
    pub patches: Vec<PatchSet>,
}

impl Commit {
    /// Create a commit committed by its own author
    pub fn new(
        id: impl Into<String>,
        author: Author,
        when: DateTime<FixedOffset>,
        patches: Vec<PatchSet>,
    ) -> Self {
        let committer_email = author.primary_email().to_string();
        Self {
            id: id.into(),
            author,
            committer_email,
            when,
            patches,
        }
    }

    /// Record a committer different from the author
    pub fn with_committer(mut self, email: impl Into<String>) -> Self {
        self.committer_email = email.into();
        self
    }

    /// Calendar date of the author timestamp, in the author's own offset
    pub fn date(&self) -> NaiveDate {
        self.when.date_naive()
    }

    /// Email the commit was authored with
    pub fn author_email(&self) -> &str {
        self.author.primary_email()
    }

    /// Whether the commit has no parents
    pub fn is_root(&self) -> bool {
        self.patches.iter().all(|set| set.parent_id.is_none())
    }

    /// All patches across every parent
    pub fn all_patches(&self) -> impl Iterator<Item = &Patch> {
        self.patches.iter().flat_map(|set| set.patches.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_author_email_membership() {
        let author = Author::with_emails("Jane", ["jane@work.com", "jane@home.org"]);
        assert!(author.owns("jane@work.com"));
        assert!(!author.owns("JANE@work.com"));
        assert_eq!(author.primary_email(), "jane@home.org");

        let other = vec!["someone@else.com".to_string(), "jane@home.org".to_string()];
        assert!(author.shares_any(&other));
    }

    #[test]
    fn test_change_type_classification() {
        assert!(ChangeType::Modified.counts_toward_impact());
        assert!(ChangeType::Added.counts_toward_impact());
        assert!(!ChangeType::Renamed.counts_toward_impact());
        assert!(!ChangeType::Conflicted.counts_toward_impact());
        assert!(ChangeType::Modified.edits_old_code());
        assert!(!ChangeType::Added.edits_old_code());
        assert!(!ChangeType::Deleted.edits_old_code());
    }

    #[test]
    fn test_commit_date_uses_author_offset() {
        // 23:30 on the 1st at +10:00 is still the 1st locally
        let offset = FixedOffset::east_opt(10 * 3600).unwrap();
        let when = offset.with_ymd_and_hms(2018, 7, 1, 23, 30, 0).unwrap();
        let commit = Commit::new("abc", Author::new("Jane", "jane@work.com"), when, vec![]);
        assert_eq!(commit.date(), NaiveDate::from_ymd_opt(2018, 7, 1).unwrap());
        assert_eq!(commit.author_email(), "jane@work.com");
        assert_eq!(commit.committer_email, "jane@work.com");

        let relayed = commit.with_committer("bot@ci.com");
        assert_eq!(relayed.committer_email, "bot@ci.com");
        assert_eq!(relayed.author_email(), "jane@work.com");
    }

    #[test]
    fn test_root_commit_detection() {
        let when = FixedOffset::east_opt(0).unwrap().with_ymd_and_hms(2018, 7, 1, 9, 0, 0).unwrap();
        let author = Author::new("Jane", "jane@work.com");
        let root = Commit::new("a", author.clone(), when, vec![PatchSet::initial(vec![])]);
        let child = Commit::new("b", author, when, vec![PatchSet::against("a", vec![])]);
        assert!(root.is_root());
        assert!(!child.is_root());
    }
}
