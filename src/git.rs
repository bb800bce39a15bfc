use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};
use git2::{BranchType, Delta, DiffFindOptions, DiffOptions, Oid, Repository, Sort};
use log::{debug, info};
use std::path::{Path, PathBuf};

use crate::error::{AnalysisError, AnalysisResult};
use crate::model::{ChangeType, Patch};

/// Branch names tried, in order, when no trunk branch is configured
pub const TRUNK_CANDIDATES: [&str; 4] = ["main", "master", "develop", "trunk"];

/// Commit metadata as listed from a repository, before diffing
#[derive(Debug, Clone, PartialEq)]
pub struct RawCommit {
    pub id: String,
    pub author_name: String,
    pub author_email: String,
    pub committer_email: String,
    /// Author timestamp
    pub when: DateTime<FixedOffset>,
    pub parent_ids: Vec<String>,
}

impl RawCommit {
    /// Calendar date of the author timestamp
    pub fn date(&self) -> NaiveDate {
        self.when.date_naive()
    }
}

/// Read-only access to the commit history an analysis consumes
pub trait RepositoryReader {
    /// Whether a local or remote-tracking branch of this name exists
    fn branch_exists(&self, name: &str) -> bool;

    /// Name of the trunk branch
    fn trunk_branch(&self) -> AnalysisResult<String>;

    /// Commits reachable from `branch`, hiding those reachable from `exclude`
    fn list_commits(&self, branch: &str, exclude: Option<&str>) -> AnalysisResult<Vec<RawCommit>>;

    /// Per-file patches from `parent` (or the empty tree) to `commit`
    fn diff(&self, parent: Option<&str>, commit: &str) -> AnalysisResult<Vec<Patch>>;
}

/// Validate that the given path is an accessible git repository
/// Returns a Repository handle if valid, error otherwise
pub fn validate_git_repository<P: AsRef<Path>>(path: P) -> AnalysisResult<Repository> {
    let path = path.as_ref();
    debug!("Validating git repository at: {}", path.display());

    if !path.exists() {
        return Err(AnalysisError::invalid_repository(path, "Path does not exist"));
    }

    let repo = Repository::open(path)
        .map_err(|e| AnalysisError::invalid_repository(path, format!("Failed to open repository: {}", e.message())))?;

    if repo.is_bare() {
        debug!("Repository is bare: {}", path.display());
    }

    Ok(repo)
}

/// git2 backed repository reader
pub struct GitRepository {
    repository: Repository,
    path: PathBuf,
    trunk: Option<String>,
}

impl GitRepository {
    /// Open a repository from a path
    pub fn open<P: AsRef<Path>>(path: P) -> AnalysisResult<Self> {
        let repository = validate_git_repository(&path)?;
        Ok(Self::from_repository(repository))
    }

    /// Create a reader from an existing Repository
    pub fn from_repository(repository: Repository) -> Self {
        let path = repository
            .workdir()
            .unwrap_or_else(|| repository.path())
            .to_path_buf();

        Self {
            repository,
            path,
            trunk: None,
        }
    }

    /// Use a fixed trunk branch instead of detecting one
    pub fn with_trunk(mut self, trunk: impl Into<String>) -> Self {
        self.trunk = Some(trunk.into());
        self
    }

    /// Repository working directory, or the git directory when bare
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get a reference to the underlying Repository
    pub fn repository(&self) -> &Repository {
        &self.repository
    }

    /// Full reference name for a local or remote-tracking branch
    fn branch_reference(&self, name: &str) -> Option<String> {
        if let Ok(branch) = self.repository.find_branch(name, BranchType::Local) {
            return branch.get().name().map(str::to_string);
        }

        let remotes = self.repository.remotes().ok()?;
        remotes.iter().flatten().find_map(|remote| {
            let remote_name = format!("{remote}/{name}");
            self.repository
                .find_branch(&remote_name, BranchType::Remote)
                .ok()
                .and_then(|branch| branch.get().name().map(str::to_string))
        })
    }

    fn require_branch(&self, name: &str) -> AnalysisResult<String> {
        self.branch_reference(name)
            .ok_or_else(|| AnalysisError::UnknownBranch { branch: name.to_string() })
    }

    fn raw_commit(commit: &git2::Commit<'_>) -> AnalysisResult<RawCommit> {
        let author = commit.author();
        let time = author.when();
        let offset = FixedOffset::east_opt(time.offset_minutes() * 60).unwrap_or_else(|| Utc.fix());
        let when = DateTime::from_timestamp(time.seconds(), 0)
            .ok_or_else(|| git2::Error::from_str(&format!("Invalid author timestamp on commit {}", commit.id())))?
            .with_timezone(&offset);

        Ok(RawCommit {
            id: commit.id().to_string(),
            author_name: author.name().unwrap_or("Unknown").to_string(),
            author_email: author.email().unwrap_or_default().to_string(),
            committer_email: commit.committer().email().unwrap_or_default().to_string(),
            when,
            parent_ids: commit.parent_ids().map(|id| id.to_string()).collect(),
        })
    }
}

impl RepositoryReader for GitRepository {
    fn branch_exists(&self, name: &str) -> bool {
        self.branch_reference(name).is_some()
    }

    fn trunk_branch(&self) -> AnalysisResult<String> {
        if let Some(trunk) = &self.trunk {
            self.require_branch(trunk)?;
            return Ok(trunk.clone());
        }

        if let Some(candidate) = TRUNK_CANDIDATES.iter().find(|name| self.branch_exists(name)) {
            debug!("Detected trunk branch: {}", candidate);
            return Ok(candidate.to_string());
        }

        let head = self.repository.head()?;
        head.shorthand()
            .map(str::to_string)
            .ok_or_else(|| AnalysisError::configuration("Unable to determine the trunk branch from HEAD"))
    }

    fn list_commits(&self, branch: &str, exclude: Option<&str>) -> AnalysisResult<Vec<RawCommit>> {
        let mut revwalk = self.repository.revwalk()?;
        revwalk.set_sorting(Sort::TOPOLOGICAL | Sort::TIME)?;
        revwalk.push_ref(&self.require_branch(branch)?)?;

        if let Some(excluded) = exclude {
            revwalk.hide_ref(&self.require_branch(excluded)?)?;
        }

        let mut commits = Vec::new();
        for oid in revwalk {
            let commit = self.repository.find_commit(oid?)?;
            commits.push(Self::raw_commit(&commit)?);
        }

        info!(
            "Listed {} commits on '{}'{}",
            commits.len(),
            branch,
            exclude.map(|e| format!(" excluding '{e}'")).unwrap_or_default()
        );
        Ok(commits)
    }

    fn diff(&self, parent: Option<&str>, commit: &str) -> AnalysisResult<Vec<Patch>> {
        let tree = self.repository.find_commit(Oid::from_str(commit)?)?.tree()?;
        let parent_tree = match parent {
            Some(id) => Some(self.repository.find_commit(Oid::from_str(id)?)?.tree()?),
            None => None,
        };

        let mut options = DiffOptions::new();
        options.include_untracked(false);
        let mut diff = self
            .repository
            .diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), Some(&mut options))?;
        diff.find_similar(Some(DiffFindOptions::new().renames(true)))?;

        let mut patches = Vec::with_capacity(diff.deltas().len());
        for (idx, delta) in diff.deltas().enumerate() {
            let path = delta
                .new_file()
                .path()
                .or_else(|| delta.old_file().path())
                .map(|p| p.to_string_lossy().into_owned())
                .unwrap_or_default();
            let change_type = change_type_of(delta.status());

            // binary files produce no text patch
            let (lines_added, lines_removed, contents) = match git2::Patch::from_diff(&diff, idx)? {
                Some(mut patch) => {
                    let (_, added, removed) = patch.line_stats()?;
                    let buf = patch.to_buf()?;
                    (added, removed, String::from_utf8_lossy(&buf).into_owned())
                }
                None => (0, 0, String::new()),
            };

            patches.push(Patch::new(path, change_type, lines_added, lines_removed, contents));
        }

        debug!(
            "Diffed {} against {}: {} files",
            commit,
            parent.unwrap_or("empty tree"),
            patches.len()
        );
        Ok(patches)
    }
}

/// Map a git2 delta status onto the crate's change type
pub fn change_type_of(status: Delta) -> ChangeType {
    match status {
        Delta::Unmodified => ChangeType::Unmodified,
        Delta::Added => ChangeType::Added,
        Delta::Deleted => ChangeType::Deleted,
        Delta::Modified => ChangeType::Modified,
        Delta::Renamed => ChangeType::Renamed,
        Delta::Copied => ChangeType::Copied,
        Delta::Ignored => ChangeType::Ignored,
        Delta::Untracked => ChangeType::Untracked,
        Delta::Typechange => ChangeType::TypeChanged,
        Delta::Unreadable => ChangeType::Unreadable,
        Delta::Conflicted => ChangeType::Conflicted,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_validate_git_repository_nonexistent_path() {
        let result = validate_git_repository("/definitely/does/not/exist");
        let err = result.err().expect("missing path must fail");
        assert!(err.is_configuration());
        assert!(err.to_string().contains("Path does not exist"));
    }

    #[test]
    fn test_validate_git_repository_non_git_dir() {
        let temp_dir = TempDir::new().unwrap();
        let err = validate_git_repository(temp_dir.path()).err().expect("plain directory must fail");
        assert!(err.to_string().contains("Failed to open repository"));
    }

    #[test]
    fn test_change_type_mapping() {
        assert_eq!(change_type_of(Delta::Modified), ChangeType::Modified);
        assert_eq!(change_type_of(Delta::Typechange), ChangeType::TypeChanged);
        assert_eq!(change_type_of(Delta::Renamed), ChangeType::Renamed);
        assert_eq!(change_type_of(Delta::Added), ChangeType::Added);
    }
}
