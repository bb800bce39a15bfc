//! End-to-end tests building analyses over throwaway git repositories

use chrono::NaiveDate;
use devstats::{Analysis, AnalysisConfig, AnalysisError, Author, DateWindow};
use git2::{Oid, Repository, RepositoryInitOptions, Signature, Time};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// 2018-07-01 00:00:00 UTC, a Sunday
const JULY_FIRST_2018: i64 = 1_530_403_200;

fn at_day(day: i64) -> i64 {
    JULY_FIRST_2018 + (day - 1) * 86_400 + 10 * 3_600
}

fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2018, 7, day).unwrap()
}

fn july(start: u32, end: u32) -> DateWindow {
    DateWindow::Explicit {
        start: date(start),
        end: date(end),
    }
}

struct TestRepo {
    temp_dir: TempDir,
    repo: Repository,
}

impl TestRepo {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let mut options = RepositoryInitOptions::new();
        options.initial_head("main");
        let repo = Repository::init_opts(temp_dir.path(), &options).expect("Failed to init test repository");
        Self { temp_dir, repo }
    }

    fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    fn commit(&self, branch: &str, parent: Option<Oid>, files: &[(&str, &str)], author: (&str, &str), day: i64) -> Oid {
        self.commit_by(branch, parent, files, author, author, day)
    }

    fn commit_by(
        &self,
        branch: &str,
        parent: Option<Oid>,
        files: &[(&str, &str)],
        author: (&str, &str),
        committer: (&str, &str),
        day: i64,
    ) -> Oid {
        let base = parent.map(|id| self.repo.find_commit(id).unwrap().tree().unwrap());
        let mut builder = self.repo.treebuilder(base.as_ref()).unwrap();
        for (name, content) in files {
            let blob = self.repo.blob(content.as_bytes()).unwrap();
            builder.insert(*name, blob, 0o100644).unwrap();
        }
        let tree = self.repo.find_tree(builder.write().unwrap()).unwrap();

        let author_signature = Signature::new(author.0, author.1, &Time::new(at_day(day), 0)).unwrap();
        let committer_signature = Signature::new(committer.0, committer.1, &Time::new(at_day(day), 0)).unwrap();
        let parent_commit = parent.map(|id| self.repo.find_commit(id).unwrap());
        let parents: Vec<_> = parent_commit.iter().collect();

        self.repo
            .commit(Some(&format!("refs/heads/{}", branch)), &author_signature, &committer_signature, "test", &tree, &parents)
            .unwrap()
    }

    /// Three commits in the first week of July 2018 by two developers
    fn with_history() -> Self {
        let test_repo = Self::new();
        let first = test_repo.commit("main", None, &[("a.txt", "a\nb\nc\n")], ("Jane", "jane@work.com"), 2);
        let second = test_repo.commit("main", Some(first), &[("a.txt", "a\nB\nc\n")], ("Sam", "sam@work.com"), 3);
        test_repo.commit(
            "main",
            Some(second),
            &[("a.txt", "a\nB\nc\nd\n"), ("Cargo.lock", "x\ny\n")],
            ("Jane", "jane@home.org"),
            4,
        );
        test_repo
    }
}

#[test]
fn test_invalid_repository_path() {
    let config = AnalysisConfig::new("/definitely/not/a/repo", july(1, 7));
    let err = Analysis::build(&config).unwrap_err();

    assert!(matches!(err, AnalysisError::InvalidRepository { .. }));
    assert!(err.is_configuration());
    assert!(err.to_string().contains("/definitely/not/a/repo"));
}

#[test]
fn test_unknown_branch() {
    let test_repo = TestRepo::with_history();
    let config = AnalysisConfig::new(test_repo.path(), july(1, 7)).with_branch("feature/missing");

    let err = Analysis::build(&config).unwrap_err();
    assert_eq!(err.to_string(), "Branch 'feature/missing' not found in repository");
}

#[test]
fn test_developer_stats_over_week() {
    let test_repo = TestRepo::with_history();
    let config = AnalysisConfig::new(test_repo.path(), july(1, 7));
    let analysis = Analysis::build(&config).unwrap();

    let authors = analysis.list_authors().unwrap();
    assert_eq!(authors.len(), 2);
    assert_eq!(authors[0].name, "Jane");
    assert!(authors[0].owns("jane@work.com"));
    assert!(authors[0].owns("jane@home.org"));

    let stats = analysis.build_developer_stats(&authors);
    let jane = &stats[0];
    assert_eq!(jane.commits, 2);
    assert_eq!(jane.period_active_days, 2);
    assert_eq!(jane.lines_added, 6);
    assert_eq!(jane.lines_removed, 0);
    assert_eq!(jane.commits_per_day, 1.0);
    // 6 lines over two 8 hour days
    assert_eq!(jane.lines_of_change_per_hour, 0.38);
    assert_eq!(jane.churn, 0.0);
    assert!(jane.impact > 0.0);

    let sam = &stats[1];
    assert_eq!(sam.commits, 1);
    assert_eq!(sam.lines_added, 1);
    assert_eq!(sam.lines_removed, 1);
    assert_eq!(sam.churn, 1.0);
    // no net production
    assert_eq!(sam.ptt100, 0.0);
}

#[test]
fn test_commits_attributed_to_committer() {
    let test_repo = TestRepo::new();
    let first = test_repo.commit_by(
        "main",
        None,
        &[("a.txt", "a\nb\n")],
        ("Jane", "jane@work.com"),
        ("CI", "bot@ci.com"),
        2,
    );
    test_repo.commit("main", Some(first), &[("a.txt", "a\nb\nc\n")], ("Jane", "jane@work.com"), 3);

    let config = AnalysisConfig::new(test_repo.path(), july(1, 7));
    let analysis = Analysis::build(&config).unwrap();

    let jane = Author::new("Jane", "jane@work.com");
    let bot = Author::new("CI", "bot@ci.com");
    let stats = analysis.build_developer_stats(&[jane, bot]);
    assert_eq!(stats[0].commits, 1);
    assert_eq!(stats[0].lines_added, 1);
    assert_eq!(stats[1].commits, 1);
    assert_eq!(stats[1].lines_added, 2);

    let team = analysis.build_team_stats().unwrap();
    // the bot is not a listed author, so its email counts on its own
    assert_eq!(team[0].active_developers, 1);
    assert_eq!(team[0].total_commits, 1);
}

#[test]
fn test_team_stats_over_week() {
    let test_repo = TestRepo::with_history();
    let config = AnalysisConfig::new(test_repo.path(), july(1, 7));
    let analysis = Analysis::build(&config).unwrap();

    let team = analysis.build_team_stats().unwrap();
    let dates: Vec<_> = team.iter().map(|t| t.date).collect();
    assert_eq!(dates, vec![date(2), date(3), date(4), date(5), date(6)]);

    assert_eq!(team[0].total_commits, 1);
    assert_eq!(team[0].active_developers, 1);
    assert_eq!(team[0].velocity, 1.0);
    assert_eq!(team[3].total_commits, 0);
    assert!(team[3].velocity.is_nan());
}

#[test]
fn test_ignore_patterns_and_comment_stripping() {
    let test_repo = TestRepo::new();
    test_repo.commit(
        "main",
        None,
        &[("lib.rs", "// header\nfn a() {}\n    // note\n"), ("Cargo.lock", "x\ny\n")],
        ("Jane", "jane@work.com"),
        2,
    );

    let config = AnalysisConfig::new(test_repo.path(), july(1, 7))
        .with_ignore_patterns(["*.lock"])
        .with_comment_stripping("//");
    let analysis = Analysis::build(&config).unwrap();

    let authors = analysis.list_authors().unwrap();
    let stats = analysis.build_developer_stats(&authors);
    assert_eq!(stats[0].lines_added, 1);
}

#[test]
fn test_window_excludes_outside_commits() {
    let test_repo = TestRepo::with_history();
    let config = AnalysisConfig::new(test_repo.path(), july(3, 3));
    let analysis = Analysis::build(&config).unwrap();

    assert_eq!(analysis.commits().len(), 1);
    let authors = analysis.list_authors().unwrap();
    assert_eq!(authors.len(), 1);
    assert_eq!(authors[0].name, "Sam");
}

#[test]
fn test_branch_reports_only_its_own_commits() {
    let test_repo = TestRepo::new();
    let root = test_repo.commit("main", None, &[("a.txt", "a\n")], ("Jane", "jane@work.com"), 2);
    test_repo.commit("feature", Some(root), &[("b.txt", "b\n")], ("Sam", "sam@work.com"), 3);
    test_repo.commit("main", Some(root), &[("a.txt", "a\nz\n")], ("Jane", "jane@work.com"), 4);

    let config = AnalysisConfig::new(test_repo.path(), july(1, 7)).with_branch("feature");
    let analysis = Analysis::build(&config).unwrap();

    assert_eq!(analysis.commits().len(), 1);
    let authors = analysis.list_authors().unwrap();
    assert_eq!(authors.len(), 1);
    assert_eq!(authors[0].name, "Sam");
}

#[test]
fn test_entire_history_range() {
    let test_repo = TestRepo::new();
    let root = test_repo.commit("main", None, &[("a.txt", "a\n")], ("Jane", "jane@work.com"), 2);
    test_repo.commit("main", Some(root), &[("a.txt", "a\nb\n")], ("Jane", "jane@work.com"), 9);

    let config = AnalysisConfig::new(test_repo.path(), DateWindow::EntireHistory);
    let analysis = Analysis::build(&config).unwrap();

    assert_eq!(analysis.reporting_range().start, date(2));
    assert_eq!(analysis.reporting_range().end, date(9));
    assert_eq!(analysis.commits().len(), 2);
}

#[test]
fn test_alias_file_merges_identities() {
    let test_repo = TestRepo::with_history();
    let aliases_dir = TempDir::new().unwrap();
    let aliases_path = aliases_dir.path().join("aliases.json");
    fs::write(
        &aliases_path,
        r#"[{"id": "jane", "name": "Jane Doe", "emails": ["jane@work.com", "jane@home.org", "jd@old.net"]}]"#,
    )
    .unwrap();

    let config = AnalysisConfig::new(test_repo.path(), july(1, 7)).with_aliases(&aliases_path);
    let analysis = Analysis::build(&config).unwrap();

    let authors = analysis.list_authors().unwrap();
    assert_eq!(authors[0].name, "Jane Doe");
    assert_eq!(authors[0].emails.len(), 3);
    assert_eq!(authors[1].name, "Sam");
}

#[test]
fn test_conflicting_alias_file() {
    let test_repo = TestRepo::with_history();
    let aliases_dir = TempDir::new().unwrap();
    let aliases_path = aliases_dir.path().join("aliases.json");
    fs::write(
        &aliases_path,
        r#"[{"name": "A", "emails": ["shared@x.com"]}, {"name": "B", "emails": ["shared@x.com"]}]"#,
    )
    .unwrap();

    let config = AnalysisConfig::new(test_repo.path(), july(1, 7)).with_aliases(&aliases_path);
    let err = Analysis::build(&config).unwrap_err();
    assert!(err.to_string().starts_with("Aliases can't share an email address"));
}

#[test]
fn test_output_serializes() {
    let test_repo = TestRepo::with_history();
    let config = AnalysisConfig::new(test_repo.path(), july(1, 7));
    let output = Analysis::build(&config).unwrap().output(true).unwrap();

    assert_eq!(output.daily_developer_stats.as_ref().map(Vec::len), Some(5));

    let json = serde_json::to_value(&output).unwrap();
    assert_eq!(json["developer_stats"].as_array().unwrap().len(), 2);
    assert_eq!(json["reporting_range"]["start"], "2018-07-01");
    // NaN velocity has no JSON number form
    assert!(json["team_stats"][3]["velocity"].is_null());
}
