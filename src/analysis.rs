//! Analysis Orchestrator
//!
//! Ties the pieces together: reads commits from a repository, narrows them to
//! the reporting window, loads their diffs once, and then answers author,
//! developer and team queries from memory.
//!
//! ```no_run
//! use chrono::NaiveDate;
//! use devstats::analysis::{Analysis, AnalysisConfig, DateWindow};
//!
//! let start = NaiveDate::from_ymd_opt(2018, 7, 1).unwrap();
//! let end = NaiveDate::from_ymd_opt(2018, 7, 31).unwrap();
//! let config = AnalysisConfig::new("/path/to/repo", DateWindow::Explicit { start, end });
//!
//! let analysis = Analysis::build(&config)?;
//! let authors = analysis.list_authors()?;
//! let stats = analysis.build_developer_stats(&authors);
//! # Ok::<(), devstats::AnalysisError>(())
//! ```

use chrono::{Local, NaiveDate, Weekday};
use log::{debug, info};
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;

use crate::aliases::{self, Alias, AliasTable};
use crate::calendar::{ReportingPeriod, DEFAULT_DAYS_PER_WEEK, DEFAULT_HOURS_PER_WEEK};
use crate::diff::DEFAULT_COMMENT_MARKER;
use crate::error::{AnalysisError, AnalysisResult};
use crate::filters::{DateFilter, PathFilter, ScanFilter};
use crate::git::{GitRepository, RawCommit, RepositoryReader};
use crate::metrics::{self, DailyDeveloperStats, DeveloperStats, MetricOptions, TeamStats};
use crate::model::{Author, Commit, PatchSet};

/// Date range an analysis reports on
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DateWindow {
    /// Inclusive calendar dates
    Explicit { start: NaiveDate, end: NaiveDate },
    /// Oldest to newest author date on the analysed branch
    EntireHistory,
}

/// Everything needed to build an [`Analysis`]
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub repository: PathBuf,
    /// Branch to analyse, trunk when unset
    pub branch: Option<String>,
    /// Trunk branch, detected when unset
    pub trunk: Option<String>,
    pub window: DateWindow,
    pub hours_per_week: f64,
    pub days_per_week: f64,
    pub weekends: Vec<Weekday>,
    pub ignore_patterns: Vec<String>,
    pub ignore_comments: bool,
    pub comment_marker: String,
    /// Alias table file
    pub aliases: Option<PathBuf>,
    /// Include weekend dates in team statistics
    pub team_weekends: bool,
}

impl AnalysisConfig {
    pub fn new(repository: impl Into<PathBuf>, window: DateWindow) -> Self {
        Self {
            repository: repository.into(),
            branch: None,
            trunk: None,
            window,
            hours_per_week: DEFAULT_HOURS_PER_WEEK,
            days_per_week: DEFAULT_DAYS_PER_WEEK,
            weekends: vec![Weekday::Sat, Weekday::Sun],
            ignore_patterns: Vec::new(),
            ignore_comments: false,
            comment_marker: DEFAULT_COMMENT_MARKER.to_string(),
            aliases: None,
            team_weekends: false,
        }
    }

    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = Some(branch.into());
        self
    }

    pub fn with_trunk(mut self, trunk: impl Into<String>) -> Self {
        self.trunk = Some(trunk.into());
        self
    }

    pub fn with_work_week(mut self, hours_per_week: f64, days_per_week: f64) -> Self {
        self.hours_per_week = hours_per_week;
        self.days_per_week = days_per_week;
        self
    }

    pub fn with_weekends<I>(mut self, weekends: I) -> Self
    where
        I: IntoIterator<Item = Weekday>,
    {
        self.weekends = weekends.into_iter().collect();
        self
    }

    pub fn with_ignore_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignore_patterns = patterns.into_iter().map(Into::into).collect();
        self
    }

    /// Deduct added comment lines starting with `marker`
    pub fn with_comment_stripping(mut self, marker: impl Into<String>) -> Self {
        self.ignore_comments = true;
        self.comment_marker = marker.into();
        self
    }

    pub fn with_aliases(mut self, path: impl Into<PathBuf>) -> Self {
        self.aliases = Some(path.into());
        self
    }

    pub fn with_team_weekends(mut self, include: bool) -> Self {
        self.team_weekends = include;
        self
    }

    /// Check the configuration before touching the repository
    pub fn validate(&self) -> AnalysisResult<()> {
        ReportingPeriod::new(NaiveDate::MIN, NaiveDate::MIN)
            .with_work_week(self.hours_per_week, self.days_per_week)
            .validate()?;

        if self.ignore_comments && self.comment_marker.trim().is_empty() {
            return Err(AnalysisError::configuration("comment marker must not be empty"));
        }

        Ok(())
    }

    /// Line counting options derived from this configuration
    pub fn metric_options(&self) -> AnalysisResult<MetricOptions> {
        Ok(MetricOptions {
            ignore: PathFilter::new(self.ignore_patterns.iter().cloned())?,
            ignore_comments: self.ignore_comments,
            comment_marker: self.comment_marker.clone(),
        })
    }

    fn period(&self, start: NaiveDate, end: NaiveDate) -> ReportingPeriod {
        ReportingPeriod::new(start, end)
            .with_work_week(self.hours_per_week, self.days_per_week)
            .with_weekends(self.weekends.iter().copied())
    }
}

/// Aggregate handed to presentation layers
#[derive(Debug, Clone, Serialize)]
pub struct StatsOutput {
    pub authors: Vec<Author>,
    pub developer_stats: Vec<DeveloperStats>,
    pub team_stats: Vec<TeamStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub daily_developer_stats: Option<Vec<DailyDeveloperStats>>,
    pub reporting_range: ReportingPeriod,
}

/// In-memory analysis over the commits of one reporting period
#[derive(Debug, Clone)]
pub struct Analysis {
    commits: Vec<Commit>,
    period: ReportingPeriod,
    options: MetricOptions,
    aliases: Vec<Alias>,
    team_weekends: bool,
}

impl Analysis {
    /// Open the configured repository and load the reporting window
    ///
    /// The repository is closed again before this returns.
    pub fn build(config: &AnalysisConfig) -> AnalysisResult<Self> {
        config.validate()?;

        let mut repository = GitRepository::open(&config.repository)?;
        if let Some(trunk) = &config.trunk {
            repository = repository.with_trunk(trunk.clone());
        }
        info!("Analysing repository at {}", repository.path().display());

        Self::build_with_reader(&repository, config)
    }

    /// Load the reporting window through any repository reader
    pub fn build_with_reader<R>(reader: &R, config: &AnalysisConfig) -> AnalysisResult<Self>
    where
        R: RepositoryReader + ?Sized,
    {
        config.validate()?;

        let trunk = match &config.trunk {
            Some(trunk) if reader.branch_exists(trunk) => trunk.clone(),
            Some(trunk) => return Err(AnalysisError::UnknownBranch { branch: trunk.clone() }),
            None => reader.trunk_branch()?,
        };
        let branch = config.branch.clone().unwrap_or_else(|| trunk.clone());
        if !reader.branch_exists(&branch) {
            return Err(AnalysisError::UnknownBranch { branch });
        }

        let options = config.metric_options()?;
        let aliases = AliasTable::load(config.aliases.as_deref())?;

        let exclude = (branch != trunk).then_some(trunk.as_str());
        let mut listed = reader.list_commits(&branch, exclude)?;
        listed.sort_by_key(|commit| commit.when);

        let (start, end) = match config.window {
            DateWindow::Explicit { start, end } => (start, end),
            DateWindow::EntireHistory => history_bounds(&listed),
        };
        let period = config.period(start, end);
        info!("Reporting on '{}' from {} to {}", branch, start, end);

        let window = DateFilter::new(start, end);
        let commits = listed
            .iter()
            .filter(|raw| window.accepts(*raw))
            .map(|raw| load_commit(reader, raw))
            .collect::<AnalysisResult<Vec<_>>>()?;
        info!("Loaded {} of {} commits", commits.len(), listed.len());

        Ok(Self {
            commits,
            period,
            options,
            aliases,
            team_weekends: config.team_weekends,
        })
    }

    /// Analysis over commits already in memory
    ///
    /// Commits outside `period` are dropped.
    pub fn from_commits(
        mut commits: Vec<Commit>,
        period: ReportingPeriod,
        options: MetricOptions,
        aliases: Vec<Alias>,
    ) -> AnalysisResult<Self> {
        period.validate()?;
        aliases::validate_disjoint(&aliases)?;

        let window = DateFilter::new(period.start, period.end);
        commits.retain(|commit| window.accepts(commit));
        commits.sort_by_key(|commit| commit.when);

        Ok(Self {
            commits,
            period,
            options,
            aliases,
            team_weekends: false,
        })
    }

    /// Include weekend dates in team statistics
    pub fn with_team_weekends(mut self, include: bool) -> Self {
        self.team_weekends = include;
        self
    }

    /// Commits in the reporting window, oldest first
    pub fn commits(&self) -> &[Commit] {
        &self.commits
    }

    pub fn reporting_range(&self) -> &ReportingPeriod {
        &self.period
    }

    /// Developers who committed in the window, after alias resolution
    ///
    /// Raw authors are grouped by name, collecting every email used under
    /// that name, in order of first appearance.
    pub fn list_authors(&self) -> AnalysisResult<Vec<Author>> {
        let mut raw: Vec<Author> = Vec::new();
        let mut by_name: HashMap<&str, usize> = HashMap::new();

        for commit in &self.commits {
            let email = commit.author_email().to_string();
            match by_name.get(commit.author.name.as_str()) {
                Some(&index) => {
                    raw[index].emails.insert(email);
                }
                None => {
                    by_name.insert(commit.author.name.as_str(), raw.len());
                    raw.push(Author::new(commit.author.name.clone(), email));
                }
            }
        }

        aliases::resolve(&raw, &self.aliases)
    }

    pub fn build_developer_stats(&self, authors: &[Author]) -> Vec<DeveloperStats> {
        metrics::build_developer_stats(authors, &self.commits, &self.period, &self.options)
    }

    /// Team statistics per date of the reporting window
    pub fn build_team_stats(&self) -> AnalysisResult<Vec<TeamStats>> {
        let authors = self.list_authors()?;
        Ok(metrics::build_team_stats(&authors, &self.commits, &self.period, self.team_weekends))
    }

    /// Developer statistics for each working day of the window
    pub fn build_daily_developer_stats(&self, authors: &[Author]) -> Vec<DailyDeveloperStats> {
        metrics::build_daily_developer_stats(authors, &self.commits, &self.period, &self.options)
    }

    /// Assemble every statistic for a consumer
    pub fn output(&self, include_daily: bool) -> AnalysisResult<StatsOutput> {
        let authors = self.list_authors()?;
        let developer_stats = self.build_developer_stats(&authors);
        let team_stats = metrics::build_team_stats(&authors, &self.commits, &self.period, self.team_weekends);
        let daily_developer_stats = include_daily.then(|| self.build_daily_developer_stats(&authors));

        Ok(StatsOutput {
            authors,
            developer_stats,
            team_stats,
            daily_developer_stats,
            reporting_range: self.period.clone(),
        })
    }
}

/// Oldest and newest author dates, today when there are no commits
fn history_bounds(commits: &[RawCommit]) -> (NaiveDate, NaiveDate) {
    let dates = commits.iter().map(RawCommit::date);
    match (dates.clone().min(), dates.max()) {
        (Some(start), Some(end)) => (start, end),
        _ => {
            let today = Local::now().date_naive();
            (today, today)
        }
    }
}

fn load_commit<R>(reader: &R, raw: &RawCommit) -> AnalysisResult<Commit>
where
    R: RepositoryReader + ?Sized,
{
    debug!("Loading diffs for {} by {} <{}>", raw.id, raw.author_name, raw.author_email);

    let patches = if raw.parent_ids.is_empty() {
        vec![PatchSet::initial(reader.diff(None, &raw.id)?)]
    } else {
        raw.parent_ids
            .iter()
            .map(|parent| Ok(PatchSet::against(parent.clone(), reader.diff(Some(parent), &raw.id)?)))
            .collect::<AnalysisResult<Vec<_>>>()?
    };

    Ok(Commit::new(
        raw.id.clone(),
        Author::new(raw.author_name.clone(), raw.author_email.clone()),
        raw.when,
        patches,
    )
    .with_committer(raw.committer_email.clone()))
}
