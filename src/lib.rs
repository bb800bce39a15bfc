//! Developer and team productivity metrics from git history.
//!
//! Build an [`Analysis`] for a repository and reporting window, then query
//! resolved authors, per-developer statistics and per-day team statistics.

pub mod aliases;
pub mod analysis;
pub mod calendar;
pub mod config;
pub mod diff;
pub mod error;
pub mod filters;
pub mod git;
pub mod logging;
pub mod metrics;
pub mod model;

pub use aliases::{resolve, Alias, AliasTable};
pub use analysis::{Analysis, AnalysisConfig, DateWindow, StatsOutput};
pub use calendar::ReportingPeriod;
pub use error::{AnalysisError, AnalysisResult};
pub use git::{GitRepository, RawCommit, RepositoryReader};
pub use metrics::{DailyDeveloperStats, DeveloperStats, MetricOptions, TeamStats};
pub use model::{Author, ChangeType, Commit, Patch, PatchSet};
