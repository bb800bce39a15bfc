//! Per-developer statistics

use chrono::NaiveDate;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeSet;

use crate::calendar::ReportingPeriod;
use crate::model::{Author, Commit};

use super::{commit_impact, guard, round2, MetricOptions};

/// Productivity figures for one developer over a reporting period
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeveloperStats {
    pub author: Author,
    /// Commits attributed in the period
    pub commits: usize,
    /// Distinct dates with at least one commit
    pub period_active_days: usize,
    pub active_days_per_week: f64,
    pub commits_per_day: f64,
    pub impact: f64,
    pub lines_of_change_per_hour: f64,
    /// Removed lines per added line
    pub churn: f64,
    pub lines_added: usize,
    pub lines_removed: usize,
    /// Hours per 100 lines of raw change
    pub rtt100: f64,
    /// Hours per 100 lines of production code
    pub ptt100: f64,
    /// Difference between `ptt100` and `rtt100`
    pub dtt100: f64,
    pub risk_factor: f64,
}

impl DeveloperStats {
    /// Compute statistics for `author` from commits inside `period`
    ///
    /// `commits` is expected in chronological order; commits outside the
    /// period or by other developers are skipped.
    pub fn compute(author: &Author, commits: &[Commit], period: &ReportingPeriod, options: &MetricOptions) -> Self {
        let authored: Vec<&Commit> = commits
            .iter()
            .filter(|commit| author.owns(&commit.committer_email) && period.contains(commit.date()))
            .collect();

        let active_dates: BTreeSet<NaiveDate> = authored.iter().map(|commit| commit.date()).collect();
        let active_days = active_dates.len();

        let mut lines_added = 0;
        let mut lines_removed = 0;
        let mut impact = 0.0;
        for commit in &authored {
            for patch in commit.all_patches().filter(|patch| !options.is_ignored(patch)) {
                lines_added += options.lines_added(patch);
                lines_removed += patch.lines_removed;
            }
            impact += commit_impact(commit, options);
        }

        let hours_worked = period.hours_per_day() * active_days as f64;
        let commits_per_day = commits_per_day(authored.len(), active_days);
        let lines_of_change_per_hour = lines_of_change_per_hour(lines_added, lines_removed, hours_worked);
        let rtt100 = rtt100(lines_of_change_per_hour);
        let ptt100 = ptt100(lines_added, lines_removed, hours_worked);

        Self {
            author: author.clone(),
            commits: authored.len(),
            period_active_days: active_days,
            active_days_per_week: round2(active_days as f64 / period.period_weeks() as f64),
            commits_per_day,
            impact: round2(impact),
            lines_of_change_per_hour,
            churn: churn(lines_added, lines_removed),
            lines_added,
            lines_removed,
            rtt100,
            ptt100,
            dtt100: round2(ptt100 - rtt100),
            risk_factor: risk_factor(lines_of_change_per_hour, commits_per_day),
        }
    }
}

/// Commits per active day, zero without commits or active days
pub fn commits_per_day(commits: usize, active_days: usize) -> f64 {
    if commits == 0 || active_days == 0 {
        0.0
    } else {
        round2(commits as f64 / active_days as f64)
    }
}

/// Removed lines per added line
pub fn churn(lines_added: usize, lines_removed: usize) -> f64 {
    guard(round2(lines_removed as f64 / lines_added as f64))
}

pub fn lines_of_change_per_hour(lines_added: usize, lines_removed: usize, hours_worked: f64) -> f64 {
    guard(round2((lines_added + lines_removed) as f64 / hours_worked))
}

/// Hours to produce 100 lines of raw change
pub fn rtt100(lines_of_change_per_hour: f64) -> f64 {
    guard(round2(100.0 / lines_of_change_per_hour))
}

/// Hours to produce 100 lines of production code, net of removals
pub fn ptt100(lines_added: usize, lines_removed: usize, hours_worked: f64) -> f64 {
    let net = lines_added as f64 - lines_removed as f64;
    let production_lines_per_hour = round2(net / hours_worked);
    guard(round2((100.0 / production_lines_per_hour).abs()))
}

pub fn risk_factor(lines_of_change_per_hour: f64, commits_per_day: f64) -> f64 {
    guard(round2(lines_of_change_per_hour / commits_per_day))
}

/// Statistics for every author, in author order
pub fn build_developer_stats(
    authors: &[Author],
    commits: &[Commit],
    period: &ReportingPeriod,
    options: &MetricOptions,
) -> Vec<DeveloperStats> {
    authors
        .par_iter()
        .map(|author| DeveloperStats::compute(author, commits, period, options))
        .collect()
}

/// Developer statistics for a single working day
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyDeveloperStats {
    pub date: NaiveDate,
    pub stats: Vec<DeveloperStats>,
}

/// Developer statistics for each working day of the period
pub fn build_daily_developer_stats(
    authors: &[Author],
    commits: &[Commit],
    period: &ReportingPeriod,
    options: &MetricOptions,
) -> Vec<DailyDeveloperStats> {
    period
        .generate_dates_for_range()
        .map(|date| DailyDeveloperStats {
            date,
            stats: build_developer_stats(authors, commits, &period.for_day(date), options),
        })
        .collect()
}
