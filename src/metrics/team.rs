//! Per-day team aggregation

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashSet;

use crate::calendar::ReportingPeriod;
use crate::model::{Author, Commit};

use super::round2;

/// Team activity on one date
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamStats {
    pub date: NaiveDate,
    pub total_commits: usize,
    pub active_developers: usize,
    /// Commits per active developer, `NaN` when nobody committed
    pub velocity: f64,
}

impl TeamStats {
    pub fn new(date: NaiveDate, total_commits: usize, active_developers: usize) -> Self {
        Self {
            date,
            total_commits,
            active_developers,
            velocity: round2(total_commits as f64 / active_developers as f64),
        }
    }
}

/// Team statistics for each date of the period
///
/// Weekend dates are skipped unless `include_weekends` is set. Commits are
/// counted per developer through the resolved `authors` by committer email; a
/// commit no author owns counts that email as a developer of its own.
pub fn build_team_stats(
    authors: &[Author],
    commits: &[Commit],
    period: &ReportingPeriod,
    include_weekends: bool,
) -> Vec<TeamStats> {
    let dates = if include_weekends {
        period.all_dates()
    } else {
        period.generate_dates_for_range()
    };

    dates
        .map(|date| {
            let mut developers: HashSet<usize> = HashSet::new();
            let mut unresolved: HashSet<&str> = HashSet::new();
            let mut total_commits = 0;

            for commit in commits.iter().filter(|commit| commit.date() == date) {
                total_commits += 1;
                let email = commit.committer_email.as_str();
                match authors.iter().position(|author| author.owns(email)) {
                    Some(index) => {
                        developers.insert(index);
                    }
                    None => {
                        unresolved.insert(email);
                    }
                }
            }

            TeamStats::new(date, total_commits, developers.len() + unresolved.len())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn commit(id: &str, email: &str, day: u32) -> Commit {
        let when = FixedOffset::east_opt(0).unwrap().with_ymd_and_hms(2018, 7, day, 12, 0, 0).unwrap();
        Commit::new(id, Author::new("someone", email), when, vec![])
    }

    #[test]
    fn test_velocity() {
        assert_eq!(TeamStats::new(date(2018, 7, 2), 1, 3).velocity, 0.33);
        assert_eq!(TeamStats::new(date(2018, 7, 2), 4, 2).velocity, 2.0);
    }

    #[test]
    fn test_velocity_is_unguarded() {
        assert!(TeamStats::new(date(2018, 7, 2), 0, 0).velocity.is_nan());
    }

    #[test]
    fn test_team_stats_per_day() {
        let jane = Author::with_emails("Jane", ["jane@work.com", "jane@home.org"]);
        let sam = Author::new("Sam", "sam@work.com");
        let commits = vec![
            commit("a", "jane@work.com", 2),
            commit("b", "jane@home.org", 2),
            commit("c", "sam@work.com", 2),
            commit("d", "sam@work.com", 3),
            commit("e", "sam@work.com", 7),
        ];
        // Monday to Saturday
        let period = ReportingPeriod::new(date(2018, 7, 2), date(2018, 7, 7));

        let stats = build_team_stats(&[jane, sam], &commits, &period, false);
        assert_eq!(stats.len(), 5);
        assert_eq!(stats[0].total_commits, 3);
        assert_eq!(stats[0].active_developers, 2);
        assert_eq!(stats[0].velocity, 1.5);
        assert_eq!(stats[1].velocity, 1.0);
        assert!(stats[2].velocity.is_nan());
    }

    #[test]
    fn test_team_stats_with_weekends() {
        let sam = Author::new("Sam", "sam@work.com");
        let commits = vec![commit("e", "sam@work.com", 7)];
        let period = ReportingPeriod::new(date(2018, 7, 2), date(2018, 7, 7));

        let stats = build_team_stats(&[sam], &commits, &period, true);
        assert_eq!(stats.len(), 6);
        assert_eq!(stats[5].date, date(2018, 7, 7));
        assert_eq!(stats[5].total_commits, 1);
    }

    #[test]
    fn test_unresolved_emails_count_separately() {
        let commits = vec![commit("a", "x@y.z", 2), commit("b", "w@y.z", 2)];
        let period = ReportingPeriod::new(date(2018, 7, 2), date(2018, 7, 2));
        let stats = build_team_stats(&[], &commits, &period, false);
        assert_eq!(stats[0].active_developers, 2);
    }

    #[test]
    fn test_developers_counted_by_committer() {
        let jane = Author::new("Jane", "jane@work.com");
        let commits = vec![
            commit("a", "jane@work.com", 2),
            commit("b", "jane@work.com", 2).with_committer("bot@ci.com"),
        ];
        let period = ReportingPeriod::new(date(2018, 7, 2), date(2018, 7, 2));

        let stats = build_team_stats(&[jane], &commits, &period, false);
        assert_eq!(stats[0].total_commits, 2);
        assert_eq!(stats[0].active_developers, 2);
        assert_eq!(stats[0].velocity, 1.0);
    }
}
