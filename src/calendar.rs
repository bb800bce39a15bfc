//! Reporting Period Calendar
//!
//! Date arithmetic over a reporting window with a configurable work week.
//! All rate metrics are normalised against the figures produced here.
//!
//! A work week is described by hours and days per week. Days per week may be
//! fractional (a 4.5 day week) and may be shorter than the number of
//! non-weekend days; in that case working days are approximated by deducting
//! the missing days per elapsed week instead of enumerating every day off.

use chrono::{Datelike, NaiveDate, Weekday};
use serde::Serialize;

use crate::error::{AnalysisError, AnalysisResult};

/// Default hours worked per week
pub const DEFAULT_HOURS_PER_WEEK: f64 = 40.0;

/// Default days worked per week
pub const DEFAULT_DAYS_PER_WEEK: f64 = 5.0;

/// Days in the nominal work week that compressed weeks are measured against
const NOMINAL_WORK_WEEK: f64 = 5.0;

/// Reporting window plus work week shape
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportingPeriod {
    /// First day of the window (inclusive)
    pub start: NaiveDate,
    /// Last day of the window (inclusive)
    pub end: NaiveDate,
    /// Hours worked per week
    pub hours_per_week: f64,
    /// Days worked per week, may be fractional
    pub days_per_week: f64,
    /// Days never counted as working days
    pub weekends: Vec<Weekday>,
}

impl ReportingPeriod {
    /// Create a period with the default 40 hour, 5 day week and a Saturday/Sunday weekend
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start,
            end,
            hours_per_week: DEFAULT_HOURS_PER_WEEK,
            days_per_week: DEFAULT_DAYS_PER_WEEK,
            weekends: vec![Weekday::Sat, Weekday::Sun],
        }
    }

    /// Set the work week shape
    pub fn with_work_week(mut self, hours_per_week: f64, days_per_week: f64) -> Self {
        self.hours_per_week = hours_per_week;
        self.days_per_week = days_per_week;
        self
    }

    /// Replace the weekend day set
    pub fn with_weekends<I>(mut self, weekends: I) -> Self
    where
        I: IntoIterator<Item = Weekday>,
    {
        self.weekends.clear();
        for day in weekends {
            if !self.weekends.contains(&day) {
                self.weekends.push(day);
            }
        }
        self
    }

    /// Copy of this period covering a single day
    pub fn for_day(&self, date: NaiveDate) -> Self {
        Self {
            start: date,
            end: date,
            ..self.clone()
        }
    }

    /// Check the work week shape is usable for rate calculations
    pub fn validate(&self) -> AnalysisResult<()> {
        if !(self.hours_per_week.is_finite() && self.hours_per_week > 0.0) {
            return Err(AnalysisError::configuration(format!(
                "hours per week must be greater than 0 (got {})",
                self.hours_per_week
            )));
        }
        if !(self.days_per_week > 0.0 && self.days_per_week <= 7.0) {
            return Err(AnalysisError::configuration(format!(
                "days per week must be greater than 0 and at most 7 (got {})",
                self.days_per_week
            )));
        }
        Ok(())
    }

    /// Whether the given date falls inside the window
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Calendar days in the window, zero when the end precedes the start
    pub fn period_days(&self) -> i64 {
        if self.end >= self.start {
            (self.end - self.start).num_days() + 1
        } else {
            0
        }
    }

    /// Whole weeks in the window, never less than one
    pub fn period_weeks(&self) -> i64 {
        ((self.period_days() as f64 / 7.0).round() as i64).max(1)
    }

    /// Working days in the window
    pub fn period_working_days(&self) -> f64 {
        let weekdays = self.generate_dates_for_range().count() as f64;

        if self.period_days() as f64 >= self.days_per_week {
            // weeks longer than five days add days back
            let missing_per_week = NOMINAL_WORK_WEEK - self.days_per_week;
            (weekdays - missing_per_week * self.period_weeks() as f64).max(0.0)
        } else {
            weekdays.ceil()
        }
    }

    /// Hours in one working day
    pub fn hours_per_day(&self) -> f64 {
        self.hours_per_week / self.days_per_week
    }

    /// Working hours in the window
    pub fn period_working_hours(&self) -> f64 {
        self.period_working_days().ceil() * self.hours_per_day()
    }

    /// Every non-weekend date in the window, in order
    ///
    /// The sequence is lazy and `Clone`, so it can be restarted by cloning
    /// before consumption or by calling this method again.
    pub fn generate_dates_for_range(&self) -> DateSequence {
        DateSequence::new(self.start, self.end, self.weekends.clone())
    }

    /// Every date in the window including weekends
    pub fn all_dates(&self) -> DateSequence {
        DateSequence::new(self.start, self.end, Vec::new())
    }
}

/// Lazy sequence of dates between two bounds, skipping excluded weekdays
#[derive(Debug, Clone)]
pub struct DateSequence {
    next: Option<NaiveDate>,
    end: NaiveDate,
    excluded: Vec<Weekday>,
}

impl DateSequence {
    fn new(start: NaiveDate, end: NaiveDate, excluded: Vec<Weekday>) -> Self {
        Self {
            next: (start <= end).then_some(start),
            end,
            excluded,
        }
    }
}

impl Iterator for DateSequence {
    type Item = NaiveDate;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(date) = self.next {
            if date > self.end {
                self.next = None;
                return None;
            }
            self.next = date.succ_opt();
            if !self.excluded.contains(&date.weekday()) {
                return Some(date);
            }
        }
        None
    }
}
