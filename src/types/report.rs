use crate::types::season::SeasonWindow;
use serde::Serialize;
use std::fmt;
use std::fmt::{Display, Formatter};

/// Hour-level chill summary over a set of samples.
///
/// `chill_hours` never exceeds `total_hours`, and `percent_chill_hours` is
/// `100 * chill_hours / total_hours` (zero when there are no hours at all).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub total_hours: usize,
    pub chill_hours: usize,
    pub percent_chill_hours: f64,
    pub period_label: String,
}

impl Report {
    pub(crate) fn new(total_hours: usize, chill_hours: usize, period_label: String) -> Self {
        debug_assert!(chill_hours <= total_hours);
        let percent_chill_hours = if total_hours > 0 {
            100.0 * chill_hours as f64 / total_hours as f64
        } else {
            0.0
        };
        Self {
            total_hours,
            chill_hours,
            percent_chill_hours,
            period_label,
        }
    }

    /// The zero report returned when no samples fall in the requested window.
    pub(crate) fn empty(period_label: impl Into<String>) -> Self {
        Self::new(0, 0, period_label.into())
    }

    /// `true` when the report was built from no data at all.
    pub fn is_empty(&self) -> bool {
        self.total_hours == 0
    }
}

impl Display for Report {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} chill hours of {} hours ({:.1}%)",
            self.period_label, self.chill_hours, self.total_hours, self.percent_chill_hours
        )
    }
}

/// How much of a season's calendar span is backed by actual readings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Coverage {
    /// Days between the earliest and latest sample in the season.
    pub covered_days: i64,
    /// Length of the season window in days.
    pub season_days: i64,
    /// `covered_days` as a rounded percentage of `season_days`.
    pub percent: i64,
}

/// Coverage below this percentage produces a [`CoverageWarning`].
pub const COVERAGE_WARNING_PERCENT: i64 = 80;

impl Coverage {
    pub fn warning(&self) -> Option<CoverageWarning> {
        (self.percent < COVERAGE_WARNING_PERCENT).then_some(CoverageWarning {
            covered_days: self.covered_days,
            season_days: self.season_days,
            percent: self.percent,
        })
    }
}

/// Advisory notice that a season report is built on thin data. Never an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CoverageWarning {
    pub covered_days: i64,
    pub season_days: i64,
    pub percent: i64,
}

impl Display for CoverageWarning {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "data covers only {} of {} season days ({}%), the chill hour count is likely incomplete",
            self.covered_days, self.season_days, self.percent
        )
    }
}

/// A [`Report`] restricted to a [`SeasonWindow`], with its coverage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeasonReport {
    pub window: SeasonWindow,
    pub report: Report,
    /// `None` when the window contained no samples.
    pub coverage: Option<Coverage>,
}

impl SeasonReport {
    pub fn coverage_warning(&self) -> Option<CoverageWarning> {
        self.coverage.as_ref().and_then(Coverage::warning)
    }
}
