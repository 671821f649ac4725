//! Hour-level chill classification of temperature samples.
//!
//! Samples are grouped by the calendar hour they fall in, in the aggregator's
//! time zone. Each group is one hour, however many readings it holds, and it
//! is a chill hour when at least half of its readings lie in the
//! [`ChillRange`]. Hours without any readings are not counted at all, so gaps
//! in the data lower `total_hours` instead of being interpolated.

use crate::aggregate::coverage::season_coverage;
use crate::aggregate::hour_bucket::{ChillRange, HourBucket, HourKey};
use crate::types::error::SeasonError;
use crate::types::report::{Report, SeasonReport};
use crate::types::sample::Sample;
use crate::types::season::SeasonWindow;
use chrono::{DateTime, Local, TimeZone, Utc};
use log::{debug, warn};
use std::collections::BTreeMap;
use std::fmt::Display;

const LABEL_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Turns samples into chill-hour [`Report`]s.
///
/// Buckets are drawn in `Tz`: [`Local`] by default, which matches the
/// wall-clock hours of the station owner. Note that around a DST fall-back
/// the repeated wall-clock hour collapses into a single bucket.
///
/// # Examples
///
/// ```
/// use chillhours::{ChillHourAggregator, ChillRange, Sample};
/// use chrono::{TimeZone, Utc};
///
/// let aggregator = ChillHourAggregator::with_timezone(ChillRange::default(), Utc);
/// let samples = vec![
///     Sample::new(Utc.with_ymd_and_hms(2023, 1, 15, 3, 0, 0).unwrap(), 38.0),
///     Sample::new(Utc.with_ymd_and_hms(2023, 1, 15, 4, 0, 0).unwrap(), 52.0),
/// ];
/// let report = aggregator.summarize(&samples);
/// assert_eq!(report.total_hours, 2);
/// assert_eq!(report.chill_hours, 1);
/// assert_eq!(report.percent_chill_hours, 50.0);
/// ```
#[derive(Debug, Clone)]
pub struct ChillHourAggregator<Tz: TimeZone = Local> {
    range: ChillRange,
    tz: Tz,
}

impl ChillHourAggregator<Local> {
    pub fn new(range: ChillRange) -> Self {
        Self::with_timezone(range, Local)
    }
}

impl Default for ChillHourAggregator<Local> {
    fn default() -> Self {
        Self::new(ChillRange::default())
    }
}

impl<Tz> ChillHourAggregator<Tz>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    pub fn with_timezone(range: ChillRange, tz: Tz) -> Self {
        Self { range, tz }
    }

    pub fn range(&self) -> ChillRange {
        self.range
    }

    pub fn timezone(&self) -> &Tz {
        &self.tz
    }

    /// Groups samples by calendar hour. Within each bucket samples are in
    /// timestamp order, whatever the input order.
    pub fn bucket(&self, samples: &[Sample]) -> BTreeMap<HourKey, HourBucket> {
        let mut sorted = samples.to_vec();
        sorted.sort_by_key(|sample| sample.timestamp);

        let mut buckets: BTreeMap<HourKey, HourBucket> = BTreeMap::new();
        for sample in sorted {
            buckets
                .entry(HourKey::of(&sample.timestamp, &self.tz))
                .or_default()
                .push(sample, &self.range);
        }
        buckets
    }

    pub fn summarize(&self, samples: &[Sample]) -> Report {
        let (Some(earliest), Some(latest)) = (
            samples.iter().map(|sample| sample.timestamp).min(),
            samples.iter().map(|sample| sample.timestamp).max(),
        ) else {
            return Report::empty("no data");
        };

        let buckets = self.bucket(samples);
        let total_hours = buckets.len();
        let chill_hours = buckets.values().filter(|bucket| bucket.is_chill()).count();
        debug!(
            "{} samples in {} hours, {} chill hours",
            samples.len(),
            total_hours,
            chill_hours
        );

        Report::new(
            total_hours,
            chill_hours,
            format!("{} to {}", self.format(earliest), self.format(latest)),
        )
    }

    /// Summarizes only the samples inside the season starting in
    /// `season_start_month` and ending in `year`, see [`SeasonWindow::new`].
    pub fn summarize_season(
        &self,
        samples: &[Sample],
        season_start_month: u32,
        year: i32,
    ) -> Result<SeasonReport, SeasonError> {
        let window = SeasonWindow::new(season_start_month, year)?;
        Ok(self.summarize_window(samples, window))
    }

    pub fn summarize_window(&self, samples: &[Sample], window: SeasonWindow) -> SeasonReport {
        let no_data = || SeasonReport {
            window,
            report: Report::empty(format!("{} (no data)", window)),
            coverage: None,
        };

        let Some(bounds) = window.bounds_in(&self.tz) else {
            return no_data();
        };
        let in_season: Vec<Sample> = samples
            .iter()
            .filter(|sample| bounds.start <= sample.timestamp && sample.timestamp <= bounds.end)
            .copied()
            .collect();

        let (Some(earliest), Some(latest)) = (
            in_season.iter().map(|sample| sample.timestamp).min(),
            in_season.iter().map(|sample| sample.timestamp).max(),
        ) else {
            return no_data();
        };

        let coverage = season_coverage(earliest, latest, &bounds);
        if let Some(warning) = coverage.warning() {
            warn!("Season {}: {}", window, warning);
        }

        let mut report = self.summarize(&in_season);
        report.period_label = format!("Season {} (data: {})", window, report.period_label);
        SeasonReport {
            window,
            report,
            coverage: Some(coverage),
        }
    }

    fn format(&self, timestamp: DateTime<Utc>) -> String {
        timestamp
            .with_timezone(&self.tz)
            .format(LABEL_FORMAT)
            .to_string()
    }
}
