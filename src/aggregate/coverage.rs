use crate::types::report::Coverage;
use crate::types::traits::types::StartEndDateTime;
use chrono::{DateTime, Utc};

const MS_PER_DAY: f64 = 86_400_000.0;

/// Whole days between two instants, rounded to the nearest day.
pub fn days_between(from: DateTime<Utc>, to: DateTime<Utc>) -> i64 {
    ((to - from).num_milliseconds() as f64 / MS_PER_DAY).round() as i64
}

/// Share of the season span between the earliest and latest reading.
pub fn season_coverage(
    earliest: DateTime<Utc>,
    latest: DateTime<Utc>,
    season: &StartEndDateTime,
) -> Coverage {
    let covered_days = days_between(earliest, latest);
    let season_days = days_between(season.start, season.end).max(1);
    let percent = (100.0 * covered_days as f64 / season_days as f64).round() as i64;
    Coverage {
        covered_days,
        season_days,
        percent,
    }
}
