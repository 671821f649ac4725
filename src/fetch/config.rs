use crate::types::traits::types::StartEndDateTime;
use bon::Builder;
use chrono::{DateTime, Utc};
use std::time::Duration;

pub const DEFAULT_MAX_SPAN_DAYS: i64 = 365;
pub const DEFAULT_MAX_PAGES: usize = 100;
pub const DEFAULT_PAGE_SIZE: usize = 500;
pub const DEFAULT_PAGE_DELAY: Duration = Duration::from_millis(1000);

/// Immutable parameters of a single range fetch.
///
/// # Examples
///
/// ```
/// use chillhours::FetchConfig;
/// use chrono::{TimeZone, Utc};
///
/// let config = FetchConfig::builder()
///     .device_id("00:11:22:33:44:55")
///     .start(Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap())
///     .end(Utc.with_ymd_and_hms(2023, 2, 1, 0, 0, 0).unwrap())
///     .build();
/// assert_eq!(config.page_size, 500);
/// ```
#[derive(Debug, Clone, PartialEq, Builder)]
pub struct FetchConfig {
    #[builder(into)]
    pub device_id: String,
    pub start: DateTime<Utc>,
    #[builder(default = Utc::now())]
    pub end: DateTime<Utc>,
    /// Requests reaching further back than this many days before `end` are
    /// shortened to this span.
    #[builder(default = DEFAULT_MAX_SPAN_DAYS)]
    pub max_span_days: i64,
    /// Hard upper bound on page requests for one fetch.
    #[builder(default = DEFAULT_MAX_PAGES)]
    pub max_pages: usize,
    #[builder(default = DEFAULT_PAGE_SIZE)]
    pub page_size: usize,
    /// Pause between consecutive page requests.
    #[builder(default = DEFAULT_PAGE_DELAY)]
    pub page_delay: Duration,
}

impl FetchConfig {
    /// The window actually fetched: `[start, end]` with `start` moved forward
    /// when the span exceeds `max_span_days`.
    pub fn window(&self) -> StartEndDateTime {
        let earliest_allowed = chrono::Duration::try_days(self.max_span_days.max(0))
            .and_then(|span| self.end.checked_sub_signed(span));
        let start = match earliest_allowed {
            Some(earliest_allowed) => self.start.max(earliest_allowed),
            None => self.start,
        };
        StartEndDateTime {
            start,
            end: self.end,
        }
    }

    pub fn is_span_capped(&self) -> bool {
        self.window().start != self.start
    }
}
