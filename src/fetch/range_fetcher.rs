//! Backward-walking pagination over a data source that can only answer
//! "up to N samples at or before T".
//!
//! Each request is keyed by a cursor at the end of the still-missing part of
//! the window. After every page the cursor moves to one second before the
//! page's oldest sample, until the window start is reached, the source runs
//! dry, or the page budget is spent.

use crate::fetch::config::FetchConfig;
use crate::fetch::error::FetchError;
use crate::fetch::retry::RetryPolicy;
use crate::source::data_source::DataSource;
use crate::types::sample::Sample;
use crate::types::traits::types::StartEndDateTime;
use bon::bon;
use chrono::{DateTime, Duration, Utc};
use log::{debug, info, warn};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

/// Why a range fetch stopped requesting pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StopReason {
    /// `start >= end`, nothing was requested.
    EmptyWindow,
    /// A page reached back to or past the window start.
    Covered,
    /// The source returned an empty page: there is no older history.
    Exhausted,
    /// The page budget ran out before the window start was reached.
    SafetyCapReached,
    /// The fetcher's cancellation token fired between pages.
    Cancelled,
}

impl StopReason {
    /// `true` when older data in the window may exist but was not fetched.
    pub fn is_partial(self) -> bool {
        matches!(self, StopReason::SafetyCapReached | StopReason::Cancelled)
    }
}

/// Position of the backward walk before a page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchCursor {
    /// Newest timestamp the next page may contain.
    pub cursor_end: DateTime<Utc>,
    /// Number of pages already received.
    pub iteration: usize,
}

/// What to do after a page came back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorStep {
    Stop(StopReason),
    Continue(FetchCursor),
}

impl FetchCursor {
    pub fn new(end: DateTime<Utc>) -> Self {
        Self {
            cursor_end: end,
            iteration: 0,
        }
    }

    /// Decides the next step from the oldest timestamp of the page just
    /// received (`None` for an empty page).
    pub fn after_page(self, earliest: Option<DateTime<Utc>>, start: DateTime<Utc>) -> CursorStep {
        match earliest {
            None => CursorStep::Stop(StopReason::Exhausted),
            Some(earliest) if earliest <= start => CursorStep::Stop(StopReason::Covered),
            Some(earliest) => CursorStep::Continue(FetchCursor {
                cursor_end: earliest - Duration::seconds(1),
                iteration: self.iteration + 1,
            }),
        }
    }
}

/// The samples of one range fetch and how the fetch ended.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FetchedRange {
    /// Deduplicated, ascending, and limited to the fetched window.
    pub samples: Vec<Sample>,
    /// Number of pages received.
    pub pages: usize,
    pub stop: StopReason,
    #[serde(skip)]
    pub window: StartEndDateTime,
}

impl FetchedRange {
    pub fn is_partial(&self) -> bool {
        self.stop.is_partial()
    }
}

/// Assembles a contiguous time window from a paginated [`DataSource`].
///
/// Page requests are strictly sequential, each one separated by the
/// configured delay, and each one retried on rate limiting or server errors
/// according to the [`RetryPolicy`].
pub struct RangeFetcher<S> {
    source: S,
    retry: RetryPolicy,
    cancel: CancellationToken,
}

#[bon]
impl<S: DataSource> RangeFetcher<S> {
    #[builder]
    pub fn new(source: S, retry: Option<RetryPolicy>, cancel: Option<CancellationToken>) -> Self {
        Self {
            source,
            retry: retry.unwrap_or_default(),
            cancel: cancel.unwrap_or_default(),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Token checked before every page request. Cancelling it makes the
    /// current fetch return what it has gathered so far.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub async fn fetch(&self, config: &FetchConfig) -> Result<FetchedRange, FetchError> {
        let window = config.window();
        if config.is_span_capped() {
            warn!(
                "Requested span exceeds {} days, fetching from {} instead of {}",
                config.max_span_days, window.start, config.start
            );
        }

        if window.start >= window.end {
            debug!("Empty window {} to {}, nothing to fetch", window.start, window.end);
            return Ok(FetchedRange {
                samples: Vec::new(),
                pages: 0,
                stop: StopReason::EmptyWindow,
                window,
            });
        }

        let source = &self.source;
        let device_id = config.device_id.as_str();
        let page_size = config.page_size;

        let mut accumulated: Vec<Sample> = Vec::new();
        let mut cursor = FetchCursor::new(window.end);

        let stop = loop {
            if self.cancel.is_cancelled() {
                info!("Fetch for {} cancelled after {} pages", device_id, cursor.iteration);
                break StopReason::Cancelled;
            }
            if cursor.iteration >= config.max_pages {
                warn!(
                    "Stopped after {} pages without reaching {}, data may be incomplete",
                    cursor.iteration, window.start
                );
                break StopReason::SafetyCapReached;
            }

            let cursor_end = cursor.cursor_end;
            let page = match self
                .retry
                .run(&self.cancel, || source.fetch_page(device_id, cursor_end, page_size))
                .await
            {
                Ok(page) => page,
                Err(FetchError::Cancelled { attempts, source: error }) => {
                    info!(
                        "Fetch for {} cancelled while retrying page {} after {} attempts ({})",
                        device_id,
                        cursor.iteration + 1,
                        attempts,
                        error
                    );
                    break StopReason::Cancelled;
                }
                Err(e) => return Err(e),
            };

            let earliest = page.iter().map(|sample| sample.timestamp).min();
            debug!(
                "Page {} ending at {}: {} samples, earliest {:?}",
                cursor.iteration + 1,
                cursor_end,
                page.len(),
                earliest
            );
            accumulated.extend(page);

            match cursor.after_page(earliest, window.start) {
                CursorStep::Stop(reason) => {
                    cursor.iteration += 1;
                    break reason;
                }
                CursorStep::Continue(next) => {
                    cursor = next;
                    if cursor.iteration < config.max_pages {
                        tokio::select! {
                            _ = tokio::time::sleep(config.page_delay) => {}
                            _ = self.cancel.cancelled() => {}
                        }
                    }
                }
            }
        };

        let samples = finalize(accumulated, &window);
        info!(
            "Fetched {} samples for {} in {} pages ({:?})",
            samples.len(),
            device_id,
            cursor.iteration,
            stop
        );
        Ok(FetchedRange {
            samples,
            pages: cursor.iteration,
            stop,
            window,
        })
    }
}

/// Drops samples outside the window, then sorts ascending and removes
/// duplicate timestamps.
fn finalize(mut samples: Vec<Sample>, window: &StartEndDateTime) -> Vec<Sample> {
    samples.retain(|sample| window.start <= sample.timestamp && sample.timestamp <= window.end);
    samples.sort_by_key(|sample| sample.timestamp);
    samples.dedup_by_key(|sample| sample.timestamp);
    samples
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::mock::{http_error, readings, HistorySource, ScriptedSource};
    use chrono::TimeZone;
    use std::time::Duration as StdDuration;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 1, 15, hour, minute, 0).unwrap()
    }

    /// Readings every five minutes from 00:00 through 10:00.
    fn history() -> Vec<Sample> {
        readings(at(0, 0), at(10, 0), Duration::minutes(5), 40.0)
    }

    fn config(start: DateTime<Utc>, end: DateTime<Utc>) -> FetchConfig {
        FetchConfig::builder()
            .device_id("00:11:22:33:44:55")
            .start(start)
            .end(end)
            .page_size(12)
            .page_delay(StdDuration::from_millis(10))
            .build()
    }

    #[test]
    fn cursor_moves_one_second_before_the_oldest_sample() {
        let cursor = FetchCursor::new(at(10, 0));
        assert_eq!(
            cursor.after_page(Some(at(9, 5)), at(6, 0)),
            CursorStep::Continue(FetchCursor {
                cursor_end: at(9, 4) + Duration::seconds(59),
                iteration: 1,
            })
        );
    }

    #[test]
    fn cursor_stops_on_empty_page_or_when_start_is_reached() {
        let cursor = FetchCursor::new(at(10, 0));
        assert_eq!(
            cursor.after_page(None, at(6, 0)),
            CursorStep::Stop(StopReason::Exhausted)
        );
        assert_eq!(
            cursor.after_page(Some(at(6, 0)), at(6, 0)),
            CursorStep::Stop(StopReason::Covered)
        );
        assert_eq!(
            cursor.after_page(Some(at(5, 55)), at(6, 0)),
            CursorStep::Stop(StopReason::Covered)
        );
    }

    #[tokio::test]
    async fn empty_window_makes_no_requests() {
        let fetcher = RangeFetcher::builder()
            .source(HistorySource::new(history()))
            .build();

        let result = fetcher.fetch(&config(at(10, 0), at(10, 0))).await.unwrap();
        assert_eq!(result.stop, StopReason::EmptyWindow);
        assert!(result.samples.is_empty());
        assert!(fetcher.source().calls().is_empty());

        let inverted = fetcher.fetch(&config(at(10, 0), at(6, 0))).await.unwrap();
        assert_eq!(inverted.stop, StopReason::EmptyWindow);
        assert!(fetcher.source().calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn stops_on_the_page_that_crosses_the_start() {
        let fetcher = RangeFetcher::builder()
            .source(HistorySource::new(history()))
            .build();

        let result = fetcher.fetch(&config(at(6, 0), at(10, 0))).await.unwrap();

        // Pages of one hour each: 10:00-09:05, ..., 06:00-05:05.
        assert_eq!(result.stop, StopReason::Covered);
        assert_eq!(result.pages, 5);
        assert_eq!(fetcher.source().calls().len(), 5);
        assert_eq!(fetcher.source().calls()[1], at(9, 4) + Duration::seconds(59));

        assert_eq!(result.samples.len(), 49);
        assert_eq!(result.samples.first().unwrap().timestamp, at(6, 0));
        assert_eq!(result.samples.last().unwrap().timestamp, at(10, 0));
        assert!(result
            .samples
            .windows(2)
            .all(|pair| pair[0].timestamp < pair[1].timestamp));
    }

    #[tokio::test(start_paused = true)]
    async fn safety_cap_returns_partial_data() {
        let fetcher = RangeFetcher::builder()
            .source(HistorySource::new(history()))
            .build();
        let capped = FetchConfig {
            max_pages: 3,
            ..config(at(6, 0), at(10, 0))
        };

        let result = fetcher.fetch(&capped).await.unwrap();

        assert_eq!(result.stop, StopReason::SafetyCapReached);
        assert!(result.is_partial());
        assert_eq!(result.pages, 3);
        assert_eq!(fetcher.source().calls().len(), 3);
        assert_eq!(result.samples.first().unwrap().timestamp, at(7, 5));
        assert_eq!(result.samples.len(), 36);
    }

    #[tokio::test(start_paused = true)]
    async fn stops_when_history_runs_out() {
        let fetcher = RangeFetcher::builder()
            .source(HistorySource::new(history()))
            .build();
        let day_before = Utc.with_ymd_and_hms(2023, 1, 14, 0, 0, 0).unwrap();

        let result = fetcher.fetch(&config(day_before, at(10, 0))).await.unwrap();

        // 121 readings: ten full pages, one single-sample page, one empty page.
        assert_eq!(result.stop, StopReason::Exhausted);
        assert_eq!(fetcher.source().calls().len(), 12);
        assert_eq!(result.samples.len(), 121);
        assert!(!result.is_partial());
    }

    #[tokio::test(start_paused = true)]
    async fn out_of_window_and_duplicate_samples_are_dropped() {
        let page_one = vec![
            Sample::new(at(10, 30), 40.0), // after the window end
            Sample::new(at(9, 0), 41.0),
            Sample::new(at(8, 0), 42.0),
        ];
        let page_two = vec![
            Sample::new(at(8, 0), 42.0), // overlaps the previous page
            Sample::new(at(7, 0), 43.0),
            Sample::new(at(5, 0), 44.0), // before the window start
        ];
        let fetcher = RangeFetcher::builder()
            .source(ScriptedSource::new(vec![Ok(page_one), Ok(page_two)]))
            .build();

        let result = fetcher.fetch(&config(at(6, 0), at(10, 0))).await.unwrap();

        assert_eq!(result.stop, StopReason::Covered);
        assert_eq!(fetcher.source().calls(), 2);
        let timestamps: Vec<_> = result.samples.iter().map(|s| s.timestamp).collect();
        assert_eq!(timestamps, vec![at(7, 0), at(8, 0), at(9, 0)]);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_errors_are_retried_per_page() {
        let source = HistorySource::new(history()).failing_first(vec![
            http_error(429),
            http_error(429),
        ]);
        let fetcher = RangeFetcher::builder().source(source).build();
        let started = tokio::time::Instant::now();

        let result = fetcher.fetch(&config(at(9, 30), at(10, 0))).await.unwrap();

        assert_eq!(result.stop, StopReason::Covered);
        assert_eq!(fetcher.source().calls().len(), 3);
        assert_eq!(result.samples.len(), 7);
        // Two backoff waits of 1s and 2s, no inter-page delay.
        let waited = started.elapsed();
        assert!(waited >= StdDuration::from_secs(3));
        assert!(waited < StdDuration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn unauthorized_fails_immediately() {
        let source = HistorySource::new(history()).failing_first(vec![http_error(401)]);
        let fetcher = RangeFetcher::builder().source(source).build();

        let error = fetcher
            .fetch(&config(at(6, 0), at(10, 0)))
            .await
            .unwrap_err();

        assert!(matches!(error, FetchError::Transport(_)));
        assert_eq!(fetcher.source().calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_retries_surface_attempt_count() {
        let source = HistorySource::new(history()).failing_first(vec![
            http_error(500),
            http_error(502),
            http_error(503),
        ]);
        let fetcher = RangeFetcher::builder().source(source).build();

        let error = fetcher
            .fetch(&config(at(6, 0), at(10, 0)))
            .await
            .unwrap_err();

        match error {
            FetchError::RetryExhausted { attempts, ref source } => {
                assert_eq!(attempts, 3);
                assert_eq!(source.status().map(|s| s.as_u16()), Some(503));
            }
            other => panic!("expected RetryExhausted, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn cancelling_during_backoff_keeps_earlier_pages() {
        let source = ScriptedSource::new(vec![
            Ok(readings(at(9, 5), at(10, 0), Duration::minutes(5), 40.0)),
            Err(http_error(503)),
            Err(http_error(503)),
        ]);
        let fetcher = RangeFetcher::builder()
            .source(source)
            .retry(RetryPolicy::new(3, StdDuration::from_secs(600)))
            .build();
        let cancel = fetcher.cancellation_token();
        tokio::spawn(async move {
            tokio::time::sleep(StdDuration::from_secs(5)).await;
            cancel.cancel();
        });

        let result = fetcher.fetch(&config(at(6, 0), at(10, 0))).await.unwrap();

        assert_eq!(result.stop, StopReason::Cancelled);
        assert_eq!(result.samples.len(), 12);
        assert_eq!(fetcher.source().calls(), 2);
    }

    #[tokio::test]
    async fn cancelled_token_stops_before_the_next_page() {
        let fetcher = RangeFetcher::builder()
            .source(HistorySource::new(history()))
            .build();
        fetcher.cancellation_token().cancel();

        let result = fetcher.fetch(&config(at(6, 0), at(10, 0))).await.unwrap();

        assert_eq!(result.stop, StopReason::Cancelled);
        assert!(result.is_partial());
        assert!(fetcher.source().calls().is_empty());
    }
}
