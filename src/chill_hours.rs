//! The main entry point: fetch a station's temperature history and turn it
//! into chill-hour reports.
//!
//! [`ChillHours`] owns a [`RangeFetcher`] over a data source (the Ambient
//! Weather API by default) and a [`ChillHourAggregator`], both configured
//! from [`Settings`].

use crate::aggregate::aggregator::ChillHourAggregator;
use crate::aggregate::hour_bucket::ChillRange;
use crate::config::settings::Settings;
use crate::error::ChillHoursError;
use crate::fetch::config::FetchConfig;
use crate::fetch::range_fetcher::{FetchedRange, RangeFetcher, StopReason};
use crate::source::ambient_client::AmbientClient;
use crate::source::data_source::DataSource;
use crate::types::error::SeasonError;
use crate::types::report::{Report, SeasonReport};
use crate::types::sample::DeviceInfo;
use crate::types::season::SeasonWindow;
use bon::bon;
use chrono::{DateTime, Datelike, Local, TimeZone, Utc};
use log::info;
use serde::Serialize;
use std::fmt::Display;
use tokio_util::sync::CancellationToken;

/// Longest season window in days, a leap year.
const SEASON_MAX_SPAN_DAYS: i64 = 366;

/// A report together with how the data behind it was fetched.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FetchedReport<R> {
    pub report: R,
    /// Samples left after filtering and deduplication.
    pub samples: usize,
    pub pages: usize,
    pub stop: StopReason,
}

impl<R> FetchedReport<R> {
    fn new(report: R, fetched: &FetchedRange) -> Self {
        Self {
            report,
            samples: fetched.samples.len(),
            pages: fetched.pages,
            stop: fetched.stop,
        }
    }

    /// `true` when the fetch stopped early and the report may undercount.
    pub fn is_partial(&self) -> bool {
        self.stop.is_partial()
    }
}

/// Chill-hour client for one weather station account.
///
/// Create one with [`ChillHours::new()`] to use the configuration file and
/// environment, or [`ChillHours::from_settings()`] with explicit settings.
/// Reports are bucketed in local time unless another zone is set with
/// [`ChillHours::with_timezone()`].
///
/// # Examples
///
/// ```rust,no_run
/// # use chillhours::{ChillHours, ChillHoursError};
/// # #[tokio::main]
/// # async fn main() -> Result<(), ChillHoursError> {
/// let client = ChillHours::new().await?;
///
/// // Season ending in 2024, starting in the configured month
/// let season = client.season_report().year(2024).call().await?;
/// println!("{}", season.report.report);
/// if let Some(warning) = season.report.coverage_warning() {
///     println!("{}", warning);
/// }
/// # Ok(())
/// # }
/// ```
pub struct ChillHours<S = AmbientClient, Tz: TimeZone = Local> {
    fetcher: RangeFetcher<S>,
    aggregator: ChillHourAggregator<Tz>,
    settings: Settings,
}

impl ChillHours<AmbientClient, Local> {
    /// Loads settings from the default configuration file and the
    /// environment, then connects to the Ambient Weather API.
    ///
    /// # Errors
    ///
    /// Returns [`ChillHoursError::Config`] when the configuration cannot be
    /// read, is invalid, or carries no API key.
    pub async fn new() -> Result<Self, ChillHoursError> {
        Self::from_settings(Settings::load().await?)
    }

    pub fn from_settings(settings: Settings) -> Result<Self, ChillHoursError> {
        let client = AmbientClient::builder()
            .api_key(settings.api_key()?)
            .maybe_application_key(settings.application_key.clone())
            .base_url(settings.base_url.clone())
            .build();
        Self::with_source(client, settings)
    }
}

impl<S: DataSource> ChillHours<S, Local> {
    /// Uses `source` instead of the Ambient Weather API.
    pub fn with_source(source: S, settings: Settings) -> Result<Self, ChillHoursError> {
        settings.validate()?;
        let fetcher = RangeFetcher::builder()
            .source(source)
            .retry(settings.retry_policy())
            .build();
        Ok(Self {
            fetcher,
            aggregator: ChillHourAggregator::new(settings.chill_range()),
            settings,
        })
    }
}

#[bon]
impl<S, Tz> ChillHours<S, Tz>
where
    S: DataSource,
    Tz: TimeZone,
    Tz::Offset: Display,
{
    /// Buckets hours and resolves season boundaries in `tz`.
    pub fn with_timezone<Tz2>(self, tz: Tz2) -> ChillHours<S, Tz2>
    where
        Tz2: TimeZone,
        Tz2::Offset: Display,
    {
        ChillHours {
            fetcher: self.fetcher,
            aggregator: ChillHourAggregator::with_timezone(self.aggregator.range(), tz),
            settings: self.settings,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Cancelling this token stops any running fetch before its next page
    /// request; the report is then built from the pages received so far.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.fetcher.cancellation_token()
    }

    /// Lists the devices registered to the API key.
    pub async fn devices(&self) -> Result<Vec<DeviceInfo>, ChillHoursError> {
        Ok(self.fetcher.source().list_devices().await?)
    }

    /// Fetches the samples of a device between `start` and `end`.
    ///
    /// This method uses a builder pattern.
    ///
    /// # Arguments
    ///
    /// * `.device(&str)`: Optional. Device MAC address, defaults to the configured device.
    /// * `.start(DateTime<Utc>)`: **Required.** Oldest instant of interest.
    /// * `.end(DateTime<Utc>)`: Optional. Newest instant of interest, defaults to now.
    ///
    /// # Errors
    ///
    /// Returns [`ChillHoursError::NoDevice`] when no device is given or
    /// configured, and [`ChillHoursError::Fetch`] when a page request fails
    /// for good.
    #[builder]
    pub async fn fetch_samples(
        &self,
        device: Option<&str>,
        start: DateTime<Utc>,
        end: Option<DateTime<Utc>>,
    ) -> Result<FetchedRange, ChillHoursError> {
        let config = self.fetch_config(device, start, end.unwrap_or_else(Utc::now))?;
        Ok(self.fetcher.fetch(&config).await?)
    }

    /// Fetches and summarizes an arbitrary range.
    ///
    /// This method uses a builder pattern.
    ///
    /// # Arguments
    ///
    /// * `.device(&str)`: Optional. Device MAC address, defaults to the configured device.
    /// * `.start(DateTime<Utc>)`: **Required.** Oldest instant of interest.
    /// * `.end(DateTime<Utc>)`: Optional. Newest instant of interest, defaults to now.
    /// * `.range(ChillRange)`: Optional. Overrides the configured chill temperature range.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// # use chillhours::{ChillHours, ChillHoursError, ChillRange};
    /// # use chrono::{TimeZone, Utc};
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), ChillHoursError> {
    /// let client = ChillHours::new().await?;
    /// let january = client
    ///     .range_report()
    ///     .start(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
    ///     .end(Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap())
    ///     .range(ChillRange::new(34.0, 45.0))
    ///     .call()
    ///     .await?;
    /// println!("{}", january.report);
    /// # Ok(())
    /// # }
    /// ```
    #[builder]
    pub async fn range_report(
        &self,
        device: Option<&str>,
        start: DateTime<Utc>,
        end: Option<DateTime<Utc>>,
        range: Option<ChillRange>,
    ) -> Result<FetchedReport<Report>, ChillHoursError> {
        let config = self.fetch_config(device, start, end.unwrap_or_else(Utc::now))?;
        let fetched = self.fetcher.fetch(&config).await?;

        let report = match range {
            Some(range) => ChillHourAggregator::with_timezone(range, self.timezone().clone())
                .summarize(&fetched.samples),
            None => self.aggregator.summarize(&fetched.samples),
        };
        Ok(FetchedReport::new(report, &fetched))
    }

    /// Fetches and summarizes one chill season.
    ///
    /// This method uses a builder pattern.
    ///
    /// # Arguments
    ///
    /// * `.device(&str)`: Optional. Device MAC address, defaults to the configured device.
    /// * `.year(i32)`: Optional. Year the season ends in, see [`SeasonWindow::new`].
    ///   Defaults to the latest season that has already started.
    /// * `.start_month(u32)`: Optional. Month the season starts in, defaults to the configured one.
    ///
    /// Seasons still in progress are fetched up to now.
    ///
    /// # Errors
    ///
    /// Returns [`ChillHoursError::Season`] for a start month outside 1 to 12,
    /// in addition to the errors of [`ChillHours::fetch_samples`].
    #[builder]
    pub async fn season_report(
        &self,
        device: Option<&str>,
        year: Option<i32>,
        start_month: Option<u32>,
    ) -> Result<FetchedReport<SeasonReport>, ChillHoursError> {
        let start_month = start_month.unwrap_or(self.settings.season_start_month);
        let window = match year {
            Some(year) => SeasonWindow::new(start_month, year)?,
            None => {
                let today = Utc::now().with_timezone(self.timezone()).date_naive();
                SeasonWindow::latest_started(start_month, today)?
            }
        };
        let bounds = window
            .bounds_in(self.timezone())
            .ok_or(SeasonError::InvalidYear(window.end.year()))?;
        info!("Fetching season {}", window);

        let mut config = self.fetch_config(device, bounds.start, bounds.end.min(Utc::now()))?;
        config.max_span_days = config.max_span_days.max(SEASON_MAX_SPAN_DAYS);
        let fetched = self.fetcher.fetch(&config).await?;

        let report = self.aggregator.summarize_window(&fetched.samples, window);
        Ok(FetchedReport::new(report, &fetched))
    }

    fn timezone(&self) -> &Tz {
        self.aggregator.timezone()
    }

    fn fetch_config(
        &self,
        device: Option<&str>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<FetchConfig, ChillHoursError> {
        let device_id = device
            .or(self.settings.device_mac.as_deref())
            .ok_or(ChillHoursError::NoDevice)?;
        Ok(FetchConfig::builder()
            .device_id(device_id)
            .start(start)
            .end(end)
            .max_span_days(self.settings.max_span_days)
            .max_pages(self.settings.max_pages)
            .page_size(self.settings.page_size)
            .page_delay(self.settings.request_delay())
            .build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::error::ConfigError;
    use crate::fetch::error::FetchError;
    use crate::source::mock::{http_error, readings, HistorySource};
    use chrono::Duration;

    const DEVICE: &str = "00:11:22:33:44:55";

    fn settings() -> Settings {
        Settings {
            api_key: Some("key".into()),
            device_mac: Some(DEVICE.into()),
            page_size: 12,
            request_delay_ms: 10,
            retry_base_delay_ms: 10,
            ..Settings::default()
        }
    }

    fn client(history: HistorySource) -> ChillHours<HistorySource, Utc> {
        ChillHours::with_source(history, settings())
            .unwrap()
            .with_timezone(Utc)
    }

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 1, 15, hour, minute, 0).unwrap()
    }

    /// Readings every five minutes from 00:00 through 10:00 at 40°F.
    fn morning() -> HistorySource {
        HistorySource::new(readings(at(0, 0), at(10, 0), Duration::minutes(5), 40.0))
    }

    #[test]
    fn invalid_settings_are_rejected() {
        let result = ChillHours::with_source(
            morning(),
            Settings {
                season_start_month: 0,
                ..settings()
            },
        );
        assert!(matches!(
            result,
            Err(ChillHoursError::Config(ConfigError::InvalidValue { .. }))
        ));
    }

    #[test]
    fn api_key_is_required_for_the_http_client() {
        let result = ChillHours::from_settings(Settings::default());
        assert!(matches!(
            result,
            Err(ChillHoursError::Config(ConfigError::MissingApiKey))
        ));
    }

    #[tokio::test]
    async fn lists_devices() {
        let devices = client(morning()).devices().await.unwrap();
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].mac_address, DEVICE);
        assert_eq!(devices[0].last_reading_at, Some(at(10, 0)));
    }

    #[tokio::test(start_paused = true)]
    async fn range_report_uses_the_configured_device_and_range() {
        let result = client(morning())
            .range_report()
            .start(at(6, 0))
            .end(at(10, 0))
            .call()
            .await
            .unwrap();

        assert_eq!(result.samples, 49);
        assert_eq!(result.stop, StopReason::Covered);
        assert!(!result.is_partial());
        assert_eq!(result.report.total_hours, 5);
        assert_eq!(result.report.chill_hours, 5);
        assert_eq!(result.report.percent_chill_hours, 100.0);
        assert_eq!(result.report.period_label, "2023-01-15 06:00 to 2023-01-15 10:00");
    }

    #[tokio::test(start_paused = true)]
    async fn range_override_changes_classification() {
        let result = client(morning())
            .range_report()
            .device(DEVICE)
            .start(at(6, 0))
            .end(at(10, 0))
            .range(ChillRange::new(41.0, 45.0))
            .call()
            .await
            .unwrap();

        assert_eq!(result.report.total_hours, 5);
        assert_eq!(result.report.chill_hours, 0);
    }

    #[tokio::test]
    async fn missing_device_is_an_error() {
        let chill_hours = ChillHours::with_source(
            morning(),
            Settings {
                device_mac: None,
                ..settings()
            },
        )
        .unwrap();

        let result = chill_hours.fetch_samples().start(at(6, 0)).call().await;
        assert!(matches!(result, Err(ChillHoursError::NoDevice)));
    }

    #[tokio::test(start_paused = true)]
    async fn fetch_errors_are_propagated() {
        let source = morning().failing_first(vec![http_error(401)]);
        let result = client(source)
            .fetch_samples()
            .start(at(6, 0))
            .end(at(10, 0))
            .call()
            .await;

        assert!(matches!(
            result,
            Err(ChillHoursError::Fetch(FetchError::Transport(_)))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn season_report_covers_the_whole_window() {
        let first = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
        let last = Utc.with_ymd_and_hms(2023, 1, 10, 23, 0, 0).unwrap();
        let source = HistorySource::new(readings(first, last, Duration::hours(1), 38.0));
        let chill_hours = ChillHours::with_source(
            source,
            Settings {
                page_size: 500,
                ..settings()
            },
        )
        .unwrap()
        .with_timezone(Utc);

        let result = chill_hours
            .season_report()
            .year(2023)
            .start_month(9)
            .call()
            .await
            .unwrap();

        let season = &result.report;
        assert_eq!(season.window, SeasonWindow::new(9, 2023).unwrap());
        assert_eq!(season.report.total_hours, 240);
        assert_eq!(season.report.chill_hours, 240);
        assert_eq!(result.stop, StopReason::Exhausted);
        assert!(season.coverage_warning().is_some());

        // The first request starts at the last millisecond of the season.
        let calls = chill_hours.fetcher.source().calls();
        assert_eq!(
            calls[0],
            Utc.with_ymd_and_hms(2023, 8, 31, 23, 59, 59).unwrap() + Duration::milliseconds(999)
        );
    }

    #[tokio::test]
    async fn season_report_rejects_invalid_months() {
        let result = client(morning())
            .season_report()
            .year(2023)
            .start_month(13)
            .call()
            .await;
        assert!(matches!(
            result,
            Err(ChillHoursError::Season(SeasonError::InvalidSeasonMonth(13)))
        ));
    }
}
