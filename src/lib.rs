mod aggregate;
mod chill_hours;
mod config;
mod error;
mod fetch;
mod source;
mod types;
mod utils;

pub use chill_hours::*;
pub use error::ChillHoursError;

pub use aggregate::aggregator::ChillHourAggregator;
pub use aggregate::coverage::{days_between, season_coverage};
pub use aggregate::hour_bucket::{ChillRange, HourBucket, HourKey};

pub use config::settings::*;
pub use config::error::ConfigError;

pub use fetch::config::FetchConfig;
pub use fetch::range_fetcher::{CursorStep, FetchCursor, FetchedRange, RangeFetcher, StopReason};
pub use fetch::retry::RetryPolicy;
pub use fetch::error::FetchError;

pub use source::ambient_client::AmbientClient;
pub use source::data_source::DataSource;
pub use source::error::SourceError;

pub use types::report::*;
pub use types::sample::{DeviceInfo, Sample};
pub use types::season::SeasonWindow;
pub use types::error::SeasonError;

pub use types::traits::any::any_datetime::AnyDateTime;
pub use types::traits::types::{StartEndDateTime, Year};

pub use utils::{get_config_dir, get_config_file};
