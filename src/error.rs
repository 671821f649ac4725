use crate::config::error::ConfigError;
use crate::fetch::error::FetchError;
use crate::source::error::SourceError;
use crate::types::error::SeasonError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChillHoursError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Season(#[from] SeasonError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("No device given and none configured, set AMBIENT_DEVICE_MAC or device_mac")]
    NoDevice,

    #[error("Could not interpret '{0}' as a date or datetime")]
    InvalidDate(String),
}
