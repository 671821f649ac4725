use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SeasonError {
    #[error("Season start month must be between 1 and 12, got {0}")]
    InvalidSeasonMonth(u32),

    #[error("Year {0} is outside the supported calendar range")]
    InvalidYear(i32),
}
