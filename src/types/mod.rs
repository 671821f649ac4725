pub mod error;
pub mod report;
pub mod sample;
pub mod season;
pub mod traits;
