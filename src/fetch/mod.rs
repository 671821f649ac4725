pub mod config;
pub mod error;
pub mod range_fetcher;
pub mod retry;
