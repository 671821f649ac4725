pub mod aggregator;
pub mod coverage;
pub mod hour_bucket;
