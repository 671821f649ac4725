pub mod ambient_client;
pub mod data_source;
pub mod error;

#[cfg(test)]
pub(crate) mod mock;
