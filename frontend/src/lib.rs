//! Client core of the data set explorer page.

pub mod data_definitions;
pub mod filter_input;
pub mod query_engine;
pub(crate) mod runtime;
pub mod scheduler;

#[cfg(test)]
pub(crate) mod test_support;
