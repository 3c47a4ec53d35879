//! Mutations of the page's query and the refreshes they cause.

pub mod cascade;
pub mod data_set_page;
mod query_actions;

pub use data_set_page::{DataSetPage, FilterChange};
