//! Data set endpoints and the calls made outside the request scheduler.

pub mod data_set_endpoints;

mod auto_complete;
pub use auto_complete::auto_complete;

mod save_query;
pub use save_query::save_query;
