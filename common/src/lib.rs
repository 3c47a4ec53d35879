//! Common library exports shared between frontend and backend.

extern crate serde;


pub mod data_set_query;
pub mod column;
pub mod explorer_result;
pub mod explorer_const;
