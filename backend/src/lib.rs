//! Client side bindings to the data set server.

pub mod api;
pub mod http_utils;
pub mod request_error;
