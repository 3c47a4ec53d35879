//! HTTP transport to the data set server.

pub mod endpoint_client;
