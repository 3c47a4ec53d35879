//! State and configuration of one data set page session.

pub mod explorer_config;
pub mod session_state;
pub mod target_board;
pub mod url_param;
pub mod validation;
