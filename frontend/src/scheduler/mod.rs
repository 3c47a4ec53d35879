//! Admission, deduplication and cancellation of endpoint calls.

mod request_scheduler;
pub use request_scheduler::{Priority, RequestScheduler, ScheduledRequest};
