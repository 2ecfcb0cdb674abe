//! Logging infrastructure for ContentValidator
//!
//! Process logs go through `tracing`; quota and validation analytics are
//! appended to a JSONL file by `UsageLogger`.

pub mod usage;

pub use usage::{EventType, UsageEvent, UsageLogger};
