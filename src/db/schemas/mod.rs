//! Database schemas for ContentValidator
//!
//! MongoDB document structures for usage records, waitlist entries and
//! reports, with their index definitions.

mod early_adopter;
mod metadata;
mod report;
mod usage_record;

pub use early_adopter::{EarlyAdopterDoc, EARLY_ADOPTER_COLLECTION};
pub use metadata::Metadata;
pub use report::{ReportDoc, REPORT_COLLECTION};
pub use usage_record::{UsageRecordDoc, USAGE_RECORD_COLLECTION};
