//! ContentValidator - content demand validation service
//!
//! Asks an LLM-backed analysis provider how much real audience demand exists
//! for a content topic, normalizes its loosely structured answer into a
//! typed report, and meters how many validations each client may run.
//!
//! ## Components
//!
//! - **Normalizer**: raw provider text to a validated `ValidationReport`
//! - **Ledger**: per-client usage within a trailing window, by tier
//! - **Waitlist**: early-adopter signup, which raises a client's tier
//! - **Reports**: persisted reports and their print export shape
//! - **Server**: hyper HTTP surface over the above

pub mod analysis;
pub mod config;
pub mod db;
pub mod ledger;
pub mod logging;
pub mod normalizer;
pub mod reports;
pub mod routes;
pub mod server;
pub mod types;
pub mod waitlist;

pub use config::Args;
pub use server::{run, AppState};
pub use types::{Result, ValidatorError};
