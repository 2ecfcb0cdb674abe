//! HTTP server for ContentValidator

pub mod http;

pub use http::{run, AppState, StorageMode};
