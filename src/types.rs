//! Crate-level error type
//!
//! Component errors (normalizer, ledger, waitlist, provider) live next to
//! their components; this type covers startup, storage plumbing and the
//! server loop.

use thiserror::Error;

/// Errors raised outside the component boundaries
#[derive(Debug, Error)]
pub enum ValidatorError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Duplicate key: {0}")]
    Conflict(String),
}

pub type Result<T> = std::result::Result<T, ValidatorError>;
