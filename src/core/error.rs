//! Error types for rate lookups and query parsing

use thiserror::Error;

/// Failures surfaced by the rate cache and its feed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RateError {
    /// Feed unreachable or answered with a non-success status.
    #[error("Network failure: {0}")]
    NetworkFailure(String),
    /// Feed body could not be parsed into rates.
    #[error("Malformed feed: {0}")]
    MalformedFeed(String),
    /// Currency code absent from the current snapshot.
    #[error("Unknown currency: {0}")]
    UnknownCurrency(String),
}

/// Reasons a query string does not describe a conversion.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueryError {
    #[error("Expected 2 or 3 tokens, got {0}")]
    TokenCount(usize),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
}
