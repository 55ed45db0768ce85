//! Exchange rate feed abstraction

use crate::core::error::RateError;
use async_trait::async_trait;

/// A source of EUR-relative reference rates.
///
/// Each entry is a currency code and the number of units of that currency
/// per one euro. Implementations must not include partial results: either the
/// whole document was read or an error is returned.
#[async_trait]
pub trait RateFeed: Send + Sync {
    async fn fetch_rates(&self) -> Result<Vec<(String, f64)>, RateError>;
}
