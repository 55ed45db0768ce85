//! Core conversion logic and abstractions

pub mod alias;
pub mod cache;
pub mod config;
pub mod currency;
pub mod error;
pub mod log;
pub mod query;

// Re-export main types for cleaner imports
pub use alias::AliasTable;
pub use cache::{CACHE_WINDOW, ExchangeSnapshot, RateCache};
pub use config::Settings;
pub use currency::RateFeed;
pub use error::{QueryError, RateError};
pub use query::{ConversionRequest, ParsedQuery};
