//! Currency conversion for launcher queries of the form `<amount> <src> [<dest>]`,
//! backed by the European Central Bank's daily reference rates.

pub mod core;
pub mod providers;
pub mod resolver;

pub use crate::core::query::{DEFAULT_TRIGGER, SYNOPSIS};
pub use crate::core::{
    AliasTable, ExchangeSnapshot, QueryError, RateCache, RateError, RateFeed, Settings,
};
pub use providers::EcbFeed;
pub use resolver::{Conversion, ItemAction, QueryResolver, ResultItem};
