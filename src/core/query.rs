//! Query text parsing

use crate::core::alias::AliasTable;
use crate::core::error::QueryError;

/// Input shape accepted by the converter.
pub const SYNOPSIS: &str = "<amount> <src> [<dest>]";

/// Trigger prefix hosts conventionally register the converter under.
pub const DEFAULT_TRIGGER: &str = "cc ";

/// A parsed query with aliases resolved. `dest` is `None` when the query
/// names only a source currency.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedQuery {
    pub amount: f64,
    pub source: String,
    pub dest: Option<String>,
}

impl ParsedQuery {
    /// Parses `<amount> <src> [<dest>]`, splitting on whitespace.
    pub fn parse(text: &str, aliases: &AliasTable) -> Result<Self, QueryError> {
        let parts: Vec<&str> = text.split_whitespace().collect();
        let (amount, source, dest) = match parts.as_slice() {
            [amount, source] => (*amount, *source, None),
            [amount, source, dest] => (*amount, *source, Some(*dest)),
            _ => return Err(QueryError::TokenCount(parts.len())),
        };

        let amount = amount
            .parse::<f64>()
            .map_err(|_| QueryError::InvalidAmount(amount.to_string()))?;

        Ok(Self {
            amount,
            source: aliases.resolve(source),
            dest: dest.map(|d| aliases.resolve(d)),
        })
    }
}

/// A single conversion to attempt against the rate cache.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionRequest {
    pub amount: f64,
    pub source: String,
    pub dest: String,
}
