//! Turns query text into result items for a launcher host.

use crate::core::alias::AliasTable;
use crate::core::cache::RateCache;
use crate::core::config::Settings;
use crate::core::error::{QueryError, RateError};
use crate::core::query::{ConversionRequest, ParsedQuery};
use crate::providers::ecb::EcbFeed;
use std::sync::Arc;
use tracing::debug;

/// What a host does when the user activates an item.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemAction {
    CopyToClipboard(String),
}

/// A host-agnostic result row.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultItem {
    /// Stable per source/destination pair so hosts can deduplicate.
    pub id: String,
    pub text: String,
    pub subtext: String,
    pub actions: Vec<ItemAction>,
}

impl ResultItem {
    pub fn new(request: &ConversionRequest, dest_amount: f64) -> Self {
        let text = format!("{:.2} {}", dest_amount, request.dest);
        ResultItem {
            id: format!("eurofx:{}:{}", request.source, request.dest),
            subtext: format!(
                "Value of {:.2} {} in {}",
                request.amount, request.source, request.dest
            ),
            actions: vec![ItemAction::CopyToClipboard(text.clone())],
            text,
        }
    }
}

/// One attempted conversion and how it ended.
#[derive(Debug, Clone, PartialEq)]
pub struct Conversion {
    pub request: ConversionRequest,
    pub outcome: Result<ResultItem, RateError>,
}

pub struct QueryResolver {
    cache: Arc<RateCache>,
    aliases: AliasTable,
    defaults: Vec<String>,
}

impl QueryResolver {
    /// `defaults` are upper-cased so they compare equal to resolved codes.
    pub fn new(cache: Arc<RateCache>, aliases: AliasTable, defaults: Vec<String>) -> Self {
        QueryResolver {
            cache,
            aliases,
            defaults: defaults.iter().map(|d| d.to_uppercase()).collect(),
        }
    }

    /// Builds a resolver backed by the ECB feed named in `settings`.
    pub fn from_settings(settings: &Settings) -> Self {
        let feed = EcbFeed::new(settings.feed_url());
        let cache = Arc::new(RateCache::new(Box::new(feed)));
        Self::new(cache, settings.alias_table(), settings.defaults.clone())
    }

    pub fn cache(&self) -> &Arc<RateCache> {
        &self.cache
    }

    /// Expands a parsed query into the conversions to attempt, in output order.
    pub fn requests(&self, query: &ParsedQuery) -> Vec<ConversionRequest> {
        let request = |dest: &str| ConversionRequest {
            amount: query.amount,
            source: query.source.clone(),
            dest: dest.to_string(),
        };

        match &query.dest {
            Some(dest) => vec![request(dest.as_str())],
            None => self
                .defaults
                .iter()
                .filter(|dest| **dest != query.source)
                .map(|dest| request(dest.as_str()))
                .collect(),
        }
    }

    /// Parses `text` and attempts every conversion it implies, keeping the
    /// cause of each failure.
    pub async fn evaluate(&self, text: &str) -> Result<Vec<Conversion>, QueryError> {
        let query = ParsedQuery::parse(text, &self.aliases)?;
        debug!(?query, "Parsed query");

        let mut conversions = Vec::new();
        for request in self.requests(&query) {
            let outcome = self
                .cache
                .convert(request.amount, &request.source, &request.dest)
                .await
                .map(|amount| ResultItem::new(&request, amount));
            if let Err(e) = &outcome {
                debug!("No result for {} -> {}: {}", request.source, request.dest, e);
            }
            conversions.push(Conversion { request, outcome });
        }
        Ok(conversions)
    }

    /// Entry point for hosts. Failures of any kind yield no items.
    pub async fn handle_query(&self, text: &str) -> Vec<ResultItem> {
        match self.evaluate(text).await {
            Ok(conversions) => conversions
                .into_iter()
                .filter_map(|c| c.outcome.ok())
                .collect(),
            Err(e) => {
                debug!("Ignoring query '{}': {}", text, e);
                Vec::new()
            }
        }
    }
}
