use crate::core::currency::RateFeed;
use crate::core::error::RateError;
use chrono::{DateTime, TimeDelta, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

/// How long a fetched snapshot is served before the feed is consulted again.
pub const CACHE_WINDOW: TimeDelta = TimeDelta::hours(3);

/// One fetched set of EUR-relative rates plus the time it was retrieved.
#[derive(Debug, Clone, PartialEq)]
pub struct ExchangeSnapshot {
    rates: HashMap<String, f64>,
    fetched_at: DateTime<Utc>,
}

impl ExchangeSnapshot {
    /// An empty snapshot stamped at the epoch, so it is always stale.
    pub fn empty() -> Self {
        Self {
            rates: HashMap::new(),
            fetched_at: DateTime::<Utc>::UNIX_EPOCH,
        }
    }

    /// Builds a snapshot from feed entries. `EUR` is seeded before the entries
    /// are inserted.
    pub fn from_entries<I>(entries: I, fetched_at: DateTime<Utc>) -> Self
    where
        I: IntoIterator<Item = (String, f64)>,
    {
        let mut rates = HashMap::new();
        rates.insert("EUR".to_string(), 1.0);
        rates.extend(entries);
        Self { rates, fetched_at }
    }

    pub fn rates(&self) -> &HashMap<String, f64> {
        &self.rates
    }

    pub fn rate(&self, currency: &str) -> Option<f64> {
        self.rates.get(currency).copied()
    }

    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    pub fn is_stale(&self, now: DateTime<Utc>, window: TimeDelta) -> bool {
        now - self.fetched_at > window
    }

    /// Converts through EUR: `amount / rates[from] * rates[to]`.
    pub fn convert(&self, amount: f64, from: &str, to: &str) -> Result<f64, RateError> {
        let from_rate = self
            .rate(from)
            .ok_or_else(|| RateError::UnknownCurrency(from.to_string()))?;
        let to_rate = self
            .rate(to)
            .ok_or_else(|| RateError::UnknownCurrency(to.to_string()))?;

        if from == to {
            return Ok(amount);
        }
        Ok(amount / from_rate * to_rate)
    }
}

impl Default for ExchangeSnapshot {
    fn default() -> Self {
        Self::empty()
    }
}

/// Lazily refreshed, time-bounded cache of ECB rates.
///
/// The snapshot is replaced wholesale on a successful refresh and left untouched
/// on failure, so the next call retries immediately. Refreshes are serialized;
/// readers always observe a complete snapshot.
pub struct RateCache {
    feed: Box<dyn RateFeed>,
    snapshot: RwLock<Arc<ExchangeSnapshot>>,
    refresh_lock: Mutex<()>,
    window: TimeDelta,
}

impl RateCache {
    pub fn new(feed: Box<dyn RateFeed>) -> Self {
        Self::with_window(feed, CACHE_WINDOW)
    }

    pub fn with_window(feed: Box<dyn RateFeed>, window: TimeDelta) -> Self {
        Self {
            feed,
            snapshot: RwLock::new(Arc::new(ExchangeSnapshot::empty())),
            refresh_lock: Mutex::new(()),
            window,
        }
    }

    pub fn window(&self) -> TimeDelta {
        self.window
    }

    /// Current snapshot, without triggering a refresh.
    pub async fn snapshot(&self) -> Arc<ExchangeSnapshot> {
        Arc::clone(&*self.snapshot.read().await)
    }

    pub async fn refresh_if_stale(&self) -> Result<(), RateError> {
        self.refresh_if_stale_at(Utc::now()).await
    }

    pub async fn refresh_if_stale_at(&self, now: DateTime<Utc>) -> Result<(), RateError> {
        if !self.snapshot.read().await.is_stale(now, self.window) {
            debug!("Rate cache HIT");
            return Ok(());
        }

        let _guard = self.refresh_lock.lock().await;
        // Another caller may have finished a refresh while we waited.
        if !self.snapshot.read().await.is_stale(now, self.window) {
            debug!("Rate cache refreshed by concurrent caller");
            return Ok(());
        }

        debug!("Rate cache MISS, fetching rates");
        let entries = self.feed.fetch_rates().await?;
        // Stamped with the instant the staleness check used, not the fetch completion.
        let fresh = Arc::new(ExchangeSnapshot::from_entries(entries, now));
        debug!("Rate cache PUT with {} currencies", fresh.rates().len());
        *self.snapshot.write().await = fresh;
        Ok(())
    }

    pub async fn convert(&self, amount: f64, from: &str, to: &str) -> Result<f64, RateError> {
        self.convert_at(Utc::now(), amount, from, to).await
    }

    pub async fn convert_at(
        &self,
        now: DateTime<Utc>,
        amount: f64,
        from: &str,
        to: &str,
    ) -> Result<f64, RateError> {
        self.refresh_if_stale_at(now).await?;
        self.snapshot().await.convert(amount, from, to)
    }
}
