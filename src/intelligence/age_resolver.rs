use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use metrics::counter;

use crate::cache::EnrichmentCache;

use super::first_seen::FirstSeenLookup;

/// First-seen entries are trusted for a day, then looked up again.
pub const FIRST_SEEN_TTL: Duration = Duration::from_secs(24 * 3600);

/// Age reported (and broadcast) when the wallet's age could not be resolved.
pub const UNKNOWN_AGE_HOURS: f64 = 9999.0;

/// Resolved account age.
///
/// `Unknown` is the fail-safe outcome of a failed lookup: it reports a very
/// old wallet and never counts as new, whatever the configured threshold.
/// An enrichment outage therefore suppresses insider verdicts rather than
/// producing them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AccountAge {
    Known(f64),
    Unknown,
}

impl AccountAge {
    pub fn hours(&self) -> f64 {
        match self {
            AccountAge::Known(hours) => *hours,
            AccountAge::Unknown => UNKNOWN_AGE_HOURS,
        }
    }

    /// True when the wallet is at most `threshold_hours` old (inclusive).
    pub fn is_within(&self, threshold_hours: f64) -> bool {
        match self {
            AccountAge::Known(hours) => *hours <= threshold_hours,
            AccountAge::Unknown => false,
        }
    }
}

/// Cache-then-lookup wallet age resolution.
#[derive(Clone)]
pub struct AgeResolver {
    cache: Option<Arc<dyn EnrichmentCache>>,
    lookup: Arc<dyn FirstSeenLookup>,
}

impl AgeResolver {
    /// `cache = None` behaves like a cache that always misses.
    pub fn new(cache: Option<Arc<dyn EnrichmentCache>>, lookup: Arc<dyn FirstSeenLookup>) -> Self {
        Self { cache, lookup }
    }

    pub fn cache_key(wallet: &str) -> String {
        format!("wallet:{wallet}:first_seen")
    }

    pub async fn resolve_age(&self, wallet: &str) -> AccountAge {
        let key = Self::cache_key(wallet);

        if let Some(first_seen) = self.cached_first_seen(&key).await {
            counter!("age_cache_hits_total").increment(1);
            return AccountAge::Known(age_hours(first_seen, Utc::now()));
        }
        counter!("age_cache_misses_total").increment(1);

        let first_seen = match self.lookup.first_seen(wallet).await {
            Ok(ts) => ts,
            Err(e) => {
                tracing::error!(error = %e, wallet = %wallet, "First-seen lookup failed, assuming old wallet");
                return AccountAge::Unknown;
            }
        };

        if let Some(cache) = &self.cache {
            let value = epoch_secs(first_seen).to_string();
            if let Err(e) = cache.set(&key, &value, FIRST_SEEN_TTL).await {
                tracing::warn!(
                    error = %e,
                    backend = cache.backend_type(),
                    wallet = %wallet,
                    "Failed to cache first-seen time"
                );
            }
        }

        AccountAge::Known(age_hours(first_seen, Utc::now()))
    }

    async fn cached_first_seen(&self, key: &str) -> Option<DateTime<Utc>> {
        let cache = self.cache.as_ref()?;
        let raw = match cache.get(key).await {
            Ok(value) => value?,
            Err(e) => {
                tracing::warn!(error = %e, backend = cache.backend_type(), "Cache read failed, treating as miss");
                return None;
            }
        };

        match raw.parse::<f64>().ok().and_then(from_epoch_secs) {
            Some(ts) => Some(ts),
            None => {
                tracing::warn!(key = %key, value = %raw, "Unparseable cached first-seen value");
                None
            }
        }
    }
}

fn age_hours(first_seen: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let secs = (now - first_seen).num_milliseconds() as f64 / 1000.0;
    (secs / 3600.0).max(0.0)
}

fn epoch_secs(ts: DateTime<Utc>) -> f64 {
    ts.timestamp_millis() as f64 / 1000.0
}

fn from_epoch_secs(secs: f64) -> Option<DateTime<Utc>> {
    if !secs.is_finite() {
        return None;
    }
    DateTime::from_timestamp_millis((secs * 1000.0).round() as i64)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
