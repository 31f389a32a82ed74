use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;

use insider_sentinel::cache::MemoryCache;
use insider_sentinel::db::AlertStore;
use insider_sentinel::hub::{AlertPublisher, BroadcastHub};
use insider_sentinel::ingestion::Pipeline;
use insider_sentinel::intelligence::{AgeResolver, FirstSeenLookup, LookupError, RiskThresholds};
use insider_sentinel::models::{Alert, NewSuspiciousTrade, SuspiciousTradeRow};

/// In-memory append-only store.
#[derive(Default)]
pub struct MemoryAlertStore {
    rows: Mutex<Vec<SuspiciousTradeRow>>,
    /// Every call fails, as if the database were down.
    pub unavailable: bool,
}

#[allow(dead_code)]
impl MemoryAlertStore {
    pub fn failing() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    pub async fn rows(&self) -> Vec<SuspiciousTradeRow> {
        self.rows.lock().await.clone()
    }
}

#[async_trait]
impl AlertStore for MemoryAlertStore {
    async fn append(&self, row: &NewSuspiciousTrade) -> anyhow::Result<SuspiciousTradeRow> {
        if self.unavailable {
            anyhow::bail!("database is locked");
        }

        let mut rows = self.rows.lock().await;
        let saved = SuspiciousTradeRow {
            id: rows.len() as i64 + 1,
            tx_hash: row.tx_hash.clone(),
            wallet_address: row.wallet_address.clone(),
            market_slug: row.market_slug.clone(),
            amount_usd: row.amount_usd,
            wallet_age_hours: row.wallet_age_hours,
            timestamp: Utc::now(),
        };
        rows.push(saved.clone());
        Ok(saved)
    }

    async fn query_recent(&self, limit: i64) -> anyhow::Result<Vec<SuspiciousTradeRow>> {
        if self.unavailable {
            anyhow::bail!("database is locked");
        }
        let rows = self.rows.lock().await;
        Ok(rows.iter().rev().take(limit.max(0) as usize).cloned().collect())
    }

    async fn ping(&self) -> anyhow::Result<()> {
        if self.unavailable {
            anyhow::bail!("database is locked");
        }
        Ok(())
    }
}

/// Lookup returning a scripted age per wallet (default: 30 days).
#[derive(Default)]
pub struct ScriptedLookup {
    ages_hours: HashMap<String, i64>,
    pub calls: AtomicUsize,
}

#[allow(dead_code)]
impl ScriptedLookup {
    pub fn with_age(wallet: &str, hours: i64) -> Self {
        let mut lookup = Self::default();
        lookup.ages_hours.insert(wallet.to_string(), hours);
        lookup
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FirstSeenLookup for ScriptedLookup {
    async fn first_seen(&self, wallet: &str) -> Result<DateTime<Utc>, LookupError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let hours = self.ages_hours.get(wallet).copied().unwrap_or(30 * 24);
        Ok(Utc::now() - Duration::hours(hours))
    }
}

#[allow(dead_code)]
pub struct FailingLookup;

#[async_trait]
impl FirstSeenLookup for FailingLookup {
    async fn first_seen(&self, _wallet: &str) -> Result<DateTime<Utc>, LookupError> {
        Err(LookupError::Unavailable("polygon-rpc timed out".into()))
    }
}

/// Publisher that records every alert it is handed, optionally failing.
#[derive(Default)]
pub struct RecordingPublisher {
    published: Mutex<Vec<Alert>>,
    pub fail: bool,
}

#[allow(dead_code)]
impl RecordingPublisher {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub async fn published(&self) -> Vec<Alert> {
        self.published.lock().await.clone()
    }
}

#[async_trait]
impl AlertPublisher for RecordingPublisher {
    async fn publish(&self, alert: &Alert) -> anyhow::Result<usize> {
        self.published.lock().await.push(alert.clone());
        if self.fail {
            anyhow::bail!("broadcast failed");
        }
        Ok(1)
    }
}

/// Thresholds used by the end-to-end scenarios.
#[allow(dead_code)]
pub fn scenario_thresholds() -> RiskThresholds {
    RiskThresholds::default()
}

#[allow(dead_code)]
pub fn build_pipeline(
    lookup: Arc<dyn FirstSeenLookup>,
    store: Arc<MemoryAlertStore>,
    publisher: Arc<dyn AlertPublisher>,
) -> Pipeline {
    let resolver = AgeResolver::new(Some(Arc::new(MemoryCache::new())), lookup);
    Pipeline::new(scenario_thresholds(), resolver, store, publisher)
}

#[allow(dead_code)]
pub fn hub_pipeline(
    lookup: Arc<dyn FirstSeenLookup>,
    store: Arc<MemoryAlertStore>,
) -> (Pipeline, BroadcastHub) {
    let hub = BroadcastHub::new();
    let pipeline = build_pipeline(lookup, store, Arc::new(hub.clone()));
    (pipeline, hub)
}
