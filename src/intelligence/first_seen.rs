use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::Rng;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid first-seen timestamp: {0}")]
    InvalidTimestamp(i64),

    #[error("lookup unavailable: {0}")]
    Unavailable(String),
}

/// Authoritative but slow source for a wallet's first observed activity.
#[async_trait]
pub trait FirstSeenLookup: Send + Sync {
    async fn first_seen(&self, wallet: &str) -> Result<DateTime<Utc>, LookupError>;
}

/// Stand-in for an on-chain lookup: adds a short delay and reports one wallet
/// in five as freshly created (1-20h old), the rest as 30 days old.
#[derive(Debug, Clone)]
pub struct SimulatedLookup {
    latency: Duration,
    new_wallet_ratio: f64,
}

impl Default for SimulatedLookup {
    fn default() -> Self {
        Self {
            latency: Duration::from_millis(100),
            new_wallet_ratio: 0.2,
        }
    }
}

#[async_trait]
impl FirstSeenLookup for SimulatedLookup {
    async fn first_seen(&self, wallet: &str) -> Result<DateTime<Utc>, LookupError> {
        tokio::time::sleep(self.latency).await;

        let age = {
            let mut rng = rand::thread_rng();
            if rng.gen_bool(self.new_wallet_ratio) {
                chrono::Duration::hours(rng.gen_range(1..=20))
            } else {
                chrono::Duration::days(30)
            }
        };

        tracing::debug!(wallet = %wallet, age_hours = age.num_hours(), "Simulated first-seen lookup");
        Ok(Utc::now() - age)
    }
}
