use rust_decimal::Decimal;
use std::env;
use std::str::FromStr;

use crate::ingestion::{IngestionMode, ListenerConfig};
use crate::intelligence::RiskThresholds;
use crate::polymarket::data_client::DATA_API_BASE;

const DEFAULT_WS_URL: &str = "wss://ws-live-data.polymarket.com";

/// Source of wallet first-seen times on a cache miss.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgeLookupMode {
    /// Randomized demo ages; no external calls.
    Simulated,
    /// Earliest activity from the Polymarket Data API.
    DataApi,
}

impl FromStr for AgeLookupMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "simulated" | "mock" => Ok(AgeLookupMode::Simulated),
            "data_api" | "data-api" => Ok(AgeLookupMode::DataApi),
            other => anyhow::bail!("unknown AGE_LOOKUP mode: {other}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub redis_url: Option<String>,

    // Upstream feed
    pub polymarket_ws_url: String,
    pub use_mock_data: bool,

    // Enrichment
    pub age_lookup: AgeLookupMode,
    pub data_api_url: String,

    // Heuristics
    pub noise_floor_usd: Decimal,
    pub suspicious_threshold_usd: Decimal,
    pub new_account_hours: f64,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            database_url: env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?,
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8000".into())
                .parse()?,
            redis_url: env::var("REDIS_URL").ok().filter(|s| !s.trim().is_empty()),

            polymarket_ws_url: env::var("POLYMARKET_WS_URL")
                .unwrap_or_else(|_| DEFAULT_WS_URL.into()),
            use_mock_data: env::var("USE_MOCK_DATA")
                .unwrap_or_else(|_| "false".into())
                .parse()
                .unwrap_or(false),

            age_lookup: env::var("AGE_LOOKUP")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(AgeLookupMode::Simulated),
            data_api_url: env::var("DATA_API_URL").unwrap_or_else(|_| DATA_API_BASE.into()),

            noise_floor_usd: env::var("NOISE_FLOOR_USD")
                .unwrap_or_else(|_| "100".into())
                .parse()
                .unwrap_or(Decimal::from(100)),
            suspicious_threshold_usd: env::var("SUSPICIOUS_THRESHOLD_USD")
                .unwrap_or_else(|_| "10000".into())
                .parse()
                .unwrap_or(Decimal::from(10_000)),
            new_account_hours: env::var("NEW_ACCOUNT_HOURS")
                .ok()
                .and_then(|s| s.parse::<f64>().ok())
                .filter(|h| h.is_finite() && *h >= 0.0)
                .unwrap_or(48.0),
        })
    }

    pub fn risk_thresholds(&self) -> RiskThresholds {
        RiskThresholds {
            min_notable_usd: self.noise_floor_usd,
            suspicious_usd: self.suspicious_threshold_usd,
            new_account_hours: self.new_account_hours,
        }
    }

    pub fn ingestion_mode(&self) -> IngestionMode {
        if self.use_mock_data {
            IngestionMode::Mock
        } else {
            IngestionMode::Live(ListenerConfig::new(self.polymarket_ws_url.clone()))
        }
    }
}
