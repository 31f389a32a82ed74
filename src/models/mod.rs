pub mod alert;
pub mod suspicious_trade;

pub use alert::{Alert, RiskProfile};
pub use suspicious_trade::{HistoricalAlert, NewSuspiciousTrade, SuspiciousTradeRow};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Loosely-typed upstream message, exactly as decoded off the wire.
pub type RawEvent = serde_json::Map<String, serde_json::Value>;

// ---------------------------------------------------------------------------
// Side
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    #[default]
    Buy,
    Sell,
}

impl Side {
    pub fn from_api_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "BUY" | "0" => Some(Side::Buy),
            "SELL" | "1" => Some(Side::Sell),
            _ => None,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

// ---------------------------------------------------------------------------
// CanonicalTrade: core pipeline message
// ---------------------------------------------------------------------------

/// A trade after normalization. Every field is populated; missing upstream
/// fields have already been replaced by their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalTrade {
    pub trader_id: String,
    pub market_id: String,
    /// Always `>= 0`.
    pub size_usd: Decimal,
    pub side: Side,
    pub tx_hash: Option<String>,
    pub observed_at: DateTime<Utc>,
}

impl fmt::Display for CanonicalTrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Trade: trader={} market={} side={} size_usd={}",
            truncate(&self.trader_id, 10),
            truncate(&self.market_id, 16),
            self.side,
            self.size_usd,
        )
    }
}

/// Char-boundary-safe prefix for log lines; upstream ids are arbitrary text.
fn truncate(s: &str, max_chars: usize) -> &str {
    s.char_indices().nth(max_chars).map_or(s, |(idx, _)| &s[..idx])
}
