use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::Alert;

/// Database row for the suspicious_trades table. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SuspiciousTradeRow {
    pub id: i64,
    pub tx_hash: Option<String>,
    pub wallet_address: String,
    pub market_slug: String,
    pub amount_usd: Decimal,
    pub wallet_age_hours: f64,
    pub timestamp: DateTime<Utc>,
}

/// Insert payload; `id` and `timestamp` are assigned by the datastore.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSuspiciousTrade {
    pub tx_hash: Option<String>,
    pub wallet_address: String,
    pub market_slug: String,
    pub amount_usd: Decimal,
    pub wallet_age_hours: f64,
}

impl NewSuspiciousTrade {
    pub fn from_alert(alert: &Alert, tx_hash: Option<String>) -> Self {
        Self {
            tx_hash,
            wallet_address: alert.trader.clone(),
            market_slug: alert.market.clone(),
            amount_usd: alert.amount,
            wallet_age_hours: alert.account_age_hours,
        }
    }
}

/// History entry in the shape the dashboard reads from `GET /alerts`.
///
/// The table does not record the trade side, so `type` is always `"UNK"`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalAlert {
    pub id: i64,
    pub trader: String,
    pub market: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub account_age_hours: f64,
    #[serde(rename = "type")]
    pub side: &'static str,
    pub timestamp: DateTime<Utc>,
}

impl From<SuspiciousTradeRow> for HistoricalAlert {
    fn from(row: SuspiciousTradeRow) -> Self {
        Self {
            id: row.id,
            trader: row.wallet_address,
            market: row.market_slug,
            amount: row.amount_usd,
            account_age_hours: row.wallet_age_hours,
            side: "UNK",
            timestamp: row.timestamp,
        }
    }
}
