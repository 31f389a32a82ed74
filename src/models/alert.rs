use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{CanonicalTrade, Side};

/// Risk verdict attached to every broadcast alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskProfile {
    Normal,
    /// Large trade from a recently created wallet.
    Insider,
}

impl RiskProfile {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskProfile::Normal => "normal",
            RiskProfile::Insider => "insider",
        }
    }
}

impl fmt::Display for RiskProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classified trade as delivered to dashboard subscribers.
///
/// Field names follow the dashboard's JSON contract, so the struct is
/// serialized in camelCase and `amount` goes out as a JSON number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub id: String,
    /// When the trade was observed, in milliseconds since the Unix epoch.
    pub timestamp: i64,
    pub trader: String,
    pub market: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    #[serde(rename = "type")]
    pub side: Side,
    pub account_age_hours: f64,
    pub risk_profile: RiskProfile,
}

impl Alert {
    pub fn new(trade: &CanonicalTrade, account_age_hours: f64, risk_profile: RiskProfile) -> Self {
        Self {
            id: next_alert_id(Utc::now()),
            timestamp: trade.observed_at.timestamp_millis(),
            trader: trade.trader_id.clone(),
            market: trade.market_id.clone(),
            amount: trade.size_usd,
            side: trade.side,
            account_age_hours,
            risk_profile,
        }
    }

    pub fn is_insider(&self) -> bool {
        self.risk_profile == RiskProfile::Insider
    }
}

static LAST_ALERT_MICROS: AtomicI64 = AtomicI64::new(0);

/// Emission-time id (`<secs>.<micros>`), bumped by one microsecond when two
/// alerts land in the same tick so ids stay unique and increasing.
fn next_alert_id(emitted_at: DateTime<Utc>) -> String {
    let now = emitted_at.timestamp_micros();
    let mut last = LAST_ALERT_MICROS.load(Ordering::Relaxed);
    let micros = loop {
        let candidate = now.max(last + 1);
        match LAST_ALERT_MICROS.compare_exchange_weak(
            last,
            candidate,
            Ordering::Relaxed,
            Ordering::Relaxed,
        ) {
            Ok(_) => break candidate,
            Err(actual) => last = actual,
        }
    };
    format!("{}.{:06}", micros.div_euclid(1_000_000), micros.rem_euclid(1_000_000))
}
