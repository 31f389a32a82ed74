use rust_decimal::Decimal;

use crate::models::RiskProfile;

use super::age_resolver::AccountAge;

/// Thresholds for the insider heuristic.
#[derive(Debug, Clone, PartialEq)]
pub struct RiskThresholds {
    /// Trades below this notional are noise: no alert, no broadcast, no row.
    pub min_notable_usd: Decimal,
    pub suspicious_usd: Decimal,
    pub new_account_hours: f64,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            min_notable_usd: Decimal::from(100),
            suspicious_usd: Decimal::from(10_000),
            new_account_hours: 48.0,
        }
    }
}

impl RiskThresholds {
    pub fn is_noise(&self, size_usd: Decimal) -> bool {
        size_usd < self.min_notable_usd
    }

    /// Classify a notable trade.
    ///
    /// Rules:
    /// - **Insider**: wallet age `<= new_account_hours` and notional
    ///   `>= suspicious_usd` (both bounds inclusive).
    /// - **Normal**: everything else, including wallets of unknown age.
    pub fn classify(&self, size_usd: Decimal, age: AccountAge) -> RiskProfile {
        if age.is_within(self.new_account_hours) && size_usd >= self.suspicious_usd {
            RiskProfile::Insider
        } else {
            RiskProfile::Normal
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
