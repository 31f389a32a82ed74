use std::str::FromStr;

use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::Value;

use crate::models::{CanonicalTrade, RawEvent, Side};

// ---------------------------------------------------------------------------
// Alias priority table. First alias carrying a usable value wins.
// ---------------------------------------------------------------------------

pub const TRADER_ALIASES: &[&str] = &[
    "maker_address",
    "maker",
    "user",
    "trader",
    "address",
    "taker_address",
];

pub const SIZE_ALIASES: &[&str] = &["size", "amount", "quantity", "volume"];

pub const PRICE_ALIASES: &[&str] = &["price", "price_per_share", "execution_price"];

/// Notional given directly by the venue. Takes precedence over `size * price`.
pub const SIZE_USD_ALIASES: &[&str] = &["size_usd", "amount_usd", "value"];

pub const MARKET_ALIASES: &[&str] = &[
    "market",
    "market_id",
    "condition_id",
    "asset_id",
    "question_id",
];

pub const TX_HASH_ALIASES: &[&str] = &["transaction_hash", "transactionHash", "tx_hash"];

pub const SIDE_FIELD: &str = "side";

pub const UNKNOWN_TRADER: &str = "0x...";
pub const UNKNOWN_MARKET: &str = "unknown_market";

/// Map an arbitrary upstream event onto a [`CanonicalTrade`].
///
/// Never fails. A field group with no usable alias gets its default:
/// trader `0x...`, market `unknown_market`, size/price `0`, side `BUY`.
/// Negative notionals are clamped to zero.
pub fn normalize(raw: &RawEvent) -> CanonicalTrade {
    let trader_id = first_text(raw, TRADER_ALIASES).unwrap_or_else(|| UNKNOWN_TRADER.to_string());
    let market_id = first_text(raw, MARKET_ALIASES).unwrap_or_else(|| UNKNOWN_MARKET.to_string());

    let size_usd = first_amount(raw, SIZE_USD_ALIASES).unwrap_or_else(|| {
        let size = first_amount(raw, SIZE_ALIASES).unwrap_or(Decimal::ZERO);
        let price = first_amount(raw, PRICE_ALIASES).unwrap_or(Decimal::ZERO);
        size.checked_mul(price).unwrap_or(Decimal::MAX)
    });

    let side = raw
        .get(SIDE_FIELD)
        .and_then(Value::as_str)
        .and_then(Side::from_api_str)
        .unwrap_or_default();

    CanonicalTrade {
        trader_id,
        market_id,
        size_usd: size_usd.max(Decimal::ZERO),
        side,
        tx_hash: first_text(raw, TX_HASH_ALIASES),
        observed_at: Utc::now(),
    }
}

/// First alias holding a non-empty string (numbers are stringified).
fn first_text(raw: &RawEvent, aliases: &[&str]) -> Option<String> {
    aliases.iter().find_map(|alias| match raw.get(*alias)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// First alias holding a non-zero number or numeric string. Zero, empty and
/// unparseable values fall through to the next alias.
fn first_amount(raw: &RawEvent, aliases: &[&str]) -> Option<Decimal> {
    aliases
        .iter()
        .find_map(|alias| raw.get(*alias).and_then(parse_amount))
}

fn parse_amount(value: &Value) -> Option<Decimal> {
    let text = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => return None,
    };

    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
        .filter(|d| !d.is_zero())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
