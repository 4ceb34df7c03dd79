//! Payload validation for `/coins/markets` responses

use crate::error::{FetchError, FetchResult};
use crate::models::MarketCoin;
use bigdecimal::BigDecimal;
use serde_json::Value;
use std::collections::HashSet;
use std::str::FromStr;
use tc_core::RawCoinRecord;
use tracing::{debug, warn};

/// Validated records from one logical fetch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchedCoins {
  /// Valid records in provider order
  pub records: Vec<RawCoinRecord>,
  /// Records rejected by validation
  pub dropped: usize,
}

/// Turn the raw response array into validated records.
///
/// At most `limit` records are returned. Fails with
/// [`FetchError::EmptyResult`] when nothing survives validation.
pub fn validate_payload(items: Vec<Value>, limit: usize) -> FetchResult<FetchedCoins> {
  let mut seen = HashSet::new();
  let mut fetched = FetchedCoins::default();

  for (index, item) in items.into_iter().enumerate() {
    if fetched.records.len() == limit {
      break;
    }

    let coin: MarketCoin = match serde_json::from_value(item) {
      Ok(coin) => coin,
      Err(e) => {
        debug!("Dropping record {}: {}", index, e);
        fetched.dropped += 1;
        continue;
      }
    };

    match to_record(coin) {
      Ok(record) if seen.insert(record.coin_id.clone()) => fetched.records.push(record),
      Ok(record) => {
        debug!("Dropping duplicate record for {}", record.coin_id);
        fetched.dropped += 1;
      }
      Err(reason) => {
        debug!("Dropping record {}: {}", index, reason);
        fetched.dropped += 1;
      }
    }
  }

  if fetched.dropped > 0 {
    warn!("Dropped {} invalid record(s) from provider response", fetched.dropped);
  }

  if fetched.records.is_empty() {
    return Err(FetchError::EmptyResult { dropped: fetched.dropped });
  }

  Ok(fetched)
}

/// Column widths of `coin_snapshots.coin_id` and `coin_snapshots.symbol`
const MAX_COIN_ID_CHARS: usize = 100;
const MAX_SYMBOL_CHARS: usize = 20;

fn to_record(coin: MarketCoin) -> Result<RawCoinRecord, String> {
  let coin_id = coin
    .id
    .map(|id| id.trim().to_string())
    .filter(|id| !id.is_empty())
    .ok_or_else(|| "missing id".to_string())?;
  if coin_id.chars().count() > MAX_COIN_ID_CHARS {
    return Err(format!("id longer than {} characters", MAX_COIN_ID_CHARS));
  }

  let price_usd = non_negative(coin.current_price)
    .ok_or_else(|| format!("{}: missing or negative current_price", coin_id))?;
  let market_cap_usd = non_negative(coin.market_cap)
    .ok_or_else(|| format!("{}: missing or negative market_cap", coin_id))?;

  let symbol = coin.symbol.map(|s| s.trim().to_uppercase()).unwrap_or_default();
  if symbol.chars().count() > MAX_SYMBOL_CHARS {
    return Err(format!("{}: symbol longer than {} characters", coin_id, MAX_SYMBOL_CHARS));
  }
  let name = coin.name.filter(|n| !n.trim().is_empty()).unwrap_or_else(|| coin_id.clone());

  Ok(RawCoinRecord {
    coin_id,
    symbol,
    name,
    price_usd,
    market_cap_usd,
    volume_24h_usd: non_negative(coin.total_volume),
    change_24h_pct: coin.price_change_percentage_24h.and_then(to_decimal),
    provider_rank: coin.market_cap_rank,
  })
}

fn non_negative(value: Option<f64>) -> Option<BigDecimal> {
  value.filter(|v| *v >= 0.0).and_then(to_decimal)
}

fn to_decimal(value: f64) -> Option<BigDecimal> {
  if !value.is_finite() {
    return None;
  }
  BigDecimal::from_str(&value.to_string()).ok()
}
