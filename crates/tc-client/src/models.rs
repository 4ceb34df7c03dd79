//! CoinGecko response models

use serde::{Deserialize, Serialize};

/// One element of the `/coins/markets` response.
///
/// Every field is optional so a single bad record cannot fail the whole
/// payload; validation decides what is usable.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MarketCoin {
  pub id: Option<String>,
  pub symbol: Option<String>,
  pub name: Option<String>,
  pub current_price: Option<f64>,
  pub market_cap: Option<f64>,
  pub market_cap_rank: Option<u32>,
  pub total_volume: Option<f64>,
  pub price_change_percentage_24h: Option<f64>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_market_coin_deserializes_provider_shape() {
    let json = r#"{
      "id": "bitcoin",
      "symbol": "btc",
      "name": "Bitcoin",
      "image": "https://assets.coingecko.com/coins/images/1/large/bitcoin.png",
      "current_price": 67123.5,
      "market_cap": 1321000000000,
      "market_cap_rank": 1,
      "total_volume": 25000000000.0,
      "price_change_percentage_24h": -1.2345
    }"#;

    let coin: MarketCoin = serde_json::from_str(json).unwrap();
    assert_eq!(coin.id.as_deref(), Some("bitcoin"));
    assert_eq!(coin.market_cap_rank, Some(1));
    assert_eq!(coin.current_price, Some(67123.5));
    assert_eq!(coin.price_change_percentage_24h, Some(-1.2345));
  }

  #[test]
  fn test_market_coin_tolerates_nulls() {
    let json = r#"{"id": "tether", "current_price": 1.0, "market_cap": null,
                   "price_change_percentage_24h": null}"#;
    let coin: MarketCoin = serde_json::from_str(json).unwrap();
    assert!(coin.market_cap.is_none());
    assert!(coin.price_change_percentage_24h.is_none());
    assert!(coin.symbol.is_none());
  }
}
