/*
 *
 *
 *
 *
 * MIT License
 * Copyright (c) 2025. Dwight J. Browne
 * dwight[-at-]dwightjbrowne[-dot-]com
 *
 *
 * Permission is hereby granted, free of charge, to any person obtaining a copy
 * of this software and associated documentation files (the "Software"), to deal
 * in the Software without restriction, including without limitation the rights
 * to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
 * copies of the Software, and to permit persons to whom the Software is
 * furnished to do so, subject to the following conditions:
 *
 * The above copyright notice and this permission notice shall be included in all
 * copies or substantial portions of the Software.
 *
 * THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
 * IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
 * FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
 * AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
 * LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
 * OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
 * SOFTWARE.
 */

use crate::error::{FetchError, FetchResult};
use crate::traits::MarketDataSource;
use crate::transport::{CallLimiter, Transport};
use crate::validation::{validate_payload, FetchedCoins};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tc_core::ProviderConfig;
use tracing::{info, instrument};
use url::Url;

/// CoinGecko `/coins/markets` client
///
/// Holds the process-wide call limiter, so build one per process and share it.
///
/// # Examples
///
/// ```ignore
/// use tc_client::{CoinGeckoClient, MarketDataSource};
/// use tc_core::ProviderConfig;
///
/// let client = CoinGeckoClient::new(&ProviderConfig::default())?;
/// let top = client.fetch_top(10).await?;
/// println!("Leader: {}", top.records[0].name);
/// ```
pub struct CoinGeckoClient {
  transport: Arc<Transport>,
  base_url: String,
  auth: Option<(&'static str, String)>,
}

impl CoinGeckoClient {
  /// Create a new CoinGecko client
  ///
  /// # Errors
  ///
  /// Returns an error if the HTTP client cannot be created.
  pub fn new(config: &ProviderConfig) -> FetchResult<Self> {
    Ok(Self::with_transport(config, Transport::new(config)?))
  }

  /// Create a client sharing an existing call limiter
  pub fn with_rate_limiter(
    config: &ProviderConfig,
    limiter: Arc<CallLimiter>,
  ) -> FetchResult<Self> {
    Ok(Self::with_transport(config, Transport::new(config)?.with_limiter(limiter)))
  }

  /// Create a client with a per-request timeout finer than whole seconds
  pub fn with_request_timeout(config: &ProviderConfig, timeout: Duration) -> FetchResult<Self> {
    Ok(Self::with_transport(config, Transport::new(config)?.with_timeout(timeout)))
  }

  fn with_transport(config: &ProviderConfig, transport: Transport) -> Self {
    let (base_url, auth) = resolve_endpoint(config);
    Self { transport: Arc::new(transport), base_url, auth }
  }

  /// Base URL requests are sent to
  pub fn base_url(&self) -> &str {
    &self.base_url
  }

  /// Build the `/coins/markets` URL for the top `limit` coins
  pub fn markets_url(&self, limit: usize) -> FetchResult<Url> {
    let mut url = Url::parse(&format!("{}/coins/markets", self.base_url.trim_end_matches('/')))
      .map_err(|e| FetchError::Client(format!("Invalid base URL: {}", e)))?;

    {
      let mut query = url.query_pairs_mut();
      query
        .append_pair("vs_currency", "usd")
        .append_pair("order", "market_cap_desc")
        .append_pair("per_page", &limit.to_string())
        .append_pair("page", "1")
        .append_pair("sparkline", "false")
        .append_pair("price_change_percentage", "24h");
      if let Some((param, key)) = &self.auth {
        query.append_pair(param, key);
      }
    }

    Ok(url)
  }
}

/// Pick endpoint and auth parameter from the configured key.
///
/// Keys prefixed `CG-` on the default base URL go to the pro API; every other
/// key is sent as a demo key to the configured base URL.
fn resolve_endpoint(config: &ProviderConfig) -> (String, Option<(&'static str, String)>) {
  match config.api_key.as_deref() {
    Some(key) if key.starts_with("CG-") && config.base_url == tc_core::COINGECKO_BASE_URL => (
      tc_core::COINGECKO_PRO_BASE_URL.to_string(),
      Some(("x_cg_pro_api_key", key.to_string())),
    ),
    Some(key) if key.starts_with("CG-") => {
      (config.base_url.clone(), Some(("x_cg_pro_api_key", key.to_string())))
    }
    Some(key) => (config.base_url.clone(), Some(("x_cg_demo_api_key", key.to_string()))),
    None => (config.base_url.clone(), None),
  }
}

#[async_trait]
impl MarketDataSource for CoinGeckoClient {
  #[instrument(skip(self))]
  async fn fetch_top(&self, limit: usize) -> FetchResult<FetchedCoins> {
    let url = self.markets_url(limit)?;
    info!("Fetching top {} cryptocurrencies from CoinGecko", limit);

    let payload: Value = self.transport.get_json(&url).await?;
    let items = match payload {
      Value::Array(items) => items,
      other => {
        return Err(FetchError::MalformedPayload(format!(
          "expected a JSON array, got {}",
          json_kind(&other)
        )))
      }
    };

    let fetched = validate_payload(items, limit)?;
    info!(
      "Fetched {} valid cryptocurrencies ({} dropped)",
      fetched.records.len(),
      fetched.dropped
    );
    Ok(fetched)
  }

  fn source_name(&self) -> &'static str {
    "CoinGecko"
  }
}

fn json_kind(value: &Value) -> &'static str {
  match value {
    Value::Null => "null",
    Value::Bool(_) => "a boolean",
    Value::Number(_) => "a number",
    Value::String(_) => "a string",
    Value::Array(_) => "an array",
    Value::Object(_) => "an object",
  }
}
