//! Traits for market data providers.

use async_trait::async_trait;

use crate::error::FetchResult;
use crate::validation::FetchedCoins;

/// A source of ranked market data.
///
/// Implement this trait to plug a different provider (or a test double) into
/// the ingestion cycle.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
  /// Fetch up to `limit` coins ordered by market cap, highest first.
  async fn fetch_top(&self, limit: usize) -> FetchResult<FetchedCoins>;

  /// Get the name of this data source.
  fn source_name(&self) -> &'static str;
}
