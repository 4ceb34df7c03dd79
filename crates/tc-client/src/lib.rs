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

//! # tc-client
//!
//! Market data client for the top-coins pipeline.
//!
//! ## Features
//!
//! - **One logical call**: [`MarketDataSource::fetch_top`] hides retries and
//!   rate limiting behind a single request for the top coins by market cap
//! - **Bounded retries**: timeouts, 429 and 5xx responses are retried with
//!   exponential backoff; other 4xx responses and malformed payloads are not
//! - **Validation**: records without an id, price or market cap are dropped and
//!   counted instead of failing the whole fetch
//! - **Rate limiting**: a process-wide minimum spacing between provider calls
//!
//! ## Usage
//!
//! ```rust,no_run
//! use tc_client::{CoinGeckoClient, MarketDataSource};
//! use tc_core::Config;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let client = CoinGeckoClient::new(&config.provider)?;
//!
//!     let fetched = client.fetch_top(10).await?;
//!     println!("{} coins, {} dropped", fetched.records.len(), fetched.dropped);
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod error;
pub mod models;
pub mod traits;
pub mod transport;
pub mod validation;

pub use client::CoinGeckoClient;
pub use error::{FetchError, FetchResult};
pub use traits::MarketDataSource;
pub use validation::FetchedCoins;
