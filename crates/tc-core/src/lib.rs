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

//! # tc-core
//!
//! Shared building blocks for the top-coins snapshot pipeline:
//!
//! - [`Config`]: environment driven configuration for the provider, the
//!   ingestion cycle, notifications and the daily schedule
//! - [`types`]: the snapshot data model (`RawCoinRecord`, `CoinSnapshot`) and
//!   the per-cycle `IngestionResult`
//! - [`Error`]: configuration and environment errors

pub mod config;
pub mod error;
pub mod types;

pub use config::{Config, MailConfig, PipelineConfig, ProviderConfig, ScheduleConfig};
pub use error::{Error, Result};
pub use types::{
  cycle_timestamp, rank_records, top_mover, validate_cycle, CoinSnapshot, CycleFailure,
  FailureKind, IngestionResult, IngestionStatus, RawCoinRecord, SnapshotViolation,
};

/// Public CoinGecko API base URL
pub const COINGECKO_BASE_URL: &str = "https://api.coingecko.com/api/v3";

/// Pro CoinGecko API base URL, selected for `CG-` prefixed keys
pub const COINGECKO_PRO_BASE_URL: &str = "https://pro-api.coingecko.com/api/v3";

/// Number of coins captured per cycle
pub const TOP_N: usize = 10;

/// Days of snapshot history kept by the retention pass
pub const DEFAULT_RETENTION_DAYS: i64 = 30;

/// Longest accepted retention window (ten years)
pub const MAX_RETENTION_DAYS: i64 = 3650;
